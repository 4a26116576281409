//! Novel Metadata
//!
//! Typed forms of the documents exchanged with the browser and recovered from
//! model output. Requests carry the story structure as an untyped
//! [`serde_json::Value`]; [`validated_structure`] is the single place that
//! decides whether it is usable for prompting. Model output goes through
//! [`NovelStructure::from_model_output`] or [`Chapter::outlines_from_model_output`]
//! before anything typed is built from it.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::StudioError;

/// A main character of the story
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Character {
    /// Display name
    #[serde(deserialize_with = "lenient_text")]
    pub name: String,
    /// Story role, e.g. protagonist or antagonist
    #[serde(deserialize_with = "lenient_text")]
    pub role: String,
    /// Appearance and personality
    #[serde(deserialize_with = "lenient_text")]
    pub description: String,
    /// Core goal driving the character
    #[serde(deserialize_with = "lenient_text")]
    pub motivation: String,
}

/// The story architecture produced by structure generation
///
/// Deserialization never rejects a field for its shape: model output and
/// browser edits are only held to what validation checks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NovelStructure {
    /// World building: era, geography, society
    #[serde(deserialize_with = "lenient_text")]
    pub world_setting: String,
    /// Main cast
    #[serde(deserialize_with = "lenient_characters")]
    pub main_characters: Vec<Character>,
    /// Plot from opening to resolution
    #[serde(deserialize_with = "lenient_text")]
    pub plot_summary: String,
    /// Core themes
    #[serde(deserialize_with = "lenient_list")]
    pub themes: Vec<String>,
    /// Timeline overview
    #[serde(deserialize_with = "lenient_text")]
    pub timeline: String,
}

/// Separators models use when a list comes back as one string
const LIST_SEPARATORS: [char; 5] = ['、', ',', '，', ';', '；'];

fn text_of(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Null reads as empty; numbers and other scalars are rendered as text
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_of(Value::deserialize(deserializer)?).unwrap_or_default())
}

/// An array of strings, or a single string of separated items
fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().filter_map(text_of).collect(),
        Value::String(s) => s
            .split(&LIST_SEPARATORS[..])
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        other => text_of(other).into_iter().collect(),
    })
}

/// Character entries; a bare string is taken as a name, other shapes are dropped
fn lenient_characters<'de, D>(deserializer: D) -> Result<Vec<Character>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(_) => serde_json::from_value(item).ok(),
            Value::String(name) => Some(Character {
                name,
                ..Character::default()
            }),
            _ => None,
        })
        .collect())
}

/// How much of a request's structure must be present
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StructureCheck {
    /// Only the character list is required
    Characters,
    /// Characters, world setting and plot summary are required
    Complete,
}

fn has_text(value: &Value, field: &str) -> bool {
    value
        .get(field)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

/// Validate a request's `structure` field and convert it to a typed structure
///
/// `mainCharacters` must be a non-empty array in every case.
pub(crate) fn validated_structure(
    structure: Option<&Value>,
    check: StructureCheck,
) -> Result<NovelStructure, StudioError> {
    let structure = match structure {
        Some(value) if value.is_object() => value,
        _ => {
            return Err(StudioError::validation(
                "structure is required; generate the story structure first",
            ))
        }
    };

    match structure.get("mainCharacters").and_then(Value::as_array) {
        Some(characters) if !characters.is_empty() => {}
        _ => {
            return Err(StudioError::validation(
                "structure.mainCharacters must be a non-empty array; \
                 generate the story structure first",
            ))
        }
    }

    if check == StructureCheck::Complete
        && !(has_text(structure, "worldSetting") && has_text(structure, "plotSummary"))
    {
        return Err(StudioError::validation(
            "structure must include worldSetting and plotSummary",
        ));
    }

    NovelStructure::deserialize(structure)
        .map_err(|e| StudioError::validation(format!("structure is malformed: {e}")))
}

impl NovelStructure {
    /// Validate a recovered document as a story structure
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Schema`] when `worldSetting` or `plotSummary` is
    /// missing, or the document does not fit the structure shape.
    pub fn from_model_output(value: Value) -> Result<Self, StudioError> {
        if !(has_text(&value, "worldSetting") && has_text(&value, "plotSummary")) {
            return Err(StudioError::schema(
                "story structure lacks worldSetting or plotSummary",
            ));
        }
        serde_json::from_value(value)
            .map_err(|e| StudioError::schema(format!("story structure is malformed: {e}")))
    }
}

/// Progress of a single chapter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChapterStatus {
    /// Only the outline exists
    #[default]
    Outline,
    /// Partially written
    Draft,
    /// Generated text present
    Written,
    /// Edited by the author after generation
    Revised,
}

/// The chapter fields a prompt needs
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChapterDescriptor {
    /// 1-based chapter number
    pub number: u32,
    /// Chapter title
    pub title: String,
    /// Chapter outline
    pub outline: String,
    /// Chapter text, when already written
    pub content: String,
}

/// A chapter of a project
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    /// Stable identifier
    pub id: Uuid,
    /// 1-based chapter number
    pub number: u32,
    /// Chapter title
    pub title: String,
    /// Chapter outline
    pub outline: String,
    /// Chapter text
    pub content: String,
    /// Length of `content` in characters
    pub word_count: usize,
    /// Writing progress
    pub status: ChapterStatus,
}

impl Chapter {
    /// Create an outline-only chapter with a fresh id
    pub fn from_outline(number: u32, title: impl Into<String>, outline: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            number,
            title: title.into(),
            outline: outline.into(),
            content: String::new(),
            word_count: 0,
            status: ChapterStatus::Outline,
        }
    }

    /// Validate a recovered `{"chapters": [...]}` document
    ///
    /// Chapters are renumbered by position and given fresh ids; the numbers
    /// the model wrote are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Schema`] when `chapters` is missing or not an array.
    pub fn outlines_from_model_output(value: &Value) -> Result<Vec<Self>, StudioError> {
        let chapters = value
            .get("chapters")
            .and_then(Value::as_array)
            .ok_or_else(|| StudioError::schema("outline lacks a chapters list"))?;

        Ok(chapters
            .iter()
            .zip(1u32..)
            .map(|(entry, number)| {
                let text = |field: &str| {
                    entry
                        .get(field)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                Self::from_outline(number, text("title"), text("outline"))
            })
            .collect())
    }

    /// Prompt-facing view of this chapter
    #[must_use]
    pub fn descriptor(&self) -> ChapterDescriptor {
        ChapterDescriptor {
            number: self.number,
            title: self.title.clone(),
            outline: self.outline.clone(),
            content: self.content.clone(),
        }
    }

    /// Replace the chapter text, keeping the word count in sync
    pub fn set_content(&mut self, content: String, status: ChapterStatus) {
        self.word_count = content.chars().count();
        self.content = content;
        self.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn structure_json() -> Value {
        json!({
            "worldSetting": "A floating archipelago",
            "mainCharacters": [
                {"name": "Lin", "role": "protagonist", "description": "a cartographer", "motivation": "find the lost island"}
            ],
            "plotSummary": "Lin charts the sky",
            "themes": ["freedom", "memory"],
            "timeline": "one monsoon"
        })
    }

    #[test]
    fn test_validated_structure_accepts_complete_structure() {
        let value = structure_json();
        let structure = validated_structure(Some(&value), StructureCheck::Complete).unwrap();
        assert_eq!(structure.main_characters.len(), 1);
        assert_eq!(structure.main_characters[0].name, "Lin");
        assert_eq!(structure.themes, vec!["freedom", "memory"]);
    }

    #[test]
    fn test_validated_structure_rejects_missing_characters() {
        let mut value = structure_json();
        value.as_object_mut().unwrap().remove("mainCharacters");
        let err = validated_structure(Some(&value), StructureCheck::Characters).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("mainCharacters"));
    }

    #[test]
    fn test_validated_structure_rejects_non_array_characters() {
        let mut value = structure_json();
        value["mainCharacters"] = json!("Lin and friends");
        let err = validated_structure(Some(&value), StructureCheck::Characters).unwrap_err();
        assert!(err.to_string().contains("mainCharacters"));

        value["mainCharacters"] = json!([]);
        assert!(validated_structure(Some(&value), StructureCheck::Characters).is_err());
    }

    #[test]
    fn test_validated_structure_rejects_absent_structure() {
        assert!(validated_structure(None, StructureCheck::Characters).is_err());
        let null = Value::Null;
        assert!(validated_structure(Some(&null), StructureCheck::Characters).is_err());
    }

    #[test]
    fn test_characters_check_tolerates_missing_plot() {
        let value = json!({"mainCharacters": [{"name": "Lin"}]});
        let structure = validated_structure(Some(&value), StructureCheck::Characters).unwrap();
        assert_eq!(structure.plot_summary, "");
        assert!(validated_structure(Some(&value), StructureCheck::Complete).is_err());
    }

    #[test]
    fn test_structure_from_model_output() {
        let structure = NovelStructure::from_model_output(structure_json()).unwrap();
        assert_eq!(structure.world_setting, "A floating archipelago");

        let incomplete = json!({"worldSetting": "somewhere"});
        let err = NovelStructure::from_model_output(incomplete).unwrap_err();
        assert!(matches!(err, StudioError::Schema(_)));
    }

    #[test]
    fn test_null_fields_read_as_empty() {
        let mut value = structure_json();
        value["timeline"] = Value::Null;
        value["themes"] = Value::Null;
        value["mainCharacters"][0]["motivation"] = Value::Null;

        let structure = NovelStructure::from_model_output(value).unwrap();
        assert_eq!(structure.timeline, "");
        assert!(structure.themes.is_empty());
        assert_eq!(structure.main_characters[0].motivation, "");
        assert_eq!(structure.main_characters[0].name, "Lin");
    }

    #[test]
    fn test_validated_structure_tolerates_null_character_fields() {
        let mut value = structure_json();
        value["mainCharacters"][0]["motivation"] = Value::Null;
        value["mainCharacters"][0]["role"] = json!(1);
        value["timeline"] = Value::Null;

        let structure = validated_structure(Some(&value), StructureCheck::Complete).unwrap();
        assert_eq!(structure.main_characters[0].motivation, "");
        assert_eq!(structure.main_characters[0].role, "1");
        assert_eq!(structure.timeline, "");
    }

    #[test]
    fn test_string_themes_are_split() {
        let mut value = structure_json();
        value["themes"] = json!("记忆、背叛, 救赎");
        let structure = NovelStructure::from_model_output(value).unwrap();
        assert_eq!(structure.themes, vec!["记忆", "背叛", "救赎"]);
    }

    #[test]
    fn test_bare_string_characters_become_names() {
        let mut value = structure_json();
        value["mainCharacters"] = json!(["沈舟", null, {"name": "林雾", "role": null}]);
        let structure = validated_structure(Some(&value), StructureCheck::Characters).unwrap();
        assert_eq!(structure.main_characters.len(), 2);
        assert_eq!(structure.main_characters[0].name, "沈舟");
        assert_eq!(structure.main_characters[1].name, "林雾");
        assert_eq!(structure.main_characters[1].role, "");
    }

    #[test]
    fn test_outlines_are_renumbered_with_fresh_ids() {
        let value = json!({"chapters": [
            {"number": 7, "title": "Departure", "outline": "Lin leaves"},
            {"title": "Storm"}
        ]});
        let chapters = Chapter::outlines_from_model_output(&value).unwrap();

        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].number, 1);
        assert_eq!(chapters[1].number, 2);
        assert_eq!(chapters[1].outline, "");
        assert_ne!(chapters[0].id, chapters[1].id);
        assert!(chapters
            .iter()
            .all(|c| c.status == ChapterStatus::Outline && c.word_count == 0 && c.content.is_empty()));
    }

    #[test]
    fn test_outlines_require_chapter_list() {
        let err = Chapter::outlines_from_model_output(&json!({"chapter": []})).unwrap_err();
        assert!(matches!(err, StudioError::Schema(_)));
    }

    #[test]
    fn test_chapter_serializes_camel_case() {
        let chapter = Chapter::from_outline(1, "Departure", "Lin leaves");
        let json = serde_json::to_value(&chapter).unwrap();
        assert_eq!(json["wordCount"], 0);
        assert_eq!(json["status"], "outline");
    }

    #[test]
    fn test_set_content_counts_characters() {
        let mut chapter = Chapter::from_outline(1, "启程", "林离开了家乡");
        chapter.set_content("天色微明。".to_string(), ChapterStatus::Written);
        assert_eq!(chapter.word_count, 5);
        assert_eq!(chapter.status, ChapterStatus::Written);
    }
}
