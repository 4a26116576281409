//! Chapter prose prompt

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{character_lines, optional_text, require_text, Prompt};
use crate::error::StudioError;
use crate::novel::{validated_structure, ChapterDescriptor, StructureCheck};

/// Characters of the previous chapter's ending quoted for continuity
const PREVIOUS_TAIL_CHARS: usize = 1000;

/// Request to write the text of one chapter
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChapterRequest {
    /// Novel title
    pub title: String,
    /// Core idea or theme
    pub theme: String,
    /// Genre label
    pub genre: String,
    /// Story structure, untyped until validated
    pub structure: Option<Value>,
    /// The chapter to write
    pub chapter: Option<ChapterDescriptor>,
    /// Lower bound of the chapter length, in characters
    pub words_per_chapter: Option<u32>,
    /// Upper bound of the chapter length; 1.5 x the lower bound when absent
    pub max_words: Option<u32>,
    /// The chapter before this one, if any
    pub previous_chapter: Option<ChapterDescriptor>,
    /// Extra direction from the author
    pub guidance: Option<String>,
    /// Treat the length range as a hard requirement
    pub strict_mode: bool,
}

/// Last `max_chars` characters of `text`
fn tail(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    let skip = count - max_chars;
    text.char_indices()
        .nth(skip)
        .map_or(text, |(offset, _)| &text[offset..])
}

impl ChapterRequest {
    /// Validate and render the prompt
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Validation`] when the structure has no character
    /// list, the chapter descriptor or word target is missing, or `maxWords`
    /// is below `wordsPerChapter`.
    pub fn build_prompt(&self) -> Result<Prompt, StudioError> {
        let structure = validated_structure(self.structure.as_ref(), StructureCheck::Characters)?;
        let chapter = self
            .chapter
            .as_ref()
            .ok_or_else(|| StudioError::validation("chapter is required"))?;
        let title = require_text("title", &self.title)?;
        let (min_words, max_words) = self.word_range()?;
        let number = chapter.number;

        let length_rule = if self.strict_mode {
            "这是一项硬性指标。如果情节不足以支撑该字数，请通过增加环境细节描写、人物内心独白、\
             细腻的动作刻画以及生动的对话来丰富内容。严禁敷衍了事。"
        } else {
            "请尽量保证内容丰富且完整。"
        };

        let system = format!(
            "你是一位专业的小说创作者。请根据小说大纲和上下文，创作第 {number} 章的正文内容。\n\
             要求：\n\
             1. 严格遵循章节大纲，但可以在细节上进行发挥。\n\
             2. 描写生动细腻，注重环境渲染和心理刻画，对话自然流畅。\n\
             3. **情节衔接**：必须紧密衔接上一章的末尾内容。如果上一章在某个场景或对话中结束，\
             本章应自然延续或从合理的时空跳转开始。\n\
             4. **字数控制**：本章正文字数**必须在 {min_words} 到 {max_words} 字之间**。\n   \
             - {length_rule}\n   \
             - 如果内容过长，请在接近 {max_words} 字时寻找合适的切入点进行收尾。\n\
             5. **内容深度**：不要为了凑字数而重复，而是要深入挖掘角色的情感冲突和场景的氛围感。\n\
             6. **完整性**：每一章必须有一个相对完整的段落结束，不要在句子中途断开。\n\
             7. 直接输出正文内容，不要包含标题或其他解释性文字。"
        );

        let mut user = format!(
            "【小说信息】\n标题：{title}\n类型：{genre}\n核心主题：{theme}\n\n\
             【故事架构】\n世界观：{world}\n主要角色：\n{characters}\n",
            genre = self.genre.trim(),
            theme = self.theme.trim(),
            world = structure.world_setting,
            characters = character_lines(&structure.main_characters, false),
        );

        if let Some(guidance) = optional_text(self.guidance.as_ref()) {
            let _ = writeln!(user, "\n【创作指导】{guidance}");
        }

        user.push_str("\n【上一章内容回顾】\n");
        match &self.previous_chapter {
            Some(previous) => {
                let _ = writeln!(
                    user,
                    "章节：第 {} 章 {}\n大纲：{}",
                    previous.number, previous.title, previous.outline
                );
                if !previous.content.trim().is_empty() {
                    let _ = writeln!(
                        user,
                        "末尾内容（用于衔接）：\n...{}",
                        tail(&previous.content, PREVIOUS_TAIL_CHARS)
                    );
                }
            }
            None => user.push_str("这是全书的第一章。\n"),
        }

        let _ = write!(
            user,
            "\n【本章创作任务】\n章节：第 {number} 章 {chapter_title}\n本章大纲：{outline}\n\n\
             请开始创作第 {number} 章的正文，确保开头与上一章末尾完美衔接：",
            chapter_title = chapter.title,
            outline = chapter.outline,
        );

        Ok(Prompt { system, user })
    }

    /// Inclusive length range in characters
    fn word_range(&self) -> Result<(u32, u32), StudioError> {
        let min = self
            .words_per_chapter
            .filter(|n| *n > 0)
            .ok_or_else(|| StudioError::validation("wordsPerChapter must be a positive number"))?;
        let max = self.max_words.unwrap_or(min.saturating_mul(3) / 2);
        if max < min {
            return Err(StudioError::validation(format!(
                "maxWords ({max}) must not be below wordsPerChapter ({min})"
            )));
        }
        Ok((min, max))
    }
}
