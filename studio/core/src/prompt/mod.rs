//! Prompt Assembly
//!
//! Each generation kind has a request type that deserializes from the
//! browser's camelCase JSON and a `build_prompt` method that validates the
//! request and renders a system + user prompt pair. Assembly is pure: the
//! same request always yields the same prompt, and validation failures are
//! reported before the generator touches the network.
//!
//! | Request              | Mode      | Model    |
//! |----------------------|-----------|----------|
//! | [`StructureRequest`] | JSON      | chat     |
//! | [`OutlineRequest`]   | JSON      | chat     |
//! | [`ChapterRequest`]   | streaming | reasoner |

mod chapter;
mod outline;
mod structure;

pub use chapter::ChapterRequest;
pub use outline::OutlineRequest;
pub use structure::StructureRequest;

use crate::backend::ChatMessage;
use crate::error::StudioError;
use crate::novel::Character;

/// A rendered system + user prompt pair
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    /// Instructions for the model
    pub system: String,
    /// The novel material to work on
    pub user: String,
}

impl Prompt {
    /// Convert into the two-message conversation sent upstream
    #[must_use]
    pub fn into_messages(self) -> Vec<ChatMessage> {
        vec![ChatMessage::system(self.system), ChatMessage::user(self.user)]
    }
}

/// Reject blank required text fields
fn require_text<'a>(field: &str, value: &'a str) -> Result<&'a str, StudioError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StudioError::validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

/// Optional free text, with blank treated as absent
fn optional_text(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// One bullet line per character; motivation is included when asked for
fn character_lines(characters: &[Character], with_motivation: bool) -> String {
    characters
        .iter()
        .map(|c| {
            if with_motivation {
                format!(
                    "- {}（{}）：{}。动机：{}",
                    c.name, c.role, c.description, c.motivation
                )
            } else {
                format!("- {}（{}）：{}", c.name, c.role, c.description)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
