//! Best-Effort JSON Recovery
//!
//! Models asked for strict JSON still wrap it in Markdown fences, surround it
//! with prose, or stop mid-document at the token limit. [`recover_json`] runs
//! an ordered fallback chain and returns the first strategy that parses:
//!
//! 1. [`Strategy::Direct`]: the whole text
//! 2. [`Strategy::Fenced`]: the interior of the first ```` ```json ```` fence,
//!    or of the first plain ```` ``` ```` fence when no tagged one exists
//! 3. [`Strategy::BraceSpan`]: first `{` through last `}`
//! 4. [`Strategy::Balanced`]: append missing ` ]` then missing ` }`
//!    (only under [`RecoveryPolicy::Repairing`])
//!
//! Balancing counts bracket characters without regard to strings or nesting
//! order, so it can produce valid JSON with the wrong trailing structure.
//! Callers validate the shape of whatever comes back.

use serde_json::Value;
use tracing::debug;

use crate::error::StudioError;

/// Characters of the original text quoted in the exhaustion error
const PREVIEW_CHARS: usize = 100;

/// Which strategies the chain may use
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecoveryPolicy {
    /// Direct, fenced and brace-span parsing only
    #[default]
    Lenient,
    /// Lenient, then bracket balancing for truncated output
    Repairing,
}

/// The strategy that produced a recovered value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// The text parsed as-is
    Direct,
    /// The interior of a Markdown code fence parsed
    Fenced,
    /// The span from the first `{` to the last `}` parsed
    BraceSpan,
    /// The text parsed after appending missing closers
    Balanced,
}

impl Strategy {
    fn attempt(self, text: &str) -> Option<Value> {
        match self {
            Self::Direct => parse(text),
            Self::Fenced => fenced_block(text).and_then(parse),
            Self::BraceSpan => brace_span(text).and_then(parse),
            Self::Balanced => parse(&balanced(text)),
        }
    }
}

impl RecoveryPolicy {
    fn strategies(self) -> &'static [Strategy] {
        match self {
            Self::Lenient => &[Strategy::Direct, Strategy::Fenced, Strategy::BraceSpan],
            Self::Repairing => &[
                Strategy::Direct,
                Strategy::Fenced,
                Strategy::BraceSpan,
                Strategy::Balanced,
            ],
        }
    }
}

/// Recover a JSON value from model output
///
/// # Errors
///
/// Returns [`StudioError::Recovery`] with a preview of the text when every
/// strategy allowed by `policy` fails.
pub fn recover_json(text: &str, policy: RecoveryPolicy) -> Result<Value, StudioError> {
    recover_with_strategy(text, policy).map(|(value, _)| value)
}

/// Like [`recover_json`], also reporting which strategy succeeded
///
/// # Errors
///
/// Returns [`StudioError::Recovery`] when every strategy fails.
pub fn recover_with_strategy(
    text: &str,
    policy: RecoveryPolicy,
) -> Result<(Value, Strategy), StudioError> {
    for &strategy in policy.strategies() {
        if let Some(value) = strategy.attempt(text) {
            if strategy != Strategy::Direct {
                debug!(?strategy, "Recovered JSON from model output");
            }
            return Ok((value, strategy));
        }
    }

    Err(StudioError::Recovery {
        preview: text.chars().take(PREVIEW_CHARS).collect(),
    })
}

fn parse(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

/// Interior of the first code fence, trimmed
fn fenced_block(text: &str) -> Option<&str> {
    let (start, tag_len) = match text.find("```json") {
        Some(start) => (start, "```json".len()),
        None => (text.find("```")?, "```".len()),
    };
    let body = &text[start + tag_len..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// First `{` through last `}`, inclusive
fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Trimmed text with missing `]` and then missing `}` appended
fn balanced(text: &str) -> String {
    let mut repaired = text.trim().to_string();
    let count = |c: char| repaired.chars().filter(|&x| x == c).count();

    let missing_brackets = count('[').saturating_sub(count(']'));
    let missing_braces = count('{').saturating_sub(count('}'));

    repaired.push_str(&" ]".repeat(missing_brackets));
    repaired.push_str(&" }".repeat(missing_braces));
    repaired
}
