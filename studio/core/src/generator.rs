//! Novel Generator
//!
//! The request handler behind the three generation routes. Each operation
//! validates its request and assembles the prompt before anything is sent
//! upstream, so a bad request never costs a completion call.
//!
//! | Operation              | Mode      | Recovery                      |
//! |------------------------|-----------|-------------------------------|
//! | [`generate_structure`] | blocking  | [`RecoveryPolicy::Lenient`]   |
//! | [`generate_outline`]   | blocking  | [`RecoveryPolicy::Repairing`] |
//! | [`generate_chapter`]   | streaming | reframed, see [`crate::streaming`] |
//!
//! [`generate_structure`]: NovelGenerator::generate_structure
//! [`generate_outline`]: NovelGenerator::generate_outline
//! [`generate_chapter`]: NovelGenerator::generate_chapter

use std::sync::Arc;

use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::backend::{ByteStream, CompletionBackend, CompletionOptions, CompletionRequest};
use crate::config::{DEFAULT_CHAT_MODEL, DEFAULT_REASONER_MODEL};
use crate::error::StudioError;
use crate::novel::{Chapter, NovelStructure};
use crate::prompt::{ChapterRequest, OutlineRequest, Prompt, StructureRequest};
use crate::recovery::{recover_json, RecoveryPolicy};
use crate::streaming::reframe;

/// Model and sampling choices for each generation kind
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationSettings {
    /// Model for structure and outline (JSON) generation
    pub chat_model: String,
    /// Model for chapter prose
    pub reasoner_model: String,
    /// Sampling temperature for every request
    pub temperature: f32,
    /// Output token limit for chapter prose
    pub chapter_max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            reasoner_model: DEFAULT_REASONER_MODEL.to_string(),
            temperature: 0.7,
            chapter_max_tokens: 8192,
        }
    }
}

/// Generates novel structure, outlines and chapter text through a backend
///
/// Cheap to clone; the backend handle is shared.
#[derive(Clone)]
pub struct NovelGenerator {
    backend: Arc<dyn CompletionBackend>,
    settings: GenerationSettings,
}

impl std::fmt::Debug for NovelGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NovelGenerator")
            .field("backend", &self.backend.name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl NovelGenerator {
    /// Create a generator over a backend
    pub fn new(backend: Arc<dyn CompletionBackend>, settings: GenerationSettings) -> Self {
        Self { backend, settings }
    }

    /// Active settings
    #[must_use]
    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Name of the backend in use
    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Generate the story structure for a new novel
    ///
    /// # Errors
    ///
    /// Validation errors before any upstream call; otherwise upstream,
    /// recovery or schema errors.
    pub async fn generate_structure(
        &self,
        request: &StructureRequest,
    ) -> Result<NovelStructure, StudioError> {
        let prompt = request.build_prompt()?;
        info!(title = %request.title, genre = %request.genre, "Generating story structure");

        let value = self.complete_json(prompt, RecoveryPolicy::Lenient).await?;
        NovelStructure::from_model_output(value)
    }

    /// Generate chapter outlines for a batch of chapters
    ///
    /// Returned chapters are numbered from 1 in the order the model listed
    /// them, with fresh ids and `outline` status.
    ///
    /// # Errors
    ///
    /// Validation errors before any upstream call; otherwise upstream,
    /// recovery or schema errors.
    pub async fn generate_outline(
        &self,
        request: &OutlineRequest,
    ) -> Result<Vec<Chapter>, StudioError> {
        let prompt = request.build_prompt()?;
        info!(
            title = %request.title,
            target_chapters = ?request.target_chapters,
            start_chapter = ?request.start_chapter,
            "Generating chapter outline"
        );

        let value = self.complete_json(prompt, RecoveryPolicy::Repairing).await?;
        let chapters = Chapter::outlines_from_model_output(&value)?;
        if let Some(target) = request.target_chapters {
            if chapters.len() != target as usize {
                warn!(
                    requested = target,
                    received = chapters.len(),
                    "Model returned a different number of chapters"
                );
            }
        }
        Ok(chapters)
    }

    /// Stream the text of one chapter
    ///
    /// The returned stream is already reframed into browser events and ends
    /// with the sentinel when the upstream completes normally.
    ///
    /// # Errors
    ///
    /// Validation errors before any upstream call; upstream errors when the
    /// streaming request is refused.
    pub async fn generate_chapter(
        &self,
        request: &ChapterRequest,
    ) -> Result<ByteStream, StudioError> {
        let prompt = request.build_prompt()?;
        info!(
            title = %request.title,
            chapter = ?request.chapter.as_ref().map(|c| c.number),
            "Generating chapter text"
        );

        let options = CompletionOptions::new(&self.settings.reasoner_model)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.chapter_max_tokens);
        let upstream = self
            .backend
            .stream(&CompletionRequest::new(prompt.into_messages(), options))
            .await?;

        Ok(reframe(upstream).boxed())
    }

    async fn complete_json(
        &self,
        prompt: Prompt,
        policy: RecoveryPolicy,
    ) -> Result<Value, StudioError> {
        let options = CompletionOptions::new(&self.settings.chat_model)
            .with_temperature(self.settings.temperature)
            .with_json_mode(true);
        let content = self
            .backend
            .complete(&CompletionRequest::new(prompt.into_messages(), options))
            .await?;
        debug!(chars = content.chars().count(), "Received completion");

        recover_json(&content, policy).inspect_err(|_| {
            warn!(content = %content, "Could not recover JSON from model output");
        })
    }
}
