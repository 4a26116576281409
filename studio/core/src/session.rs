//! Project Session
//!
//! Editing-session state for one open novel project.
//!
//! # Lifecycle
//!
//! A session is created when a project is opened (from the creation form or
//! from a stored [`Project`]) and dropped when the author navigates away.
//! Nothing here is persisted; [`ProjectSession::into_project`] hands the
//! project back to whatever stores it.
//!
//! ```text
//! create ──► structure ──► outline ──► write ──► export
//!  draft      planning                 writing    completed
//! ```
//!
//! The session also builds the generation requests for its project, so the
//! prompt inputs always match the project's current state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::StudioError;
use crate::novel::{Chapter, ChapterStatus, NovelStructure};
use crate::prompt::{ChapterRequest, OutlineRequest, StructureRequest};

/// Input of the project creation form
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectForm {
    /// Novel title
    pub title: String,
    /// Core idea or theme
    pub theme: String,
    /// Genre label
    pub genre: String,
    /// Planned number of chapters
    pub target_chapters: u32,
    /// Target length of each chapter, in characters
    pub words_per_chapter: u32,
    /// Extra direction for every generation step
    pub guidance: String,
}

/// Overall progress of a project
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    /// Created, no structure yet
    #[default]
    Draft,
    /// Structure generated, chapters not yet written
    Planning,
    /// At least one chapter written
    Writing,
    /// Every chapter written
    Completed,
}

/// The editor view the author is on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStep {
    /// Filling in the creation form
    #[default]
    Create,
    /// Reviewing the story structure
    Structure,
    /// Reviewing chapter outlines
    Outline,
    /// Writing chapters
    Write,
    /// Exporting the manuscript
    Export,
}

/// A novel project
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Stable identifier
    pub id: Uuid,
    /// Novel title
    pub title: String,
    /// Core idea or theme
    pub theme: String,
    /// Genre label
    pub genre: String,
    /// Planned number of chapters
    pub target_chapters: u32,
    /// Target length of each chapter, in characters
    pub words_per_chapter: u32,
    /// Extra direction for every generation step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Overall progress
    pub status: ProjectStatus,
    /// Story structure, once generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<NovelStructure>,
    /// Chapters in reading order
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

impl Project {
    /// Number of chapters with text
    #[must_use]
    pub fn completed_chapters(&self) -> usize {
        self.chapters
            .iter()
            .filter(|c| matches!(c.status, ChapterStatus::Written | ChapterStatus::Revised))
            .count()
    }

    /// Total characters written across all chapters
    #[must_use]
    pub fn total_words(&self) -> usize {
        self.chapters.iter().map(|c| c.word_count).sum()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn chapter_index(&self, id: Uuid) -> Result<usize, StudioError> {
        self.chapters
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StudioError::validation(format!("chapter {id} not found")))
    }
}

/// Editing-session state for one open project
#[derive(Clone, Debug)]
pub struct ProjectSession {
    project: Project,
    step: WorkflowStep,
    current_chapter: Option<Uuid>,
    generating: bool,
}

impl ProjectSession {
    /// Start a session for a new project
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Validation`] when title or genre is blank, or a
    /// chapter count or length is zero.
    pub fn create(form: ProjectForm) -> Result<Self, StudioError> {
        if form.title.trim().is_empty() {
            return Err(StudioError::validation("title is required"));
        }
        if form.genre.trim().is_empty() {
            return Err(StudioError::validation("genre is required"));
        }
        if form.target_chapters == 0 || form.words_per_chapter == 0 {
            return Err(StudioError::validation(
                "targetChapters and wordsPerChapter must be positive",
            ));
        }

        let now = Utc::now();
        let guidance = Some(form.guidance.trim().to_string()).filter(|g| !g.is_empty());
        let project = Project {
            id: Uuid::new_v4(),
            title: form.title.trim().to_string(),
            theme: form.theme.trim().to_string(),
            genre: form.genre.trim().to_string(),
            target_chapters: form.target_chapters,
            words_per_chapter: form.words_per_chapter,
            guidance,
            created_at: now,
            updated_at: now,
            status: ProjectStatus::Draft,
            structure: None,
            chapters: Vec::new(),
        };
        debug!(project_id = %project.id, "Created project");

        Ok(Self {
            project,
            step: WorkflowStep::Structure,
            current_chapter: None,
            generating: false,
        })
    }

    /// Open an existing project on the step its progress calls for
    #[must_use]
    pub fn load(project: Project) -> Self {
        let step = if project.structure.is_none() {
            WorkflowStep::Structure
        } else if project.chapters.is_empty() {
            WorkflowStep::Outline
        } else {
            WorkflowStep::Write
        };
        let current_chapter = project
            .chapters
            .iter()
            .find(|c| !matches!(c.status, ChapterStatus::Written | ChapterStatus::Revised))
            .or_else(|| project.chapters.first())
            .map(|c| c.id);

        Self {
            project,
            step,
            current_chapter,
            generating: false,
        }
    }

    /// The project being edited
    #[must_use]
    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Close the session, returning the project
    #[must_use]
    pub fn into_project(self) -> Project {
        self.project
    }

    /// Current editor view
    #[must_use]
    pub fn step(&self) -> WorkflowStep {
        self.step
    }

    /// Move to another editor view
    pub fn set_step(&mut self, step: WorkflowStep) {
        self.step = step;
    }

    /// Chapter selected in the writing view
    #[must_use]
    pub fn current_chapter(&self) -> Option<&Chapter> {
        let id = self.current_chapter?;
        self.project.chapters.iter().find(|c| c.id == id)
    }

    /// Select a chapter in the writing view
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Validation`] for an unknown chapter id.
    pub fn select_chapter(&mut self, id: Uuid) -> Result<(), StudioError> {
        self.project.chapter_index(id)?;
        self.current_chapter = Some(id);
        Ok(())
    }

    /// Whether a generation request is in flight
    #[must_use]
    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Mark a generation request as started
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Validation`] when one is already in flight.
    pub fn begin_generation(&mut self) -> Result<(), StudioError> {
        if self.generating {
            return Err(StudioError::validation("a generation is already in progress"));
        }
        self.generating = true;
        Ok(())
    }

    /// Mark the in-flight generation request as finished
    pub fn end_generation(&mut self) {
        self.generating = false;
    }

    /// Store a generated structure
    pub fn update_structure(&mut self, structure: NovelStructure) {
        self.project.structure = Some(structure);
        self.project.status = ProjectStatus::Planning;
        self.project.touch();
    }

    /// Replace the chapter list with a freshly generated outline
    pub fn add_chapters(&mut self, chapters: Vec<Chapter>) {
        self.current_chapter = chapters.first().map(|c| c.id);
        self.project.chapters = chapters;
        self.refresh_status();
        self.project.touch();
    }

    /// Append an outline batch after the existing chapters
    ///
    /// Batch chapters are renumbered to follow the last existing chapter.
    pub fn extend_chapters(&mut self, chapters: Vec<Chapter>) {
        let offset = self.project.chapters.last().map_or(0, |c| c.number);
        for (mut chapter, number) in chapters.into_iter().zip(offset.saturating_add(1)..) {
            chapter.number = number;
            self.project.chapters.push(chapter);
        }
        if self.current_chapter.is_none() {
            self.current_chapter = self.project.chapters.first().map(|c| c.id);
        }
        self.refresh_status();
        self.project.touch();
    }

    /// Edit a chapter's title and outline
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Validation`] for an unknown chapter id.
    pub fn update_chapter(
        &mut self,
        id: Uuid,
        title: impl Into<String>,
        outline: impl Into<String>,
    ) -> Result<(), StudioError> {
        let index = self.project.chapter_index(id)?;
        let chapter = &mut self.project.chapters[index];
        chapter.title = title.into();
        chapter.outline = outline.into();
        self.project.touch();
        Ok(())
    }

    /// Store generated text for a chapter
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Validation`] for an unknown chapter id.
    pub fn record_chapter_text(&mut self, id: Uuid, content: String) -> Result<(), StudioError> {
        self.set_chapter_content(id, content, ChapterStatus::Written)
    }

    /// Store author edits of a chapter's text
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Validation`] for an unknown chapter id.
    pub fn revise_chapter(&mut self, id: Uuid, content: String) -> Result<(), StudioError> {
        self.set_chapter_content(id, content, ChapterStatus::Revised)
    }

    fn set_chapter_content(
        &mut self,
        id: Uuid,
        content: String,
        status: ChapterStatus,
    ) -> Result<(), StudioError> {
        let index = self.project.chapter_index(id)?;
        self.project.chapters[index].set_content(content, status);
        self.refresh_status();
        self.project.touch();
        Ok(())
    }

    fn refresh_status(&mut self) {
        let written = self.project.completed_chapters();
        self.project.status = if written == 0 {
            if self.project.structure.is_some() {
                ProjectStatus::Planning
            } else {
                ProjectStatus::Draft
            }
        } else if written == self.project.chapters.len() {
            ProjectStatus::Completed
        } else {
            ProjectStatus::Writing
        };
    }

    /// Request for the story structure of this project
    #[must_use]
    pub fn structure_request(&self) -> StructureRequest {
        StructureRequest {
            title: self.project.title.clone(),
            theme: self.project.theme.clone(),
            genre: self.project.genre.clone(),
            guidance: self.project.guidance.clone(),
        }
    }

    /// Request for the next outline batch
    ///
    /// With no chapters yet the whole novel is requested at once. Otherwise
    /// the batch continues after the last chapter, at most `batch_size`
    /// chapters long, with every existing outline as context.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Validation`] when there is no structure yet, or
    /// every planned chapter is already outlined.
    pub fn outline_request(&self, batch_size: Option<u32>) -> Result<OutlineRequest, StudioError> {
        let structure = self.structure_value()?;
        let outlined = self.project.chapters.last().map_or(0, |c| c.number);
        let total = self.project.target_chapters;
        let remaining = total.saturating_sub(outlined);
        if remaining == 0 {
            return Err(StudioError::validation("every planned chapter is already outlined"));
        }
        let target = batch_size.filter(|n| *n > 0).map_or(remaining, |n| n.min(remaining));
        let batched = outlined > 0 || target < total;

        Ok(OutlineRequest {
            title: self.project.title.clone(),
            theme: self.project.theme.clone(),
            genre: self.project.genre.clone(),
            structure: Some(structure),
            target_chapters: Some(target),
            guidance: self.project.guidance.clone(),
            start_chapter: batched.then_some(outlined + 1),
            total_chapters: batched.then_some(total),
            previous_chapters: self.project.chapters.iter().map(Chapter::descriptor).collect(),
        })
    }

    /// Request for the text of one chapter, with the chapter before it as context
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Validation`] when there is no structure yet or
    /// the chapter id is unknown.
    pub fn chapter_request(&self, id: Uuid, strict_mode: bool) -> Result<ChapterRequest, StudioError> {
        let structure = self.structure_value()?;
        let index = self.project.chapter_index(id)?;
        let previous = index
            .checked_sub(1)
            .map(|i| self.project.chapters[i].descriptor());

        Ok(ChapterRequest {
            title: self.project.title.clone(),
            theme: self.project.theme.clone(),
            genre: self.project.genre.clone(),
            structure: Some(structure),
            chapter: Some(self.project.chapters[index].descriptor()),
            words_per_chapter: Some(self.project.words_per_chapter),
            max_words: None,
            previous_chapter: previous,
            guidance: self.project.guidance.clone(),
            strict_mode,
        })
    }

    fn structure_value(&self) -> Result<serde_json::Value, StudioError> {
        let structure = self
            .project
            .structure
            .as_ref()
            .ok_or_else(|| StudioError::validation("generate the story structure first"))?;
        serde_json::to_value(structure)
            .map_err(|e| StudioError::schema(format!("story structure is malformed: {e}")))
    }
}
