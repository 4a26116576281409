//! Chapter outline prompt

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{character_lines, optional_text, require_text, Prompt};
use crate::error::StudioError;
use crate::novel::{validated_structure, ChapterDescriptor, StructureCheck};

/// Request to outline a batch of chapters
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutlineRequest {
    /// Novel title
    pub title: String,
    /// Core idea or theme
    pub theme: String,
    /// Genre label
    pub genre: String,
    /// Story structure, untyped until validated
    pub structure: Option<Value>,
    /// Number of chapters to outline in this batch
    pub target_chapters: Option<u32>,
    /// Extra direction from the author
    pub guidance: Option<String>,
    /// First chapter number of this batch, for incremental outlining
    pub start_chapter: Option<u32>,
    /// Total chapters planned for the novel
    pub total_chapters: Option<u32>,
    /// Chapters already outlined, for continuity
    pub previous_chapters: Vec<ChapterDescriptor>,
}

impl OutlineRequest {
    /// Validate and render the prompt
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Validation`] when title, genre, structure or a
    /// positive `targetChapters` is missing, or the structure lacks world
    /// setting, plot summary or a non-empty character list.
    pub fn build_prompt(&self) -> Result<Prompt, StudioError> {
        let title = require_text("title", &self.title)?;
        let genre = require_text("genre", &self.genre)?;
        let target = self
            .target_chapters
            .filter(|n| *n > 0)
            .ok_or_else(|| StudioError::validation("targetChapters must be a positive number"))?;
        let structure = validated_structure(self.structure.as_ref(), StructureCheck::Complete)?;
        let range = self.batch_range(target)?;

        let batch = self.batch_description(target, range);

        let system = format!(
            r#"你是一位专业的小说大纲策划师。请根据用户提供的小说架构，创建{batch}的详细大纲。
请务必返回合法的 JSON 格式，不要包含 Markdown 代码块标记。
JSON 结构如下：
{{
  "chapters": [
    {{
      "number": 1,
      "title": "章节标题",
      "outline": "章节大纲，详细描述本章的主要情节、人物互动和关键事件"
    }}
  ]
}}

注意：返回的章节数量必须是 {target} 章。"#
        );

        let mut user = format!(
            "【小说信息】\n标题：{title}\n类型：{genre}\n核心主题：{theme}\n\n\
             【故事架构】\n世界观：{world}\n\n主要角色：\n{characters}\n\n\
             故事梗概：{plot}\n\n核心主题：{themes}\n",
            theme = self.theme.trim(),
            world = structure.world_setting,
            characters = character_lines(&structure.main_characters, true),
            plot = structure.plot_summary,
            themes = structure.themes.join("、"),
        );

        if let Some(guidance) = optional_text(self.guidance.as_ref()) {
            let _ = writeln!(user, "\n【创作指导】{guidance}");
        }

        if !self.previous_chapters.is_empty() {
            let previous = self
                .previous_chapters
                .iter()
                .map(|c| format!("第{}章 {}：{}", c.number, c.title, c.outline))
                .collect::<Vec<_>>()
                .join("\n\n");
            let _ = writeln!(
                user,
                "\n【前文章节】\n{previous}\n\n请确保后续章节与前文连贯，情节自然衔接。"
            );
        }

        let _ = writeln!(
            user,
            "\n请创建{batch}的详细大纲，确保：\n\
             1. 每章标题要吸引人，能概括章节核心\n\
             2. 每章大纲要包含主要情节、角色互动、关键转折\n\
             3. 章节之间要有逻辑递进和情感起伏\n\
             4. 整体节奏要张弛有度，前后呼应\n\
             5. 伏笔和悬念要合理安排"
        );
        if let Some((start, end)) = range {
            let _ = writeln!(user, "6. 这是第 {start} 到 {end} 章，请确保与前文连贯");
        }
        let _ = write!(user, "\n请直接返回 JSON 数据，必须包含 {target} 个章节。");

        Ok(Prompt { system, user })
    }

    /// First and last chapter numbers of an incremental batch
    fn batch_range(&self, target: u32) -> Result<Option<(u32, u32)>, StudioError> {
        let Some(start) = self.start_chapter.filter(|start| *start > 0) else {
            return Ok(None);
        };
        let end = start
            .checked_add(target - 1)
            .ok_or_else(|| StudioError::validation("startChapter + targetChapters out of range"))?;
        Ok(Some((start, end)))
    }

    fn batch_description(&self, target: u32, range: Option<(u32, u32)>) -> String {
        match range {
            Some((start, end)) => {
                let total = self.total_chapters.unwrap_or(end);
                format!("第 {start} 到 {end} 章（共 {total} 章）")
            }
            None => format!("{target} 章"),
        }
    }
}
