//! Story structure prompt

use serde::{Deserialize, Serialize};

use super::{optional_text, require_text, Prompt};
use crate::error::StudioError;

const STRUCTURE_SYSTEM_PROMPT: &str = r#"你是一位专业的小说架构师。请根据用户提供的信息，创建一个完整的小说架构。
请务必返回合法的 JSON 格式，不要包含 Markdown 代码块标记（如 ```json）。
JSON 结构如下：
{
  "worldSetting": "世界观设定，包括时代背景、地理环境、社会结构等",
  "mainCharacters": [
    {
      "name": "角色名称",
      "role": "角色身份，如主角、反派、配角等",
      "description": "角色外貌、性格特点",
      "motivation": "角色的核心动机和目标"
    }
  ],
  "plotSummary": "故事情节概要，包括开端、发展、高潮、结局",
  "themes": ["故事的核心主题1", "故事的核心主题2"],
  "timeline": "故事时间线概述"
}"#;

/// Request to generate the story structure of a new project
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StructureRequest {
    /// Novel title
    pub title: String,
    /// Core idea or theme
    pub theme: String,
    /// Genre label
    pub genre: String,
    /// Extra direction from the author
    pub guidance: Option<String>,
}

impl StructureRequest {
    /// Validate and render the prompt
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Validation`] when `title` or `genre` is blank.
    pub fn build_prompt(&self) -> Result<Prompt, StudioError> {
        let title = require_text("title", &self.title)?;
        let genre = require_text("genre", &self.genre)?;

        let mut user = format!(
            "小说标题：{title}\n核心创意/主题：{theme}\n小说类型：{genre}\n",
            theme = self.theme.trim()
        );
        if let Some(guidance) = optional_text(self.guidance.as_ref()) {
            user.push_str(&format!("创作指导：{guidance}\n"));
        }
        user.push_str(
            "\n请创建一个引人入胜、逻辑自洽的故事架构。确保：\n\
             1. 世界观设定要详细且符合类型特点\n\
             2. 角色要有鲜明的个性和清晰的动机\n\
             3. 情节要有张力和起伏\n\
             4. 主题要深刻且贯穿全文\n\n\
             请直接返回 JSON 数据。",
        );

        Ok(Prompt {
            system: STRUCTURE_SYSTEM_PROMPT.to_string(),
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> StructureRequest {
        StructureRequest {
            title: "雾港".to_string(),
            theme: "记忆与背叛".to_string(),
            genre: "悬疑".to_string(),
            guidance: None,
        }
    }

    #[test]
    fn test_prompt_contains_inputs() {
        let prompt = request().build_prompt().unwrap();
        assert!(prompt.system.contains("\"mainCharacters\""));
        assert!(prompt.user.contains("小说标题：雾港"));
        assert!(prompt.user.contains("小说类型：悬疑"));
        assert!(!prompt.user.contains("创作指导"));
    }

    #[test]
    fn test_guidance_is_included_when_present() {
        let mut req = request();
        req.guidance = Some("第一人称叙述".to_string());
        assert!(req.build_prompt().unwrap().user.contains("创作指导：第一人称叙述"));

        req.guidance = Some("   ".to_string());
        assert!(!req.build_prompt().unwrap().user.contains("创作指导"));
    }

    #[test]
    fn test_assembly_is_deterministic() {
        assert_eq!(request().build_prompt().unwrap(), request().build_prompt().unwrap());
    }

    #[test]
    fn test_missing_title_is_rejected() {
        let mut req = request();
        req.title.clear();
        assert!(req.build_prompt().unwrap_err().is_validation());
    }

    #[test]
    fn test_deserializes_camel_case_body() {
        let req: StructureRequest = serde_json::from_str(
            r#"{"title":"雾港","theme":"t","genre":"悬疑","guidance":"g","extra":1}"#,
        )
        .unwrap();
        assert_eq!(req.guidance.as_deref(), Some("g"));
    }
}
