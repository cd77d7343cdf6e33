//! Configuration settings for the GAIA runner.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default scoring API for the agents course GAIA subset.
pub const DEFAULT_API_URL: &str = "https://agents-course-unit4-scoring.hf.space";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub api: ApiSettings,
    pub agent: AgentSettings,
    pub tools: ToolSettings,
    pub submission: SubmissionSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Parent directory for per-run task files.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir().to_string_lossy().into_owned(),
            log_level: "warn".to_string(),
        }
    }
}

/// Scoring API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL of the scoring service.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 120,
        }
    }
}

/// Agent model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Chat model driving the agent.
    pub model: String,
    /// OpenAI-compatible API base. None uses the OpenAI default.
    pub api_base: Option<String>,
    /// Maximum LLM calls per question.
    pub max_iterations: usize,
    /// Timeout for a single LLM request, in seconds.
    pub timeout_secs: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_base: None,
            max_iterations: 15,
            timeout_secs: 300,
        }
    }
}

/// Tool sandbox settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Tools the agent is allowed to call.
    pub enabled: Vec<String>,
    /// Vision model used by `describe_image`.
    pub vision_model: String,
    /// OCR executable used by `text_from_image`.
    pub ocr_command: String,
    /// Tool output is truncated to this many characters before reaching the model.
    pub max_output_chars: usize,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            enabled: vec![
                "load_file_content".to_string(),
                "webpage_reader".to_string(),
                "text_from_image".to_string(),
                "describe_image".to_string(),
            ],
            vision_model: "gpt-4o-mini".to_string(),
            ocr_command: "tesseract".to_string(),
            max_output_chars: 40_000,
        }
    }
}

/// Submission identity settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct SubmissionSettings {
    /// Username used when none is supplied by the caller.
    pub username: Option<String>,
    /// Hugging Face space hosting the agent code. Falls back to `SPACE_ID`.
    pub space_id: Option<String>,
}

/// UI server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7860,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gaia-runner")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Configured space id, or the `SPACE_ID` environment variable.
    pub fn space_id(&self) -> Option<String> {
        self.submission
            .space_id
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| std::env::var("SPACE_ID").ok().filter(|s| !s.is_empty()))
    }

    /// Link to the agent's code, sent with every submission.
    pub fn agent_code(&self) -> String {
        agent_code_for(self.space_id().as_deref())
    }
}

/// Build the agent code link for a space id.
pub fn agent_code_for(space_id: Option<&str>) -> String {
    match space_id {
        Some(id) => format!("https://huggingface.co/spaces/{}/tree/main", id),
        None => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.api.base_url, DEFAULT_API_URL);
        assert_eq!(settings.agent.max_iterations, 15);
        assert_eq!(settings.tools.enabled.len(), 4);
        assert_eq!(settings.server.port, 7860);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [agent]
            model = "gpt-4.1"

            [tools]
            enabled = ["webpage_reader"]
            "#,
        )
        .unwrap();

        assert_eq!(settings.agent.model, "gpt-4.1");
        assert_eq!(settings.agent.max_iterations, 15);
        assert_eq!(settings.tools.enabled, vec!["webpage_reader"]);
        assert_eq!(settings.tools.ocr_command, "tesseract");
        assert_eq!(settings.api.base_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_agent_code() {
        assert_eq!(
            agent_code_for(Some("someone/gaia-agent")),
            "https://huggingface.co/spaces/someone/gaia-agent/tree/main"
        );
        assert_eq!(agent_code_for(None), "unknown");

        let mut settings = Settings::default();
        settings.submission.space_id = Some("me/space".to_string());
        assert_eq!(
            settings.agent_code(),
            "https://huggingface.co/spaces/me/space/tree/main"
        );
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.agent.model, "gpt-4o-mini");
    }
}
