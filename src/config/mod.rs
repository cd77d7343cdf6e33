//! Configuration module for the GAIA runner.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnswerPrompts, Prompts};
pub use settings::{
    agent_code_for, AgentSettings, ApiSettings, GeneralSettings, PromptSettings, ServerSettings,
    Settings, SubmissionSettings, ToolSettings, DEFAULT_API_URL,
};
