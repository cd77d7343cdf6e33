//! Agent system for answering benchmark questions with tool calling.
//!
//! Provides an LLM agent that can read attached files, fetch web pages and
//! inspect images before committing to a short exact-match answer.

mod runner;
mod tools;

pub use runner::{Agent, AgentResponse, ToolCallRecord};
pub use tools::{
    extract_text_from_html, load_file_content, parse_tool_call, tool_definitions, ToolCall,
    ToolContext, TOOL_NAMES,
};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Anything that can turn a question (and optional attached file) into an answer.
#[async_trait]
pub trait AnswerAgent: Send + Sync {
    /// Produce the answer string for a question.
    async fn answer(&self, question: &str, file_path: Option<&Path>) -> Result<String>;
}
