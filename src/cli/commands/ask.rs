//! Ask command implementation.

use crate::agent::Agent;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// Answer a single question locally without submitting.
pub async fn run_ask(
    question: &str,
    file: Option<String>,
    model: Option<String>,
    mut settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Answer, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'gaia-runner doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let file_path = match file {
        Some(f) => {
            let path = Settings::expand_path(&f);
            if !path.exists() {
                anyhow::bail!("File not found: {}", path.display());
            }
            Some(path)
        }
        None => None,
    };

    if let Some(model) = model {
        settings.agent.model = model;
    }

    let agent = Agent::from_settings(&settings)?;
    answer_and_print(&agent, question, file_path).await
}

/// Run the agent on one question and print the answer with its tool trace.
pub(super) async fn answer_and_print(
    agent: &Agent,
    question: &str,
    file_path: Option<PathBuf>,
) -> Result<()> {
    let prompt = agent.format_prompt(question, file_path.as_deref());
    let spinner = Output::spinner(&format!("Thinking with {}...", agent.model()));

    match agent.run(&prompt).await {
        Ok(response) => {
            spinner.finish_and_clear();

            if !response.tool_calls.is_empty() {
                Output::header("Tool calls");
                for call in &response.tool_calls {
                    Output::kv("tool", &call.to_string());
                }
            }

            Output::header("Answer");
            println!("{}", response.content);
            println!();
            Output::kv("iterations", &response.iterations.to_string());
            Ok(())
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Agent failed: {}", e));
            Err(e.into())
        }
    }
}
