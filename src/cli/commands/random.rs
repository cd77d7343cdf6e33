//! Fetch one random question and try it locally.

use super::ask::answer_and_print;
use crate::agent::Agent;
use crate::api::{GaiaApiClient, ScoringApi};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::save_task_file;
use anyhow::Result;

/// Fetch a random question, show it, and optionally answer it without submitting.
pub async fn run_random(no_answer: bool, settings: Settings) -> Result<()> {
    if !no_answer {
        if let Err(e) = preflight::check(Operation::Answer, &settings) {
            Output::error(&format!("{}", e));
            Output::info("Use --no-answer to only show the question.");
            return Err(e.into());
        }
    }

    let client = GaiaApiClient::from_settings(&settings.api)?;
    let item = client.get_random_question().await?;

    let Some((task_id, question)) = item.validated() else {
        anyhow::bail!("Random question is missing task_id or question: {:?}", item);
    };

    Output::header("Random question");
    Output::kv("task_id", task_id);
    if let Some(name) = item.file_name.as_deref().filter(|n| !n.is_empty()) {
        Output::kv("file", name);
    }
    println!("\n{}", question);

    if no_answer {
        return Ok(());
    }

    std::fs::create_dir_all(settings.temp_dir())?;
    let task_dir = tempfile::Builder::new()
        .prefix("gaia-run-")
        .tempdir_in(settings.temp_dir())?;

    let file_path = match client.get_file(task_id).await {
        Ok(content) => {
            let extension = item.file_extension().unwrap_or_else(|| ".txt".to_string());
            save_task_file(&content, task_id, &extension, task_dir.path())?
        }
        Err(e) => {
            tracing::info!("No file found for task {} or error: {}", task_id, e);
            None
        }
    };

    let agent = Agent::from_settings(&settings)?;
    answer_and_print(&agent, question, file_path).await
}
