//! List the questions served by the scoring API.

use crate::api::{GaiaApiClient, ScoringApi};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use console::style;

/// Print every question with its task id and attachment.
pub async fn run_questions(settings: Settings) -> Result<()> {
    preflight::check(Operation::Browse, &settings)?;
    let client = GaiaApiClient::from_settings(&settings.api)?;

    let spinner = Output::spinner("Fetching questions...");
    let questions = client.get_questions().await;
    spinner.finish_and_clear();

    let questions = match questions {
        Ok(q) => q,
        Err(e) => {
            Output::error(&format!("Error fetching questions: {}", e));
            return Err(e.into());
        }
    };

    if questions.is_empty() {
        Output::warning("Fetched questions list is empty.");
        return Ok(());
    }

    Output::header(&format!("{} questions", questions.len()));
    for item in &questions {
        let task_id = item.task_id.as_deref().unwrap_or("<missing task_id>");
        println!("\n{} {}", style(">>").cyan(), style(task_id).bold());
        println!("   {}", item.question.as_deref().unwrap_or("<missing question>"));
        if let Some(name) = item.file_name.as_deref().filter(|n| !n.is_empty()) {
            println!("   {} {}", style("file:").dim(), name);
        }
    }

    Ok(())
}
