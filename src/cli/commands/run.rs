//! Run command: answer every question and submit.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::run_and_submit_all;
use anyhow::Result;

/// Run the full evaluation from the terminal.
pub async fn run_evaluation(
    username: Option<String>,
    model: Option<String>,
    mut settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Answer, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'gaia-runner doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.agent.model = model;
    }
    let username = username.or_else(|| settings.submission.username.clone());

    Output::info(&format!("Running agent with model {}", settings.agent.model));
    let progress = Output::progress_bar(0, "Fetching questions");

    let outcome = run_and_submit_all(&settings, username.as_deref(), Some(progress)).await;

    if let Some(results) = &outcome.results {
        Output::header("Questions and Agent Answers");
        Output::results_table(results);
        println!();
    }

    Output::header("Run Status / Submission Result");
    println!("{}", outcome.status);

    Ok(())
}
