//! Evaluation run orchestrator.
//!
//! Fetches every question, answers them one at a time, and submits the
//! collected answers in a single request. A failing question is recorded in
//! the results log and never aborts the run.

use crate::agent::{Agent, AnswerAgent};
use crate::api::{AnswerRecord, GaiaApiClient, Question, ScoringApi, SubmissionResult};
use crate::config::Settings;
use crate::error::Result;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Status shown when nobody is logged in.
pub const LOGIN_REQUIRED: &str = "Please Login to Hugging Face with the button.";

/// One row of the results table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultLogEntry {
    #[serde(rename = "Task ID")]
    pub task_id: String,
    #[serde(rename = "Question")]
    pub question: String,
    #[serde(rename = "Submitted Answer")]
    pub submitted_answer: String,
}

/// The two values a caller renders: a status message and the results table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunOutcome {
    pub status: String,
    pub results: Option<Vec<ResultLogEntry>>,
}

impl RunOutcome {
    fn status_only(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            results: None,
        }
    }

    fn with_results(status: impl Into<String>, results: Vec<ResultLogEntry>) -> Self {
        Self {
            status: status.into(),
            results: Some(results),
        }
    }
}

/// Answers and log entries gathered by the question loop.
#[derive(Debug, Default)]
pub struct AnswerBatch {
    pub answers: Vec<AnswerRecord>,
    pub results: Vec<ResultLogEntry>,
}

/// Drives an agent over the scoring API's questions.
pub struct Orchestrator {
    api: Arc<dyn ScoringApi>,
    agent: Arc<dyn AnswerAgent>,
    temp_root: PathBuf,
    progress: ProgressBar,
}

impl Orchestrator {
    /// Create an orchestrator with the given collaborators.
    pub fn new(api: Arc<dyn ScoringApi>, agent: Arc<dyn AnswerAgent>) -> Self {
        Self {
            api,
            agent,
            temp_root: std::env::temp_dir(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Create an orchestrator with the real API client and agent.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let agent = Agent::from_settings(settings)?;
        info!("Agent initialized with model {}", agent.model());
        let api = GaiaApiClient::from_settings(&settings.api)?;
        info!("API client targeting {}", api.base_url());

        let temp_root = settings.temp_dir();
        std::fs::create_dir_all(&temp_root)?;

        Ok(Self::new(Arc::new(api), Arc::new(agent)).with_temp_root(temp_root))
    }

    /// Parent directory for the per-run task file directory.
    pub fn with_temp_root(mut self, temp_root: PathBuf) -> Self {
        self.temp_root = temp_root;
        self
    }

    /// Report loop progress on the given bar.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Fetch questions, answer them all, and submit the answers.
    #[instrument(skip(self), fields(run_id = %uuid::Uuid::new_v4()))]
    pub async fn run(&self, username: &str, agent_code: &str) -> RunOutcome {
        let questions = match self.api.get_questions().await {
            Ok(q) if q.is_empty() => {
                return RunOutcome::status_only("Fetched questions list is empty or invalid.")
            }
            Ok(q) => q,
            Err(e) => return RunOutcome::status_only(format!("Error fetching questions: {}", e)),
        };
        info!("Fetched {} questions.", questions.len());

        let batch = match self.answer_all(&questions).await {
            Ok(batch) => batch,
            Err(e) => {
                return RunOutcome::status_only(format!("Failed to prepare task files: {}", e))
            }
        };

        if batch.answers.is_empty() {
            return RunOutcome::with_results(
                "Agent did not produce any answers to submit.",
                batch.results,
            );
        }

        info!(
            "Submitting {} answers for user '{}'",
            batch.answers.len(),
            username
        );
        match self
            .api
            .submit_answers(username, agent_code, &batch.answers)
            .await
        {
            Ok(result) => {
                info!("Submission successful");
                RunOutcome::with_results(format_submission_status(&result, username), batch.results)
            }
            Err(e) => {
                warn!("Submission failed: {}", e);
                RunOutcome::with_results(format!("Submission failed: {}", e), batch.results)
            }
        }
    }

    /// Answer every valid question in order.
    ///
    /// Only creating the run's temp directory can fail; per-question errors
    /// are recorded in the results log.
    pub async fn answer_all(&self, questions: &[Question]) -> Result<AnswerBatch> {
        let task_dir = tempfile::Builder::new()
            .prefix("gaia-run-")
            .tempdir_in(&self.temp_root)?;

        let mut batch = AnswerBatch::default();
        self.progress.set_length(questions.len() as u64);

        for item in questions {
            self.progress.inc(1);

            let Some((task_id, question_text)) = item.validated() else {
                warn!("Skipping item with missing task_id or question: {:?}", item);
                continue;
            };
            self.progress.set_message(task_id.to_string());

            let file_path = self.fetch_task_file(item, task_id, task_dir.path()).await;

            match self.agent.answer(question_text, file_path.as_deref()).await {
                Ok(submitted_answer) => {
                    batch.answers.push(AnswerRecord {
                        task_id: task_id.to_string(),
                        submitted_answer: submitted_answer.clone(),
                    });
                    batch.results.push(ResultLogEntry {
                        task_id: task_id.to_string(),
                        question: question_text.to_string(),
                        submitted_answer,
                    });
                }
                Err(e) => {
                    warn!("Agent error on task {}: {}", task_id, e);
                    batch.results.push(ResultLogEntry {
                        task_id: task_id.to_string(),
                        question: question_text.to_string(),
                        submitted_answer: format!("AGENT ERROR: {}", e),
                    });
                }
            }
        }

        self.progress.finish_and_clear();
        Ok(batch)
    }

    /// Download a task's attachment into the run directory.
    ///
    /// Any failure is logged and treated as "no file".
    async fn fetch_task_file(&self, item: &Question, task_id: &str, dir: &Path) -> Option<PathBuf> {
        let content = match self.api.get_file(task_id).await {
            Ok(content) => content,
            Err(e) => {
                info!("No file found for task {} or error: {}", task_id, e);
                return None;
            }
        };
        info!("Found file for task {}", task_id);

        let extension = item.file_extension().unwrap_or_else(|| ".txt".to_string());
        match save_task_file(&content, task_id, &extension, dir) {
            Ok(path) => path,
            Err(e) => {
                warn!("Could not save file for task {}: {}", task_id, e);
                None
            }
        }
    }
}

/// Write a task file, returning None for empty content.
pub fn save_task_file(
    content: &[u8],
    task_id: &str,
    extension: &str,
    dir: &Path,
) -> Result<Option<PathBuf>> {
    if content.is_empty() {
        return Ok(None);
    }

    let safe_id: String = task_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let path = dir.join(format!("gaia_task_{}{}", safe_id, extension));
    std::fs::write(&path, content)?;
    Ok(Some(path))
}

/// Status text for a successful submission.
pub fn format_submission_status(result: &SubmissionResult, username: &str) -> String {
    let score = result
        .score
        .map(|s| s.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let correct = result
        .correct_count
        .map(|c| c.to_string())
        .unwrap_or_else(|| "?".to_string());
    let total = result
        .total_attempted
        .map(|t| t.to_string())
        .unwrap_or_else(|| "?".to_string());

    format!(
        "Submission Successful!\nUser: {}\nOverall Score: {}% ({}/{} correct)\nMessage: {}",
        result.username.as_deref().unwrap_or(username),
        score,
        correct,
        total,
        result.message.as_deref().unwrap_or("No message received.")
    )
}

/// Full evaluation entry point used by the UI and the CLI.
///
/// `profile` is the username provided by the external login. The progress
/// bar, if any, is always finished when this returns.
pub async fn run_and_submit_all(
    settings: &Settings,
    profile: Option<&str>,
    progress: Option<ProgressBar>,
) -> RunOutcome {
    let outcome = run_with_progress(settings, profile, progress.clone()).await;
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }
    outcome
}

async fn run_with_progress(
    settings: &Settings,
    profile: Option<&str>,
    progress: Option<ProgressBar>,
) -> RunOutcome {
    let Some(username) = profile.map(str::trim).filter(|u| !u.is_empty()) else {
        info!("User not logged in.");
        return RunOutcome::status_only(LOGIN_REQUIRED);
    };
    info!("User logged in: {}", username);

    let orchestrator = match Orchestrator::from_settings(settings) {
        Ok(o) => o,
        Err(e) => {
            warn!("Error initializing agent or API client: {}", e);
            return RunOutcome::status_only(format!(
                "Error initializing agent or API client: {}",
                e
            ));
        }
    };
    let orchestrator = match progress {
        Some(bar) => orchestrator.with_progress(bar),
        None => orchestrator,
    };

    orchestrator.run(username, &settings.agent_code()).await
}
