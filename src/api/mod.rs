//! Scoring API access.
//!
//! The scoring service hands out GAIA questions and their attached files,
//! and grades a bulk submission of answers.

mod client;

pub use client::GaiaApiClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A benchmark question as served by the scoring API.
///
/// Every field is optional on the wire; use [`Question::validated`] before
/// processing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Question {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    /// Name of the attached file, empty when the task has none.
    #[serde(default)]
    pub file_name: Option<String>,
}

impl Question {
    pub fn new(task_id: &str, question: &str) -> Self {
        Self {
            task_id: Some(task_id.to_string()),
            question: Some(question.to_string()),
            file_name: None,
        }
    }

    /// Task id and question text, or None if the question cannot be processed.
    pub fn validated(&self) -> Option<(&str, &str)> {
        let task_id = self.task_id.as_deref().filter(|id| !id.is_empty())?;
        let question = self.question.as_deref()?;
        Some((task_id, question))
    }

    /// Extension of the attached file including the dot, if any.
    pub fn file_extension(&self) -> Option<String> {
        let name = self.file_name.as_deref().filter(|n| !n.is_empty())?;
        std::path::Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
    }
}

/// One submitted answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerRecord {
    pub task_id: String,
    pub submitted_answer: String,
}

/// Body of `POST /submit`.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionRequest<'a> {
    pub username: &'a str,
    pub agent_code: &'a str,
    pub answers: &'a [AnswerRecord],
}

/// Grading returned by `POST /submit`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SubmissionResult {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub correct_count: Option<u64>,
    #[serde(default)]
    pub total_attempted: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Operations offered by the scoring service.
#[async_trait]
pub trait ScoringApi: Send + Sync {
    /// Fetch every question.
    async fn get_questions(&self) -> Result<Vec<Question>>;

    /// Fetch a single random question.
    async fn get_random_question(&self) -> Result<Question>;

    /// Download the file attached to a task.
    async fn get_file(&self, task_id: &str) -> Result<Vec<u8>>;

    /// Submit all answers in one request.
    async fn submit_answers(
        &self,
        username: &str,
        agent_code: &str,
        answers: &[AnswerRecord],
    ) -> Result<SubmissionResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_validation() {
        assert_eq!(Question::new("t1", "q").validated(), Some(("t1", "q")));
        assert_eq!(Question::new("t1", "").validated(), Some(("t1", "")));
        assert_eq!(Question::new("", "q").validated(), None);

        let missing_text = Question {
            task_id: Some("t1".to_string()),
            ..Default::default()
        };
        assert_eq!(missing_text.validated(), None);
    }

    #[test]
    fn test_question_from_wire_ignores_unknown_fields() {
        let q: Question = serde_json::from_str(
            r#"{"task_id": "abc", "question": "How many?", "Level": "1", "file_name": "data.xlsx"}"#,
        )
        .unwrap();
        assert_eq!(q.validated(), Some(("abc", "How many?")));
        assert_eq!(q.file_extension().as_deref(), Some(".xlsx"));

        let q: Question = serde_json::from_str(r#"{"question": "orphan", "file_name": ""}"#).unwrap();
        assert!(q.validated().is_none());
        assert!(q.file_extension().is_none());
    }

    #[test]
    fn test_submission_request_shape() {
        let answers = vec![AnswerRecord {
            task_id: "t1".to_string(),
            submitted_answer: "Paris".to_string(),
        }];
        let body = serde_json::to_value(SubmissionRequest {
            username: "u",
            agent_code: "unknown",
            answers: &answers,
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "username": "u",
                "agent_code": "unknown",
                "answers": [{"task_id": "t1", "submitted_answer": "Paris"}]
            })
        );
    }
}
