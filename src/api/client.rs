//! HTTP client for the scoring API.

use super::{AnswerRecord, Question, ScoringApi, SubmissionRequest, SubmissionResult};
use crate::config::ApiSettings;
use crate::error::{GaiaError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Client for the GAIA scoring service.
///
/// Every call is a single request; non-2xx responses become errors and are
/// never retried.
pub struct GaiaApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl GaiaApiClient {
    /// Create a client for the given base URL.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GaiaError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from API settings.
    pub fn from_settings(settings: &ApiSettings) -> Result<Self> {
        if settings.base_url.is_empty() {
            return Err(GaiaError::Config("api.base_url is empty".to_string()));
        }
        Self::new(&settings.base_url, Duration::from_secs(settings.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl ScoringApi for GaiaApiClient {
    #[instrument(skip(self))]
    async fn get_questions(&self) -> Result<Vec<Question>> {
        let questions: Vec<Question> = self
            .http
            .get(self.url("questions"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!("Received {} questions", questions.len());
        Ok(questions)
    }

    #[instrument(skip(self))]
    async fn get_random_question(&self) -> Result<Question> {
        let question = self
            .http
            .get(self.url("random-question"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(question)
    }

    #[instrument(skip(self))]
    async fn get_file(&self, task_id: &str) -> Result<Vec<u8>> {
        let bytes = self
            .http
            .get(self.url(&format!("files/{}", task_id)))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }

    #[instrument(skip(self, answers), fields(count = answers.len()))]
    async fn submit_answers(
        &self,
        username: &str,
        agent_code: &str,
        answers: &[AnswerRecord],
    ) -> Result<SubmissionResult> {
        let body = SubmissionRequest {
            username,
            agent_code,
            answers,
        };

        let result = self
            .http
            .post(self.url("submit"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> GaiaApiClient {
        GaiaApiClient::new(&server.url(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_get_questions() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/questions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"task_id": "t1", "question": "What is 2+2?", "Level": "1", "file_name": ""},
                    {"task_id": "t2", "question": "Read the sheet.", "file_name": "sales.xlsx"}
                ]"#,
            )
            .create_async()
            .await;

        let questions = client_for(&server).get_questions().await.unwrap();

        mock.assert_async().await;
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].validated(), Some(("t1", "What is 2+2?")));
        assert_eq!(questions[1].file_name.as_deref(), Some("sales.xlsx"));
    }

    #[tokio::test]
    async fn test_get_questions_propagates_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/questions")
            .with_status(503)
            .create_async()
            .await;

        let err = client_for(&server).get_questions().await.unwrap_err();
        assert!(matches!(err, GaiaError::Http(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_get_random_question() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/random-question")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"task_id": "r1", "question": "Random?"}"#)
            .create_async()
            .await;

        let question = client_for(&server).get_random_question().await.unwrap();
        assert_eq!(question.validated(), Some(("r1", "Random?")));
    }

    #[tokio::test]
    async fn test_get_file_returns_raw_bytes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/files/t9")
            .with_status(200)
            .with_body(vec![0u8, 159, 146, 150])
            .create_async()
            .await;

        let bytes = client_for(&server).get_file("t9").await.unwrap();
        assert_eq!(bytes, vec![0u8, 159, 146, 150]);
    }

    #[tokio::test]
    async fn test_get_file_not_found_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/files/missing")
            .with_status(404)
            .with_body(r#"{"detail": "No file path associated with task_id missing."}"#)
            .create_async()
            .await;

        assert!(client_for(&server).get_file("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_submit_answers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/submit")
            .match_body(Matcher::Json(serde_json::json!({
                "username": "u",
                "agent_code": "https://huggingface.co/spaces/u/agent/tree/main",
                "answers": [
                    {"task_id": "t1", "submitted_answer": "4"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"username": "u", "score": 80, "correct_count": 4, "total_attempted": 5, "message": "ok"}"#,
            )
            .create_async()
            .await;

        let answers = vec![AnswerRecord {
            task_id: "t1".to_string(),
            submitted_answer: "4".to_string(),
        }];
        let result = client_for(&server)
            .submit_answers("u", "https://huggingface.co/spaces/u/agent/tree/main", &answers)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.username.as_deref(), Some("u"));
        assert_eq!(result.score, Some(80.0));
        assert_eq!(result.correct_count, Some(4));
        assert_eq!(result.total_attempted, Some(5));
        assert_eq!(result.message.as_deref(), Some("ok"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = GaiaApiClient::new("http://localhost:9000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url("questions"), "http://localhost:9000/questions");
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let settings = ApiSettings {
            base_url: String::new(),
            timeout_secs: 1,
        };
        assert!(matches!(
            GaiaApiClient::from_settings(&settings),
            Err(GaiaError::Config(_))
        ));
    }
}
