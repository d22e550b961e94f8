use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;

use super::models::{
    AttemptEligibility, AttemptSummary, Question, Quiz, QuizSummary, SubmissionRequest,
    SubmissionResult,
};

/// Errors crossing the client boundary. Transport and parsing failures are
/// mapped here; the session state machine never sees a raw reqwest error.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Could not reach the server, or it answered 5xx. Transient.
    Network(String),
    /// The server understood and refused (4xx), e.g. the attempt quota was
    /// consumed by another tab. Retrying the same request will not help.
    Validation(String),
    /// The response body did not match the expected shape.
    Decode(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "network error: {msg}"),
            ApiError::Validation(msg) => write!(f, "request rejected: {msg}"),
            ApiError::Decode(msg) => write!(f, "bad response: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// The learning-platform endpoints the attempt core consumes (quiz metadata,
/// questions, eligibility, submission/scoring). Behind a trait so the backend
/// tests run against an in-memory fake.
#[async_trait]
pub trait LearningApi: Send + Sync {
    async fn list_quizzes(&self, learner_id: &str) -> Result<Vec<QuizSummary>, ApiError>;
    async fn get_quiz(&self, quiz_id: &str) -> Result<Quiz, ApiError>;
    async fn get_questions(&self, quiz_id: &str) -> Result<Vec<Question>, ApiError>;
    async fn check_eligibility(
        &self,
        quiz_id: &str,
        learner_id: &str,
    ) -> Result<AttemptEligibility, ApiError>;
    async fn latest_attempt(
        &self,
        quiz_id: &str,
        learner_id: &str,
    ) -> Result<Option<AttemptSummary>, ApiError>;
    async fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionResult, ApiError>;
    async fn submission_result(&self, submission_id: &str) -> Result<SubmissionResult, ApiError>;
}

/// reqwest implementation speaking JSON to the platform API.
pub struct RestApi {
    client: reqwest::Client,
    base_url: String,
}

impl RestApi {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.client.get(self.url(path)).send().await?;
        decode(response).await
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Status classification per the error taxonomy: 4xx is a validation
/// rejection, 5xx a transient network-class failure. The server wraps its
/// message as `{"error": "..."}`; fall back to the raw body otherwise.
fn classify_status(status: u16, body: &str) -> Option<ApiError> {
    if (400..500).contains(&status) {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| body.to_string());
        Some(ApiError::Validation(format!("{status}: {message}")))
    } else if status >= 500 {
        Some(ApiError::Network(format!("server error {status}")))
    } else {
        None
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status().as_u16();
    if status >= 400 {
        let body = response.text().await.unwrap_or_default();
        // classify_status always returns Some for >= 400
        return Err(classify_status(status, &body)
            .unwrap_or_else(|| ApiError::Network(format!("status {status}"))));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl LearningApi for RestApi {
    async fn list_quizzes(&self, learner_id: &str) -> Result<Vec<QuizSummary>, ApiError> {
        self.get_json(&format!("/api/quizzes?learnerId={learner_id}"))
            .await
    }

    async fn get_quiz(&self, quiz_id: &str) -> Result<Quiz, ApiError> {
        self.get_json(&format!("/api/quizzes/{quiz_id}")).await
    }

    async fn get_questions(&self, quiz_id: &str) -> Result<Vec<Question>, ApiError> {
        self.get_json(&format!("/api/quizzes/{quiz_id}/questions"))
            .await
    }

    async fn check_eligibility(
        &self,
        quiz_id: &str,
        learner_id: &str,
    ) -> Result<AttemptEligibility, ApiError> {
        self.get_json(&format!(
            "/api/quizzes/{quiz_id}/eligibility?learnerId={learner_id}"
        ))
        .await
    }

    async fn latest_attempt(
        &self,
        quiz_id: &str,
        learner_id: &str,
    ) -> Result<Option<AttemptSummary>, ApiError> {
        let path = format!("/api/quizzes/{quiz_id}/attempts/latest?learnerId={learner_id}");
        let response = self.client.get(self.url(&path)).send().await?;
        // A learner with no prior attempt is a 404 here, not an error.
        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        decode(response).await.map(Some)
    }

    async fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionResult, ApiError> {
        let response = self
            .client
            .post(self.url("/api/submissions"))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    async fn submission_result(&self, submission_id: &str) -> Result<SubmissionResult, ApiError> {
        self.get_json(&format!("/api/submissions/{submission_id}"))
            .await
    }
}
