//! HTTP quiz service implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::instrument;

use quizrun_core::error::ServiceError;
use quizrun_core::model::{QuizMeta, ScoredSubmission, StartedSession, SubmissionPayload};
use quizrun_core::traits::QuizService;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Quiz service reached over HTTP/JSON.
pub struct HttpQuizService {
    base_url: String,
    api_token: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpQuizService {
    pub fn new(base_url: &str, api_token: Option<String>) -> Result<Self, ServiceError> {
        Self::with_timeout(base_url, api_token, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(
        base_url: &str,
        api_token: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ServiceError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.filter(|t| !t.is_empty()),
            timeout_secs,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header("accept", "application/json");
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<T, ServiceError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ServiceError::Timeout(self.timeout_secs)
            } else {
                ServiceError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Unauthorized(error_message(&body)));
        }
        if status == 404 {
            return Err(ServiceError::NotFound(resource.to_string()));
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                status,
                message: error_message(&body),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ServiceError::InvalidResponse(format!("{resource}: {e}")))
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "detail", alias = "error")]
    message: String,
}

/// Pull a human-readable message out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[async_trait]
impl QuizService for HttpQuizService {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self))]
    async fn fetch_quiz_meta(&self, quiz_id: &str) -> Result<QuizMeta, ServiceError> {
        let request = self.request(Method::GET, &format!("/quizzes/{quiz_id}"));
        self.send(request, &format!("quiz {quiz_id}")).await
    }

    #[instrument(skip(self))]
    async fn start_session(&self, quiz_id: &str) -> Result<StartedSession, ServiceError> {
        let request = self.request(Method::POST, &format!("/quizzes/{quiz_id}/sessions"));
        self.send(request, &format!("quiz {quiz_id}")).await
    }

    #[instrument(skip(self, payload), fields(answers = payload.answers.len()))]
    async fn submit(
        &self,
        session_id: &str,
        payload: &SubmissionPayload,
    ) -> Result<ScoredSubmission, ServiceError> {
        let request = self
            .request(Method::POST, &format!("/sessions/{session_id}/submit"))
            .json(payload);
        self.send(request, &format!("session {session_id}")).await
    }
}
