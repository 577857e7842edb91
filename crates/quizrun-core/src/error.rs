//! Error types for quiz service calls and session transitions.
//!
//! `ServiceError` is defined here rather than in `quizrun-client` so the
//! session layer can classify failures without string matching.

use thiserror::Error;

/// Errors that can occur when talking to the quiz service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Missing or rejected credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The quiz or session does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The service returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ServiceError {
    /// Returns `true` if retrying the same request cannot succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ServiceError::Unauthorized(_) | ServiceError::NotFound(_)
        )
    }
}

/// A new attempt could not be started. No session state was created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionStartFailure {
    #[error("failed to start session: {0}")]
    Service(#[from] ServiceError),

    #[error("quiz '{0}' has no questions")]
    EmptyQuiz(String),

    #[error("quiz '{0}' has no time limit")]
    InvalidTimeLimit(String),

    #[error("service started a session for quiz '{actual}', expected '{expected}'")]
    QuizMismatch { expected: String, actual: String },
}

/// A submission was not accepted. Answers and elapsed time are preserved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionFailure {
    #[error("failed to submit answers: {0}")]
    Service(#[from] ServiceError),
}

impl SubmissionFailure {
    pub fn service_error(&self) -> &ServiceError {
        match self {
            SubmissionFailure::Service(e) => e,
        }
    }
}

/// Errors surfaced by the session state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Start(#[from] SessionStartFailure),

    #[error(transparent)]
    Submission(#[from] SubmissionFailure),
}
