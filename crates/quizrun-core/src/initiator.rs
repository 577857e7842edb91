//! Starting a new quiz attempt.

use std::sync::Arc;

use tracing::instrument;

use crate::error::SessionStartFailure;
use crate::model::QuizSession;
use crate::traits::QuizService;

/// Fetches quiz metadata and begins a new attempt.
#[derive(Clone)]
pub struct SessionInitiator {
    service: Arc<dyn QuizService>,
}

impl SessionInitiator {
    pub fn new(service: Arc<dyn QuizService>) -> Self {
        Self { service }
    }

    /// Read quiz metadata, then ask the service for a fresh session.
    ///
    /// Nothing is returned on failure, so the caller stays in its pre-quiz
    /// state and may simply call `start` again.
    #[instrument(skip(self), fields(service = %self.service.name()))]
    pub async fn start(&self, quiz_id: &str) -> Result<QuizSession, SessionStartFailure> {
        let meta = self.service.fetch_quiz_meta(quiz_id).await?;
        let started = self.service.start_session(quiz_id).await?;

        if started.quiz_id != quiz_id {
            return Err(SessionStartFailure::QuizMismatch {
                expected: quiz_id.to_string(),
                actual: started.quiz_id,
            });
        }
        if started.questions.is_empty() {
            return Err(SessionStartFailure::EmptyQuiz(quiz_id.to_string()));
        }
        if started.time_limit_minutes == 0 {
            return Err(SessionStartFailure::InvalidTimeLimit(quiz_id.to_string()));
        }

        let session = QuizSession::new(meta, started);
        tracing::info!(
            session_id = session.session_id(),
            questions = session.question_count(),
            time_budget_secs = session.time_budget_secs(),
            "session started"
        );
        Ok(session)
    }
}
