//! Core trait definitions for the quiz service and session observers.
//!
//! `QuizService` is implemented by the `quizrun-client` crate (HTTP and
//! mock backends). `SessionObserver` is implemented by presentation layers.

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::machine::Phase;
use crate::model::{QuizMeta, ScoredSubmission, StartedSession, SubmissionPayload};

// ---------------------------------------------------------------------------
// Quiz service trait
// ---------------------------------------------------------------------------

/// The external quiz/scoring service.
#[async_trait]
pub trait QuizService: Send + Sync {
    /// Human-readable backend name (e.g. "http").
    fn name(&self) -> &str;

    /// Fetch quiz metadata.
    async fn fetch_quiz_meta(&self, quiz_id: &str) -> Result<QuizMeta, ServiceError>;

    /// Begin a new attempt. The service chooses the question order.
    async fn start_session(&self, quiz_id: &str) -> Result<StartedSession, ServiceError>;

    /// Submit answers for scoring.
    async fn submit(
        &self,
        session_id: &str,
        payload: &SubmissionPayload,
    ) -> Result<ScoredSubmission, ServiceError>;
}

// ---------------------------------------------------------------------------
// Session observer trait
// ---------------------------------------------------------------------------

/// Presentation callbacks fired by the state machine.
pub trait SessionObserver: Send + Sync {
    fn on_tick(&self, remaining_secs: u32);
    fn on_expire(&self);
    fn on_phase_change(&self, from: Phase, to: Phase);
}

/// No-op observer.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_tick(&self, _: u32) {}
    fn on_expire(&self) {}
    fn on_phase_change(&self, _: Phase, _: Phase) {}
}
