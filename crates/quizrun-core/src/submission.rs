//! At-most-once submission of a session's answers.
//!
//! A `SubmissionCoordinator` is created per session. Its phase moves
//! `NotSubmitted → Submitting → Submitted` through an atomic
//! compare-and-swap, so a second `finish` racing the first (clock expiry
//! against a manual finish) is rejected instead of queued or duplicated.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tracing::{instrument, Instrument};

use crate::error::{ServiceError, SubmissionFailure};
use crate::model::{QuizSession, ScoredAttempt, Submission, SubmissionPayload};
use crate::score::merge_questions;
use crate::tracker::AnswerTracker;
use crate::traits::QuizService;

const NOT_SUBMITTED: u8 = 0;
const SUBMITTING: u8 = 1;
const SUBMITTED: u8 = 2;

/// Where a session is in its single submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPhase {
    NotSubmitted,
    Submitting,
    Submitted,
}

impl SubmissionPhase {
    fn from_raw(raw: u8) -> Self {
        match raw {
            NOT_SUBMITTED => SubmissionPhase::NotSubmitted,
            SUBMITTING => SubmissionPhase::Submitting,
            _ => SubmissionPhase::Submitted,
        }
    }
}

/// Result of a `finish` call that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum FinishOutcome {
    /// The submission was accepted and scored.
    Scored(ScoredAttempt),
    /// Another submission is in flight or already done; nothing was sent.
    Rejected(SubmissionPhase),
}

/// Guards and performs the single submission of one session.
pub struct SubmissionCoordinator {
    service: Arc<dyn QuizService>,
    session_id: String,
    phase: Arc<AtomicU8>,
}

impl SubmissionCoordinator {
    pub fn new(service: Arc<dyn QuizService>, session_id: impl Into<String>) -> Self {
        Self {
            service,
            session_id: session_id.into(),
            phase: Arc::new(AtomicU8::new(NOT_SUBMITTED)),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn phase(&self) -> SubmissionPhase {
        SubmissionPhase::from_raw(self.phase.load(Ordering::Acquire))
    }

    /// Build the submission record. Unanswered positions are sent as `None`.
    pub fn build_submission(
        session: &QuizSession,
        answers: &AnswerTracker,
        elapsed_secs: u64,
    ) -> Submission {
        Submission {
            session_id: session.session_id().to_string(),
            payload: SubmissionPayload {
                answers: answers.to_submission_list(),
                time_taken_seconds: elapsed_secs,
            },
        }
    }

    /// Submit the session's answers once.
    ///
    /// The guard is taken before the service call starts. On failure it is
    /// released so the same answers can be submitted again; on success the
    /// session can never be submitted again.
    ///
    /// The service call runs on its own task. Dropping the returned future
    /// does not cancel an in-flight request: it still completes and settles
    /// the guard, and its result is discarded.
    #[instrument(skip_all, fields(session_id = %self.session_id, elapsed_secs = elapsed_secs))]
    pub async fn finish(
        &self,
        session: &QuizSession,
        answers: &AnswerTracker,
        elapsed_secs: u64,
    ) -> Result<FinishOutcome, SubmissionFailure> {
        debug_assert_eq!(session.session_id(), self.session_id);

        if let Err(current) = self.phase.compare_exchange(
            NOT_SUBMITTED,
            SUBMITTING,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            let phase = SubmissionPhase::from_raw(current);
            tracing::debug!(?phase, "finish ignored");
            return Ok(FinishOutcome::Rejected(phase));
        }

        let Submission {
            session_id,
            payload,
        } = Self::build_submission(session, answers, elapsed_secs);
        let answered = payload
            .answers
            .iter()
            .filter(|a| a.selected_answer.is_some())
            .count();
        tracing::info!(
            answered,
            total = payload.answers.len(),
            "submitting answers"
        );

        let sent_answers = payload.answers.clone();
        let service = Arc::clone(&self.service);
        let phase = Arc::clone(&self.phase);
        let request = tokio::spawn(
            async move {
                let response = service.submit(&session_id, &payload).await;
                let settled = if response.is_ok() {
                    SUBMITTED
                } else {
                    NOT_SUBMITTED
                };
                phase.store(settled, Ordering::Release);
                response
            }
            .in_current_span(),
        );

        let response = match request.await {
            Ok(response) => response,
            Err(e) => {
                self.phase.store(NOT_SUBMITTED, Ordering::Release);
                Err(ServiceError::Network(format!("submission task failed: {e}")))
            }
        };

        match response {
            Ok(scored) => {
                if scored.result.total_questions as usize != session.question_count() {
                    tracing::warn!(
                        reported = scored.result.total_questions,
                        expected = session.question_count(),
                        "scored total differs from session question count"
                    );
                }
                let questions = merge_questions(session.questions(), &scored);
                tracing::info!(
                    score = scored.result.rounded_score(),
                    correct = scored.result.correct_answers,
                    "submission scored"
                );
                Ok(FinishOutcome::Scored(ScoredAttempt {
                    result: scored.result,
                    questions,
                    answers: sent_answers,
                }))
            }
            Err(e) => {
                tracing::warn!("submission failed: {e}");
                Err(e.into())
            }
        }
    }
}
