//! quizrun-core: Timed quiz sessions, answer tracking and single submission.
//!
//! This crate defines the data model, the `QuizService` seam, and the
//! session state machine that the rest of quizrun builds on. It performs no
//! I/O of its own.

pub mod clock;
pub mod error;
pub mod initiator;
pub mod machine;
pub mod model;
pub mod score;
pub mod submission;
pub mod time;
pub mod tracker;
pub mod traits;

#[cfg(test)]
mod testing;

pub use error::{ServiceError, SessionError, SessionStartFailure, SubmissionFailure};
pub use machine::{Phase, SessionEvent, SessionState, SessionStateMachine, Transition};
