//! quizrun-client: Quiz service backends.
//!
//! Implements the `QuizService` trait over HTTP and in memory, and loads the
//! client configuration that selects between them.

pub mod config;
pub mod http;
pub mod mock;

pub use config::{create_service, load_config, load_config_from, QuizrunConfig};
pub use http::HttpQuizService;
pub use mock::{MockQuiz, MockQuizService, SAMPLE_QUIZ_ID};
pub use quizrun_core::error::ServiceError;
