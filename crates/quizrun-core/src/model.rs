//! Core data model types for quizrun.
//!
//! These are the values exchanged with the quiz service and held by the
//! session state machine: questions, sessions, submissions and results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single multiple-choice question. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Unique identifier for this question.
    pub id: String,
    /// The prompt shown to the user.
    pub text: String,
    /// Ordered option strings.
    pub options: Vec<String>,
    /// Index of the correct option. A service may withhold it until scoring.
    #[serde(default, alias = "correct_answer")]
    pub correct_answer: Option<usize>,
    /// Explanation shown in the solutions view.
    #[serde(default)]
    pub explanation: String,
}

impl Question {
    /// Number of selectable options.
    pub fn option_count(&self) -> usize {
        self.options.len()
    }
}

/// Quiz metadata returned by `fetch_quiz_meta`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizMeta {
    pub id: String,
    pub title: String,
}

/// Raw payload returned by `start_session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedSession {
    pub session_id: String,
    pub quiz_id: String,
    pub questions: Vec<Question>,
    pub started_at: DateTime<Utc>,
    pub time_limit_minutes: u32,
}

/// One timed attempt at a quiz.
///
/// The question order is fixed for the lifetime of the attempt; there is no
/// way to reorder or replace questions after construction.
#[derive(Debug, Clone)]
pub struct QuizSession {
    session_id: String,
    quiz_id: String,
    title: String,
    questions: Vec<Question>,
    started_at: DateTime<Utc>,
    time_budget_secs: u32,
}

impl QuizSession {
    pub fn new(meta: QuizMeta, started: StartedSession) -> Self {
        Self {
            session_id: started.session_id,
            quiz_id: started.quiz_id,
            title: meta.title,
            questions: started.questions,
            started_at: started.started_at,
            time_budget_secs: started.time_limit_minutes.saturating_mul(60),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn quiz_id(&self) -> &str {
        &self.quiz_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn question(&self, position: usize) -> Option<&Question> {
        self.questions.get(position)
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Server-reported start timestamp.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Time budget in seconds, converted from the service's minutes.
    pub fn time_budget_secs(&self) -> u32 {
        self.time_budget_secs
    }
}

/// The answer for one question, `None` meaning unanswered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question_id: String,
    pub selected_answer: Option<usize>,
}

/// Body of the `submit` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    /// One record per question, in session order.
    pub answers: Vec<AnswerRecord>,
    /// Wall-clock seconds since the session started.
    pub time_taken_seconds: u64,
}

/// A complete submission for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub session_id: String,
    pub payload: SubmissionPayload,
}

/// Per-question outcome reported by the scoring service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: String,
    #[serde(default)]
    pub selected_answer: Option<usize>,
    pub is_correct: bool,
}

/// Scored result of a submission. Immutable after receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Overall percentage as reported by the service.
    #[serde(default)]
    pub score: f64,
    pub correct_answers: u32,
    pub total_questions: u32,
    #[serde(default)]
    pub results: Vec<QuestionOutcome>,
}

impl TestResult {
    /// Percentage score derived from the counts, rounded to the nearest integer.
    pub fn rounded_score(&self) -> u32 {
        crate::score::percentage(self.correct_answers, self.total_questions)
    }

    /// Outcome for a given question, if the service reported one.
    pub fn outcome_for(&self, question_id: &str) -> Option<&QuestionOutcome> {
        self.results.iter().find(|o| o.question_id == question_id)
    }
}

/// Response of the `submit` call: the result plus the question list with
/// correct answers and explanations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSubmission {
    #[serde(flatten)]
    pub result: TestResult,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// A scored attempt ready for the review screens.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredAttempt {
    pub result: TestResult,
    /// Questions merged from the service response, in session order.
    pub questions: Vec<Question>,
    /// The answers that were submitted, in session order.
    pub answers: Vec<AnswerRecord>,
}
