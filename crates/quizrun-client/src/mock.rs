//! Mock quiz service for testing and offline demos.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use quizrun_core::error::ServiceError;
use quizrun_core::model::{
    Question, QuestionOutcome, QuizMeta, ScoredSubmission, StartedSession, Submission,
    SubmissionPayload, TestResult,
};
use quizrun_core::score::percentage;
use quizrun_core::traits::QuizService;

/// Id of the quiz built by [`MockQuizService::sample`].
pub const SAMPLE_QUIZ_ID: &str = "rust-basics";

/// A quiz known to the mock service.
#[derive(Debug, Clone)]
pub struct MockQuiz {
    pub title: String,
    pub time_limit_minutes: u32,
    pub questions: Vec<Question>,
}

/// An in-memory quiz service.
///
/// Allocates a fresh UUID for every session, scores submissions against the
/// answer key, and rejects a second submission for the same session.
pub struct MockQuizService {
    quizzes: HashMap<String, MockQuiz>,
    latency: Option<Duration>,
    withhold_answer_key: bool,
    start_failures: Mutex<VecDeque<ServiceError>>,
    submit_failures: Mutex<VecDeque<ServiceError>>,
    sessions: Mutex<HashMap<String, String>>,
    submitted: Mutex<HashSet<String>>,
    submissions: Mutex<Vec<Submission>>,
    start_calls: AtomicU32,
    submit_calls: AtomicU32,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for MockQuizService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockQuizService {
    pub fn new() -> Self {
        Self {
            quizzes: HashMap::new(),
            latency: None,
            withhold_answer_key: false,
            start_failures: Mutex::new(VecDeque::new()),
            submit_failures: Mutex::new(VecDeque::new()),
            sessions: Mutex::new(HashMap::new()),
            submitted: Mutex::new(HashSet::new()),
            submissions: Mutex::new(Vec::new()),
            start_calls: AtomicU32::new(0),
            submit_calls: AtomicU32::new(0),
        }
    }

    /// A mock preloaded with a short Rust quiz under [`SAMPLE_QUIZ_ID`].
    pub fn sample() -> Self {
        Self::new().with_quiz(SAMPLE_QUIZ_ID, sample_quiz())
    }

    pub fn with_quiz(mut self, id: &str, quiz: MockQuiz) -> Self {
        self.quizzes.insert(id.to_string(), quiz);
        self
    }

    /// Delay every submission by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Strip correct answers from started sessions; they are only revealed
    /// in the scored response.
    pub fn with_withheld_answer_key(mut self, withhold: bool) -> Self {
        self.withhold_answer_key = withhold;
        self
    }

    pub fn fail_next_start(&self, error: ServiceError) {
        lock(&self.start_failures).push_back(error);
    }

    pub fn fail_next_submit(&self, error: ServiceError) {
        lock(&self.submit_failures).push_back(error);
    }

    pub fn start_calls(&self) -> u32 {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    /// Submissions that were accepted and scored.
    pub fn submissions(&self) -> Vec<Submission> {
        lock(&self.submissions).clone()
    }

    pub fn last_submission(&self) -> Option<Submission> {
        lock(&self.submissions).last().cloned()
    }

    fn quiz(&self, quiz_id: &str) -> Result<&MockQuiz, ServiceError> {
        self.quizzes
            .get(quiz_id)
            .ok_or_else(|| ServiceError::NotFound(format!("quiz {quiz_id}")))
    }
}

#[async_trait]
impl QuizService for MockQuizService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_quiz_meta(&self, quiz_id: &str) -> Result<QuizMeta, ServiceError> {
        let quiz = self.quiz(quiz_id)?;
        Ok(QuizMeta {
            id: quiz_id.to_string(),
            title: quiz.title.clone(),
        })
    }

    async fn start_session(&self, quiz_id: &str) -> Result<StartedSession, ServiceError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = lock(&self.start_failures).pop_front() {
            return Err(err);
        }
        let quiz = self.quiz(quiz_id)?;

        let session_id = Uuid::new_v4().to_string();
        lock(&self.sessions).insert(session_id.clone(), quiz_id.to_string());

        let questions = quiz
            .questions
            .iter()
            .cloned()
            .map(|mut q| {
                if self.withhold_answer_key {
                    q.correct_answer = None;
                }
                q
            })
            .collect();

        Ok(StartedSession {
            session_id,
            quiz_id: quiz_id.to_string(),
            questions,
            started_at: chrono::Utc::now(),
            time_limit_minutes: quiz.time_limit_minutes,
        })
    }

    async fn submit(
        &self,
        session_id: &str,
        payload: &SubmissionPayload,
    ) -> Result<ScoredSubmission, ServiceError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        match self.latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }
        if let Some(err) = lock(&self.submit_failures).pop_front() {
            return Err(err);
        }

        let quiz_id = lock(&self.sessions)
            .get(session_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("session {session_id}")))?;
        let quiz = self.quiz(&quiz_id)?;

        if !lock(&self.submitted).insert(session_id.to_string()) {
            return Err(ServiceError::Api {
                status: 409,
                message: format!("session {session_id} already submitted"),
            });
        }

        let results: Vec<QuestionOutcome> = payload
            .answers
            .iter()
            .map(|answer| {
                let key = quiz
                    .questions
                    .iter()
                    .find(|q| q.id == answer.question_id)
                    .and_then(|q| q.correct_answer);
                QuestionOutcome {
                    question_id: answer.question_id.clone(),
                    selected_answer: answer.selected_answer,
                    is_correct: answer.selected_answer.is_some() && answer.selected_answer == key,
                }
            })
            .collect();
        let correct = results.iter().filter(|r| r.is_correct).count() as u32;
        let total = quiz.questions.len() as u32;

        lock(&self.submissions).push(Submission {
            session_id: session_id.to_string(),
            payload: payload.clone(),
        });

        Ok(ScoredSubmission {
            result: TestResult {
                score: f64::from(percentage(correct, total)),
                correct_answers: correct,
                total_questions: total,
                results,
            },
            questions: quiz.questions.clone(),
        })
    }
}

fn question(id: &str, text: &str, options: &[&str], correct: usize, explanation: &str) -> Question {
    Question {
        id: id.to_string(),
        text: text.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        correct_answer: Some(correct),
        explanation: explanation.to_string(),
    }
}

fn sample_quiz() -> MockQuiz {
    MockQuiz {
        title: "Rust Basics".to_string(),
        time_limit_minutes: 5,
        questions: vec![
            question(
                "ownership-move",
                "What happens to a `String` after it is passed by value to a function?",
                &[
                    "It is copied",
                    "Ownership moves into the function",
                    "It becomes a reference",
                ],
                1,
                "`String` is not `Copy`, so passing it by value moves ownership.",
            ),
            question(
                "borrow-rules",
                "How many mutable references to a value may exist at once?",
                &["Any number", "Exactly one", "One per thread"],
                1,
                "The borrow checker allows one `&mut` or any number of `&`, never both.",
            ),
            question(
                "option-none",
                "Which expression produces an empty `Option<i32>`?",
                &["None", "Some(0)", "Option::default(0)"],
                0,
                "`None` is the absent variant; `Some(0)` holds a value.",
            ),
        ],
    }
}
