//! Scripted quiz service used by the unit tests in this crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ServiceError;
use crate::model::{
    Question, QuestionOutcome, QuizMeta, ScoredSubmission, StartedSession, Submission,
    SubmissionPayload, TestResult,
};
use crate::traits::QuizService;

/// Fixed start timestamp for scripted sessions.
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
}

/// A quiz with `n` two-option questions whose correct answer is always option 0.
pub fn sample_quiz(quiz_id: &str, n: usize, minutes: u32) -> StartedSession {
    StartedSession {
        session_id: String::new(),
        quiz_id: quiz_id.into(),
        questions: (0..n)
            .map(|i| Question {
                id: format!("q{i}"),
                text: format!("Question {i}"),
                options: vec!["right".into(), "wrong".into()],
                correct_answer: Some(0),
                explanation: format!("Option 0 is right for q{i}"),
            })
            .collect(),
        started_at: fixed_now(),
        time_limit_minutes: minutes,
    }
}

pub struct ScriptedService {
    template: StartedSession,
    report_outcomes: bool,
    meta_failure: Mutex<Option<ServiceError>>,
    start_failures: Mutex<VecDeque<ServiceError>>,
    submit_failures: Mutex<VecDeque<ServiceError>>,
    start_calls: AtomicU32,
    submit_calls: AtomicU32,
    submissions: Mutex<Vec<Submission>>,
}

impl ScriptedService {
    pub fn new(template: StartedSession) -> Self {
        Self {
            template,
            report_outcomes: true,
            meta_failure: Mutex::new(None),
            start_failures: Mutex::new(VecDeque::new()),
            submit_failures: Mutex::new(VecDeque::new()),
            start_calls: AtomicU32::new(0),
            submit_calls: AtomicU32::new(0),
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// Score submissions without a per-question `results` list.
    pub fn without_outcomes(mut self) -> Self {
        self.report_outcomes = false;
        self
    }

    pub fn fail_meta(&self, error: ServiceError) {
        *self.meta_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_next_start(&self, error: ServiceError) {
        self.start_failures.lock().unwrap().push_back(error);
    }

    pub fn fail_next_submit(&self, error: ServiceError) {
        self.submit_failures.lock().unwrap().push_back(error);
    }

    pub fn start_calls(&self) -> u32 {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuizService for ScriptedService {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_quiz_meta(&self, _quiz_id: &str) -> Result<QuizMeta, ServiceError> {
        if let Some(err) = self.meta_failure.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(QuizMeta {
            id: self.template.quiz_id.clone(),
            title: format!("Sample quiz {}", self.template.quiz_id),
        })
    }

    async fn start_session(&self, _quiz_id: &str) -> Result<StartedSession, ServiceError> {
        let n = self.start_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(err) = self.start_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(StartedSession {
            session_id: format!("session-{n}"),
            ..self.template.clone()
        })
    }

    async fn submit(
        &self,
        session_id: &str,
        payload: &SubmissionPayload,
    ) -> Result<ScoredSubmission, ServiceError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        // Suspend once so concurrent callers interleave.
        tokio::task::yield_now().await;
        if let Some(err) = self.submit_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.submissions.lock().unwrap().push(Submission {
            session_id: session_id.to_string(),
            payload: payload.clone(),
        });

        let results: Vec<QuestionOutcome> = payload
            .answers
            .iter()
            .map(|a| QuestionOutcome {
                question_id: a.question_id.clone(),
                selected_answer: a.selected_answer,
                is_correct: a.selected_answer == Some(0),
            })
            .collect();
        let correct = results.iter().filter(|r| r.is_correct).count() as u32;
        let total = results.len() as u32;
        Ok(ScoredSubmission {
            result: TestResult {
                score: crate::score::percentage(correct, total) as f64,
                correct_answers: correct,
                total_questions: total,
                results: if self.report_outcomes { results } else { Vec::new() },
            },
            questions: self.template.questions.clone(),
        })
    }
}
