//! Score arithmetic and the per-question rows of the solutions view.

use crate::model::{AnswerRecord, Question, ScoredSubmission, TestResult};

/// Percentage of `correct` out of `total`, rounded half away from zero.
///
/// Returns 0 for an empty quiz.
pub fn percentage(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total) as f64;
    ((correct / total as f64) * 100.0).round() as u32
}

/// Merge the question list returned by the scoring service with the one the
/// session was started with.
///
/// The session order is authoritative. Returned questions replace session
/// questions by id (they carry the answer key and explanations); session
/// questions the service did not echo back are kept as they were.
pub fn merge_questions(session: &[Question], scored: &ScoredSubmission) -> Vec<Question> {
    session
        .iter()
        .map(|q| {
            scored
                .questions
                .iter()
                .find(|s| s.id == q.id)
                .cloned()
                .unwrap_or_else(|| q.clone())
        })
        .collect()
}

/// One row of the solutions view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionEntry<'a> {
    pub position: usize,
    pub question: &'a Question,
    pub selected: Option<usize>,
    pub correct: Option<usize>,
    pub is_correct: bool,
}

impl SolutionEntry<'_> {
    pub fn explanation(&self) -> &str {
        &self.question.explanation
    }
}

/// Build solution rows for every question, in order.
///
/// The service outcome wins when present. Otherwise the selection comes from
/// the submitted `answers`, correctness is derived from the answer key, and
/// unanswered questions count as incorrect.
pub fn solution_entries<'a>(
    questions: &'a [Question],
    result: &TestResult,
    answers: &[AnswerRecord],
) -> Vec<SolutionEntry<'a>> {
    questions
        .iter()
        .enumerate()
        .map(|(position, question)| {
            let outcome = result.outcome_for(&question.id);
            let selected = match outcome {
                Some(o) => o.selected_answer,
                None => answers
                    .iter()
                    .find(|a| a.question_id == question.id)
                    .and_then(|a| a.selected_answer),
            };
            let is_correct = match outcome {
                Some(o) => o.is_correct,
                None => selected.is_some() && selected == question.correct_answer,
            };
            SolutionEntry {
                position,
                question,
                selected,
                correct: question.correct_answer,
                is_correct,
            }
        })
        .collect()
}
