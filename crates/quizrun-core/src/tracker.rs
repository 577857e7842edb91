//! Answer tracking and question navigation.
//!
//! `AnswerTracker` is the mutable answering state for one session.
//! `ReviewCursor` is a separate, read-only navigator used after scoring so
//! that reviewing can never touch the answers.

use crate::model::{AnswerRecord, Question};

/// A position within `0..len`, clamped at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    position: usize,
    len: usize,
}

impl Cursor {
    fn new(len: usize) -> Self {
        Self { position: 0, len }
    }

    fn next(&mut self) -> bool {
        if self.position + 1 < self.len {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn previous(&mut self) -> bool {
        if self.position > 0 {
            self.position -= 1;
            true
        } else {
            false
        }
    }

    fn jump_to(&mut self, position: usize) -> bool {
        if position < self.len && position != self.position {
            self.position = position;
            true
        } else {
            false
        }
    }
}

/// In-memory answers for one session plus the answering cursor.
///
/// Every position `0..N` is represented; unanswered positions hold `None`.
#[derive(Debug, Clone)]
pub struct AnswerTracker {
    question_ids: Vec<String>,
    option_counts: Vec<usize>,
    selected: Vec<Option<usize>>,
    cursor: Cursor,
}

impl AnswerTracker {
    pub fn new(questions: &[Question]) -> Self {
        Self {
            question_ids: questions.iter().map(|q| q.id.clone()).collect(),
            option_counts: questions.iter().map(Question::option_count).collect(),
            selected: vec![None; questions.len()],
            cursor: Cursor::new(questions.len()),
        }
    }

    /// Record `option` for the question at `position`, overwriting any
    /// previous choice. Returns `false` (and changes nothing) when either
    /// index is out of range.
    pub fn set_answer(&mut self, position: usize, option: usize) -> bool {
        match self.option_counts.get(position) {
            Some(&count) if option < count => {
                self.selected[position] = Some(option);
                true
            }
            _ => false,
        }
    }

    /// Mark `position` unanswered again.
    pub fn clear_answer(&mut self, position: usize) -> bool {
        match self.selected.get_mut(position) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    pub fn answer(&self, position: usize) -> Option<usize> {
        self.selected.get(position).copied().flatten()
    }

    pub fn is_answered(&self, position: usize) -> bool {
        self.answer(position).is_some()
    }

    pub fn answered_count(&self) -> usize {
        self.selected.iter().filter(|s| s.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn current_position(&self) -> usize {
        self.cursor.position
    }

    /// Move forward; no-op on the last question.
    pub fn next(&mut self) -> bool {
        self.cursor.next()
    }

    /// Move back; no-op on the first question.
    pub fn previous(&mut self) -> bool {
        self.cursor.previous()
    }

    /// Jump to any valid position, answered or not.
    pub fn jump_to(&mut self, position: usize) -> bool {
        self.cursor.jump_to(position)
    }

    /// Full-length answer list in question order.
    pub fn to_submission_list(&self) -> Vec<AnswerRecord> {
        self.question_ids
            .iter()
            .zip(&self.selected)
            .map(|(id, selected)| AnswerRecord {
                question_id: id.clone(),
                selected_answer: *selected,
            })
            .collect()
    }
}

/// Read-only navigation over a scored question list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewCursor {
    cursor: Cursor,
}

impl ReviewCursor {
    pub fn new(len: usize) -> Self {
        Self {
            cursor: Cursor::new(len),
        }
    }

    pub fn position(&self) -> usize {
        self.cursor.position
    }

    pub fn next(&mut self) -> bool {
        self.cursor.next()
    }

    pub fn previous(&mut self) -> bool {
        self.cursor.previous()
    }

    pub fn jump_to(&mut self, position: usize) -> bool {
        self.cursor.jump_to(position)
    }
}
