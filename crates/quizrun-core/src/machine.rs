//! Session state machine.
//!
//! All user actions, clock pulses and network outcomes are funneled through
//! [`SessionStateMachine::dispatch`], one event at a time. The machine owns
//! the countdown while answering, hands the answers to a per-session
//! [`SubmissionCoordinator`] on finish, and keeps a read-only review cursor
//! once results arrive.
//!
//! ```text
//! Idle → Loading → Answering → Submitting → Results ⇄ Solutions
//!          ↑           ↑____________|  (failure)   |        |
//!          |_______________ Retry _________________|________|
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::{ClockSignal, Countdown, TickSource};
use crate::error::SessionError;
use crate::initiator::SessionInitiator;
use crate::model::{Question, QuizSession, ScoredAttempt, TestResult};
use crate::score::{solution_entries, SolutionEntry};
use crate::submission::{FinishOutcome, SubmissionCoordinator, SubmissionPhase};
use crate::time::{elapsed_secs, SystemClock, WallClock};
use crate::tracker::{AnswerTracker, ReviewCursor};
use crate::traits::{NoopObserver, QuizService, SessionObserver};

/// Seconds of disagreement between countdown and wall clock worth logging.
const CLOCK_DRIFT_LOG_SECS: u64 = 2;

/// Coarse state exposed to presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    Loading,
    Answering,
    Submitting,
    Results,
    Solutions,
    Exited,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Loading => write!(f, "loading"),
            Phase::Answering => write!(f, "answering"),
            Phase::Submitting => write!(f, "submitting"),
            Phase::Results => write!(f, "results"),
            Phase::Solutions => write!(f, "solutions"),
            Phase::Exited => write!(f, "exited"),
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Start { quiz_id: String },
    SetAnswer { position: usize, option: usize },
    ClearAnswer { position: usize },
    Next,
    Previous,
    JumpTo(usize),
    /// One second elapsed.
    Tick,
    Finish,
    ViewSolutions,
    ViewResults,
    Retry,
    Exit,
}

/// What an event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Not applicable in the current state, or a no-op.
    Ignored,
    /// Same phase, data changed.
    Updated,
    /// Moved to a new phase.
    Entered(Phase),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FinishTrigger {
    User,
    ClockExpired,
}

/// An attempt in progress.
pub struct Attempt {
    session: QuizSession,
    tracker: AnswerTracker,
    countdown: Countdown,
    coordinator: Arc<SubmissionCoordinator>,
    started: DateTime<Utc>,
}

impl Attempt {
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    pub fn tracker(&self) -> &AnswerTracker {
        &self.tracker
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn submission_phase(&self) -> SubmissionPhase {
        self.coordinator.phase()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.session.question(self.tracker.current_position())
    }
}

/// A scored attempt under review.
#[derive(Debug, Clone)]
pub struct Review {
    session_id: String,
    quiz_id: String,
    title: String,
    scored: ScoredAttempt,
    cursor: ReviewCursor,
}

impl Review {
    fn new(session: QuizSession, scored: ScoredAttempt) -> Self {
        let cursor = ReviewCursor::new(scored.questions.len());
        Self {
            session_id: session.session_id().to_string(),
            quiz_id: session.quiz_id().to_string(),
            title: session.title().to_string(),
            scored,
            cursor,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn quiz_id(&self) -> &str {
        &self.quiz_id
    }

    pub fn result(&self) -> &TestResult {
        &self.scored.result
    }

    pub fn questions(&self) -> &[Question] {
        &self.scored.questions
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.scored.questions.get(self.cursor.position())
    }

    pub fn solution_entries(&self) -> Vec<SolutionEntry<'_>> {
        solution_entries(
            &self.scored.questions,
            &self.scored.result,
            &self.scored.answers,
        )
    }
}

/// Full machine state. Each variant owns exactly the data valid in it.
#[derive(Default)]
pub enum SessionState {
    /// Before the first start, or after a failed start.
    #[default]
    Idle,
    Loading {
        quiz_id: String,
    },
    Answering(Attempt),
    Submitting(Attempt),
    Results(Review),
    Solutions(Review),
    Exited,
}

impl SessionState {
    pub fn phase(&self) -> Phase {
        match self {
            SessionState::Idle => Phase::Idle,
            SessionState::Loading { .. } => Phase::Loading,
            SessionState::Answering(_) => Phase::Answering,
            SessionState::Submitting(_) => Phase::Submitting,
            SessionState::Results(_) => Phase::Results,
            SessionState::Solutions(_) => Phase::Solutions,
            SessionState::Exited => Phase::Exited,
        }
    }
}

/// Drives one user through timed quiz attempts.
pub struct SessionStateMachine {
    initiator: SessionInitiator,
    service: Arc<dyn QuizService>,
    ticks: Box<dyn TickSource>,
    wall_clock: Arc<dyn WallClock>,
    observer: Arc<dyn SessionObserver>,
    state: SessionState,
    last_error: Option<SessionError>,
}

impl SessionStateMachine {
    pub fn new(service: Arc<dyn QuizService>, ticks: Box<dyn TickSource>) -> Self {
        Self {
            initiator: SessionInitiator::new(Arc::clone(&service)),
            service,
            ticks,
            wall_clock: Arc::new(SystemClock),
            observer: Arc::new(NoopObserver),
            state: SessionState::Idle,
            last_error: None,
        }
    }

    pub fn with_wall_clock(mut self, wall_clock: Arc<dyn WallClock>) -> Self {
        self.wall_clock = wall_clock;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    // -- read-only surface ------------------------------------------------

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn attempt(&self) -> Option<&Attempt> {
        match &self.state {
            SessionState::Answering(a) | SessionState::Submitting(a) => Some(a),
            _ => None,
        }
    }

    pub fn review(&self) -> Option<&Review> {
        match &self.state {
            SessionState::Results(r) | SessionState::Solutions(r) => Some(r),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&TestResult> {
        self.review().map(Review::result)
    }

    pub fn quiz_title(&self) -> Option<&str> {
        match &self.state {
            SessionState::Answering(a) | SessionState::Submitting(a) => Some(a.session.title()),
            SessionState::Results(r) | SessionState::Solutions(r) => Some(&r.title),
            _ => None,
        }
    }

    /// Remaining countdown seconds while an attempt is in progress.
    pub fn remaining_seconds(&self) -> Option<u32> {
        self.attempt().map(|a| a.countdown.remaining())
    }

    /// The answering cursor, or the review cursor after scoring.
    pub fn cursor(&self) -> Option<usize> {
        match &self.state {
            SessionState::Answering(a) | SessionState::Submitting(a) => {
                Some(a.tracker.current_position())
            }
            SessionState::Results(r) | SessionState::Solutions(r) => Some(r.position()),
            _ => None,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        match &self.state {
            SessionState::Answering(a) | SessionState::Submitting(a) => a.current_question(),
            SessionState::Results(r) | SessionState::Solutions(r) => r.current_question(),
            _ => None,
        }
    }

    pub fn solution_entries(&self) -> Vec<SolutionEntry<'_>> {
        self.review()
            .map(Review::solution_entries)
            .unwrap_or_default()
    }

    /// The most recent start or submission failure, cleared on the next
    /// successful transition out of it.
    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    fn clock_running(&self) -> bool {
        matches!(&self.state, SessionState::Answering(a) if a.countdown.is_running())
    }

    // -- event dispatch ---------------------------------------------------

    /// Process one event.
    pub async fn dispatch(&mut self, event: SessionEvent) -> Result<Transition, SessionError> {
        match event {
            SessionEvent::Start { quiz_id } => self.begin(quiz_id).await,
            SessionEvent::SetAnswer { position, option } => {
                Ok(self.mutate_answers(|t| t.set_answer(position, option)))
            }
            SessionEvent::ClearAnswer { position } => {
                Ok(self.mutate_answers(|t| t.clear_answer(position)))
            }
            SessionEvent::Next => Ok(self.navigate(AnswerTracker::next, ReviewCursor::next)),
            SessionEvent::Previous => {
                Ok(self.navigate(AnswerTracker::previous, ReviewCursor::previous))
            }
            SessionEvent::JumpTo(position) => Ok(self.navigate(
                |t| t.jump_to(position),
                |c| c.jump_to(position),
            )),
            SessionEvent::Tick => self.on_tick().await,
            SessionEvent::Finish => self.finish_attempt(FinishTrigger::User).await,
            SessionEvent::ViewSolutions => Ok(self.switch_review(Phase::Solutions)),
            SessionEvent::ViewResults => Ok(self.switch_review(Phase::Results)),
            SessionEvent::Retry => self.retry_quiz().await,
            SessionEvent::Exit => Ok(self.exit_review()),
        }
    }

    /// Wait for the next clock pulse without processing it.
    ///
    /// Pends forever while no countdown is running. Cancel-safe, so it can
    /// sit in a `select!` next to user input; dispatch [`SessionEvent::Tick`]
    /// once it resolves.
    pub async fn wait_for_tick(&mut self) {
        if !self.clock_running() {
            std::future::pending::<()>().await;
        }
        self.ticks.tick().await;
    }

    /// Wait for the next clock pulse and process it.
    pub async fn next_tick(&mut self) -> Result<Transition, SessionError> {
        self.wait_for_tick().await;
        self.dispatch(SessionEvent::Tick).await
    }

    pub async fn start(&mut self, quiz_id: &str) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::Start {
            quiz_id: quiz_id.to_string(),
        })
        .await
    }

    pub async fn set_answer(
        &mut self,
        position: usize,
        option: usize,
    ) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::SetAnswer { position, option })
            .await
    }

    pub async fn clear_answer(&mut self, position: usize) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::ClearAnswer { position }).await
    }

    pub async fn next(&mut self) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::Next).await
    }

    pub async fn previous(&mut self) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::Previous).await
    }

    pub async fn jump_to(&mut self, position: usize) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::JumpTo(position)).await
    }

    pub async fn tick(&mut self) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::Tick).await
    }

    pub async fn finish(&mut self) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::Finish).await
    }

    pub async fn view_solutions(&mut self) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::ViewSolutions).await
    }

    pub async fn view_results(&mut self) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::ViewResults).await
    }

    pub async fn retry(&mut self) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::Retry).await
    }

    pub async fn exit(&mut self) -> Result<Transition, SessionError> {
        self.dispatch(SessionEvent::Exit).await
    }

    // -- transitions ------------------------------------------------------

    fn enter(&mut self, next: SessionState) {
        let from = self.state.phase();
        self.state = next;
        self.announce(from);
    }

    fn announce(&self, from: Phase) {
        let to = self.state.phase();
        if from != to {
            tracing::info!(%from, %to, "session phase changed");
            self.observer.on_phase_change(from, to);
        }
    }

    fn ignored(&self, what: &str) -> Transition {
        tracing::debug!(phase = %self.state.phase(), "{what} ignored");
        Transition::Ignored
    }

    async fn begin(&mut self, quiz_id: String) -> Result<Transition, SessionError> {
        if !matches!(self.state, SessionState::Idle) {
            return Ok(self.ignored("start"));
        }
        self.load(quiz_id).await
    }

    async fn load(&mut self, quiz_id: String) -> Result<Transition, SessionError> {
        self.enter(SessionState::Loading {
            quiz_id: quiz_id.clone(),
        });

        match self.initiator.start(&quiz_id).await {
            Ok(session) => {
                let mut countdown = Countdown::new();
                countdown.start(session.time_budget_secs());
                self.ticks.reset();
                let attempt = Attempt {
                    tracker: AnswerTracker::new(session.questions()),
                    coordinator: Arc::new(SubmissionCoordinator::new(
                        Arc::clone(&self.service),
                        session.session_id(),
                    )),
                    started: self.wall_clock.now(),
                    countdown,
                    session,
                };
                self.last_error = None;
                self.enter(SessionState::Answering(attempt));
                Ok(Transition::Entered(Phase::Answering))
            }
            Err(e) => {
                tracing::warn!(%quiz_id, "could not start session: {e}");
                let err = SessionError::from(e);
                self.last_error = Some(err.clone());
                self.enter(SessionState::Idle);
                Err(err)
            }
        }
    }

    fn mutate_answers(&mut self, f: impl FnOnce(&mut AnswerTracker) -> bool) -> Transition {
        match &mut self.state {
            SessionState::Answering(attempt) => {
                if f(&mut attempt.tracker) {
                    Transition::Updated
                } else {
                    Transition::Ignored
                }
            }
            _ => self.ignored("answer change"),
        }
    }

    fn navigate(
        &mut self,
        answering: impl FnOnce(&mut AnswerTracker) -> bool,
        reviewing: impl FnOnce(&mut ReviewCursor) -> bool,
    ) -> Transition {
        let moved = match &mut self.state {
            SessionState::Answering(attempt) => answering(&mut attempt.tracker),
            SessionState::Solutions(review) => reviewing(&mut review.cursor),
            _ => return self.ignored("navigation"),
        };
        if moved {
            Transition::Updated
        } else {
            Transition::Ignored
        }
    }

    async fn on_tick(&mut self) -> Result<Transition, SessionError> {
        let signal = match &mut self.state {
            SessionState::Answering(attempt) => attempt.countdown.tick(),
            _ => None,
        };
        match signal {
            Some(ClockSignal::Tick(remaining)) => {
                self.observer.on_tick(remaining);
                Ok(Transition::Updated)
            }
            Some(ClockSignal::Expired) => {
                self.observer.on_tick(0);
                self.observer.on_expire();
                tracing::info!("time expired, submitting automatically");
                self.finish_attempt(FinishTrigger::ClockExpired).await
            }
            None => Ok(Transition::Ignored),
        }
    }

    async fn finish_attempt(&mut self, trigger: FinishTrigger) -> Result<Transition, SessionError> {
        let from = self.state.phase();
        let mut attempt = match std::mem::take(&mut self.state) {
            SessionState::Answering(attempt) => attempt,
            other => {
                self.state = other;
                tracing::debug!(?trigger, phase = %from, "finish ignored");
                return Ok(Transition::Ignored);
            }
        };

        attempt.countdown.cancel();
        let elapsed = elapsed_secs(attempt.started, self.wall_clock.now());
        let counted = u64::from(
            attempt
                .session
                .time_budget_secs()
                .saturating_sub(attempt.countdown.remaining()),
        );
        if elapsed.abs_diff(counted) > CLOCK_DRIFT_LOG_SECS {
            tracing::debug!(elapsed, counted, "wall clock and countdown disagree");
        }

        let coordinator = Arc::clone(&attempt.coordinator);
        let session = attempt.session.clone();
        let answers = attempt.tracker.clone();
        self.state = SessionState::Submitting(attempt);
        self.announce(from);

        let outcome = coordinator.finish(&session, &answers, elapsed).await;

        let from = self.state.phase();
        let attempt = match std::mem::take(&mut self.state) {
            SessionState::Submitting(attempt) => attempt,
            other => {
                self.state = other;
                return Ok(Transition::Ignored);
            }
        };

        match outcome {
            Ok(FinishOutcome::Scored(scored)) => {
                self.last_error = None;
                let review = Review::new(attempt.session, scored);
                self.state = SessionState::Results(review);
                self.announce(from);
                Ok(Transition::Entered(Phase::Results))
            }
            Ok(FinishOutcome::Rejected(_)) => {
                self.state = SessionState::Answering(attempt);
                self.announce(from);
                Ok(Transition::Ignored)
            }
            Err(e) => {
                let err = SessionError::from(e);
                self.last_error = Some(err.clone());
                self.state = SessionState::Answering(attempt);
                self.announce(from);
                Err(err)
            }
        }
    }

    fn switch_review(&mut self, target: Phase) -> Transition {
        let from = self.state.phase();
        let review = match (std::mem::take(&mut self.state), target) {
            (SessionState::Results(review), Phase::Solutions)
            | (SessionState::Solutions(review), Phase::Results) => review,
            (other, _) => {
                self.state = other;
                return self.ignored("view change");
            }
        };
        let review = Review {
            cursor: ReviewCursor::new(review.scored.questions.len()),
            ..review
        };
        self.state = match target {
            Phase::Solutions => SessionState::Solutions(review),
            _ => SessionState::Results(review),
        };
        self.announce(from);
        Transition::Entered(target)
    }

    async fn retry_quiz(&mut self) -> Result<Transition, SessionError> {
        let quiz_id = match &self.state {
            SessionState::Results(r) | SessionState::Solutions(r) => r.quiz_id.clone(),
            _ => return Ok(self.ignored("retry")),
        };
        tracing::info!(%quiz_id, "retrying quiz with a new session");
        self.load(quiz_id).await
    }

    fn exit_review(&mut self) -> Transition {
        match self.state {
            SessionState::Results(_) | SessionState::Solutions(_) => {
                self.enter(SessionState::Exited);
                Transition::Entered(Phase::Exited)
            }
            _ => self.ignored("exit"),
        }
    }
}
