//! End-to-end session flows: state machine + in-memory quiz service.
//!
//! The clock is driven with logical ticks and a manual wall clock, so every
//! test here runs instantly and deterministically.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeZone;
use quizrun_client::{MockQuiz, MockQuizService, ServiceError, SAMPLE_QUIZ_ID};
use quizrun_core::clock::LogicalTicks;
use quizrun_core::initiator::SessionInitiator;
use quizrun_core::model::Question;
use quizrun_core::submission::{FinishOutcome, SubmissionCoordinator, SubmissionPhase};
use quizrun_core::time::ManualClock;
use quizrun_core::tracker::AnswerTracker;
use quizrun_core::{Phase, SessionError, SessionStateMachine, Transition};

fn clock() -> ManualClock {
    ManualClock::new(chrono::Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap())
}

fn machine(service: &Arc<MockQuizService>) -> (SessionStateMachine, ManualClock) {
    let clock = clock();
    let machine = SessionStateMachine::new(service.clone(), Box::new(LogicalTicks::new()))
        .with_wall_clock(Arc::new(clock.clone()));
    (machine, clock)
}

fn two_question_quiz(minutes: u32) -> MockQuiz {
    let question = |id: &str, correct: usize| Question {
        id: id.to_string(),
        text: format!("Question {id}"),
        options: vec!["A".into(), "B".into()],
        correct_answer: Some(correct),
        explanation: format!("{id} explained"),
    };
    MockQuiz {
        title: "Two questions".into(),
        time_limit_minutes: minutes,
        questions: vec![question("a", 0), question("b", 1)],
    }
}

#[tokio::test]
async fn expiry_submits_unanswered_quiz_exactly_once() {
    let service = Arc::new(MockQuizService::new().with_quiz("short", two_question_quiz(1)));
    let (mut machine, clock) = machine(&service);
    machine.start("short").await.unwrap();

    let mut last = Transition::Ignored;
    for _ in 0..60 {
        clock.advance_secs(1);
        last = machine.tick().await.unwrap();
    }
    assert_eq!(last, Transition::Entered(Phase::Results));
    assert_eq!(service.submit_calls(), 1);

    let sent = service.last_submission().unwrap();
    assert_eq!(sent.payload.time_taken_seconds, 60);
    assert_eq!(sent.payload.answers.len(), 2);
    assert!(sent
        .payload
        .answers
        .iter()
        .all(|a| a.selected_answer.is_none()));

    let result = machine.result().unwrap();
    assert_eq!(result.correct_answers, 0);
    assert_eq!(result.rounded_score(), 0);

    // A late user finish after the auto-submit does nothing.
    assert_eq!(machine.finish().await.unwrap(), Transition::Ignored);
    assert_eq!(service.submit_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_finishes_share_one_submission() {
    let service = Arc::new(MockQuizService::sample().with_latency(Duration::from_millis(200)));
    let session = SessionInitiator::new(service.clone())
        .start(SAMPLE_QUIZ_ID)
        .await
        .unwrap();
    let mut answers = AnswerTracker::new(session.questions());
    answers.set_answer(0, 1);

    let coordinator = SubmissionCoordinator::new(service.clone(), session.session_id());
    let (first, second) = futures::join!(
        coordinator.finish(&session, &answers, 42),
        coordinator.finish(&session, &answers, 42),
    );

    let outcomes = [first.unwrap(), second.unwrap()];
    let scored = outcomes
        .iter()
        .filter(|o| matches!(o, FinishOutcome::Scored(_)))
        .count();
    assert_eq!(scored, 1);
    assert!(outcomes
        .iter()
        .any(|o| matches!(o, FinishOutcome::Rejected(SubmissionPhase::Submitting))));
    assert_eq!(service.submit_calls(), 1);
    assert_eq!(coordinator.phase(), SubmissionPhase::Submitted);
}

#[tokio::test]
async fn retry_gets_fresh_session_and_clean_state() {
    let service = Arc::new(MockQuizService::sample());
    let (mut machine, clock) = machine(&service);
    machine.start(SAMPLE_QUIZ_ID).await.unwrap();
    let first_id = machine.attempt().unwrap().session().session_id().to_string();

    machine.set_answer(0, 1).await.unwrap();
    machine.set_answer(2, 0).await.unwrap();
    machine.jump_to(2).await.unwrap();
    for _ in 0..15 {
        machine.tick().await.unwrap();
    }
    clock.advance_secs(15);
    machine.finish().await.unwrap();
    assert_eq!(machine.result().unwrap().correct_answers, 2);

    machine.retry().await.unwrap();
    let attempt = machine.attempt().unwrap();
    assert_ne!(attempt.session().session_id(), first_id);
    assert_eq!(attempt.tracker().answered_count(), 0);
    assert_eq!(attempt.tracker().current_position(), 0);
    assert_eq!(attempt.countdown().remaining(), 300);
    assert_eq!(attempt.submission_phase(), SubmissionPhase::NotSubmitted);

    // The new session accepts its own submission.
    machine.finish().await.unwrap();
    assert_eq!(service.submissions().len(), 2);
    assert_eq!(machine.result().unwrap().correct_answers, 0);
}

#[tokio::test]
async fn partial_answers_are_sent_in_question_order() {
    let service = Arc::new(MockQuizService::new().with_quiz("short", two_question_quiz(5)));
    let (mut machine, clock) = machine(&service);
    machine.start("short").await.unwrap();

    machine.set_answer(0, 1).await.unwrap();
    clock.advance_secs(30);
    machine.finish().await.unwrap();

    let sent = service.last_submission().unwrap();
    let body = serde_json::to_value(&sent.payload).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "answers": [
                {"questionId": "a", "selectedAnswer": 1},
                {"questionId": "b", "selectedAnswer": null}
            ],
            "timeTakenSeconds": 30
        })
    );
}

#[tokio::test]
async fn half_right_scores_fifty() {
    let service = Arc::new(MockQuizService::new().with_quiz("short", two_question_quiz(5)));
    let (mut machine, _) = machine(&service);
    machine.start("short").await.unwrap();

    machine.set_answer(0, 0).await.unwrap();
    machine.set_answer(1, 0).await.unwrap();
    machine.finish().await.unwrap();

    let result = machine.result().unwrap();
    assert_eq!(result.correct_answers, 1);
    assert_eq!(result.total_questions, 2);
    assert_eq!(result.rounded_score(), 50);

    machine.view_solutions().await.unwrap();
    let entries = machine.solution_entries();
    assert!(entries[0].is_correct);
    assert!(!entries[1].is_correct);
    assert_eq!(entries[1].selected, Some(0));
    assert_eq!(entries[1].correct, Some(1));
    assert_eq!(entries[1].explanation(), "b explained");
}

#[tokio::test]
async fn withheld_answer_key_is_shown_after_scoring() {
    let service = Arc::new(MockQuizService::sample().with_withheld_answer_key(true));
    let (mut machine, _) = machine(&service);
    machine.start(SAMPLE_QUIZ_ID).await.unwrap();
    assert!(machine
        .attempt()
        .unwrap()
        .session()
        .questions()
        .iter()
        .all(|q| q.correct_answer.is_none()));

    machine.finish().await.unwrap();
    machine.view_solutions().await.unwrap();
    assert!(machine
        .solution_entries()
        .iter()
        .all(|e| e.correct.is_some()));
}

#[tokio::test]
async fn failed_submission_can_be_retried_with_same_answers() {
    let service = Arc::new(MockQuizService::sample());
    service.fail_next_submit(ServiceError::Timeout(30));
    let (mut machine, _) = machine(&service);
    machine.start(SAMPLE_QUIZ_ID).await.unwrap();
    machine.set_answer(1, 1).await.unwrap();

    let err = machine.finish().await.unwrap_err();
    assert!(matches!(err, SessionError::Submission(_)));
    assert_eq!(machine.phase(), Phase::Answering);
    assert_eq!(machine.attempt().unwrap().tracker().answer(1), Some(1));

    machine.finish().await.unwrap();
    assert_eq!(machine.phase(), Phase::Results);
    assert_eq!(machine.result().unwrap().correct_answers, 1);
    assert_eq!(service.submit_calls(), 2);
    assert_eq!(service.submissions().len(), 1);
}

#[tokio::test]
async fn unknown_quiz_leaves_machine_idle() {
    let service = Arc::new(MockQuizService::sample());
    let (mut machine, _) = machine(&service);

    let err = machine.start("does-not-exist").await.unwrap_err();
    assert!(err.to_string().contains("does-not-exist"));
    assert_eq!(machine.phase(), Phase::Idle);
    assert_eq!(service.start_calls(), 0);
}
