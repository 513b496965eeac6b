
use std::time::Duration;

use quizsmith::error::SessionError;
use quizsmith::quiz::{FinishReason, QuestionType, QuizSession, SessionEvent, SessionRunner, Transition};
use tokio::time::Instant;

use crate::test_utils::{init_test_logging, mixed_quiz, Identity};

#[tokio::test(start_paused = true)]
async fn timeout_without_input_submits_empty_answers_once() {
    init_test_logging();
    let questions = mixed_quiz();
    let session = QuizSession::new(questions.clone(), 1, Box::new(Identity)).unwrap();
    let runner = SessionRunner::new(session);
    let started = Instant::now();

    let mut ticks = 0;
    let mut finalized = 0;
    let finalization = runner
        .run(|session, outcome| match outcome {
            Ok(Transition::Ticked { .. }) => ticks += 1,
            Ok(Transition::Finalized(_)) => {
                finalized += 1;
                assert!(session.is_finalized());
            }
            other => panic!("unexpected outcome {other:?}"),
        })
        .await
        .unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(60));
    assert_eq!(ticks, 59);
    assert_eq!(finalized, 1);
    assert_eq!(finalization.reason, FinishReason::TimedOut);
    assert_eq!(finalization.answers.len(), questions.len());
    assert!(finalization.answers.iter().all(|a| a.answer.is_empty()));
    let ids: Vec<i64> = finalization.answers.iter().map(|a| a.question_id).collect();
    assert_eq!(ids, [1, 2, 3, 4, 5, 6]);
}

#[tokio::test(start_paused = true)]
async fn timeout_commits_the_active_sequencing_order() {
    let questions: Vec<_> = mixed_quiz()
        .into_iter()
        .filter(|q| matches!(q.question_type, QuestionType::ShortAnswer | QuestionType::Sequencing))
        .collect();
    let session = QuizSession::new(questions, 1, Box::new(Identity)).unwrap();
    let runner = SessionRunner::new(session);
    let input = runner.sender();
    input.send(SessionEvent::Answer("energy".into())).unwrap();
    input.send(SessionEvent::Next).unwrap();
    input.send(SessionEvent::MoveDown(0)).unwrap();

    let finalization = runner.run(|_, _| {}).await.unwrap();
    drop(input);

    assert_eq!(finalization.reason, FinishReason::TimedOut);
    assert_eq!(finalization.answers[0].answer, "energy");
    assert_eq!(finalization.answers[1].answer, "b || a || c");
}

#[tokio::test(start_paused = true)]
async fn submitting_on_the_last_question_stops_the_timer() {
    init_test_logging();
    let questions: Vec<_> = mixed_quiz().into_iter().take(2).collect();
    let session = QuizSession::new(questions, 1, Box::new(Identity)).unwrap();
    let runner = SessionRunner::new(session);
    let input = runner.sender();
    let started = Instant::now();

    let feeder = {
        let input = input.clone();
        tokio::spawn(async move {
            input.send(SessionEvent::Pick(0)).unwrap();
            input.send(SessionEvent::Next).unwrap();
            tokio::time::sleep(Duration::from_secs(3)).await;
            input.send(SessionEvent::Pick(0)).unwrap();
            input.send(SessionEvent::Next).unwrap();
        })
    };

    let mut outcomes = Vec::new();
    let finalization = runner
        .run(|_, outcome| outcomes.push(outcome.clone()))
        .await
        .unwrap();
    feeder.await.unwrap();

    assert_eq!(finalization.reason, FinishReason::Submitted);
    assert_eq!(started.elapsed(), Duration::from_secs(3));
    assert!(matches!(outcomes.last(), Some(Ok(Transition::Finalized(_)))));
    let ticks = outcomes.iter().filter(|o| matches!(o, Ok(Transition::Ticked { .. }))).count();
    assert!(ticks <= 3, "ticked {ticks} times in three seconds");

    // The queue is gone with the run; nothing can tick into it any more.
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(input.is_closed());
    assert_eq!(finalization.answers[0].answer, "Mitochondria");
}

#[tokio::test]
async fn rejected_input_is_reported_and_the_session_continues() {
    let questions: Vec<_> = mixed_quiz().into_iter().take(1).collect();
    let session = QuizSession::new(questions, 0, Box::new(Identity)).unwrap();
    let runner = SessionRunner::new(session);
    let input = runner.sender();
    input.send(SessionEvent::Pick(7)).unwrap();
    input.send(SessionEvent::Previous).unwrap();
    input.send(SessionEvent::Pick(1)).unwrap();
    input.send(SessionEvent::Next).unwrap();

    let mut errors = Vec::new();
    let finalization = runner
        .run(|_, outcome| {
            if let Err(e) = outcome {
                errors.push(e.clone());
            }
        })
        .await
        .unwrap();

    assert_eq!(
        errors,
        [SessionError::OptionOutOfRange { index: 7, len: 3 }, SessionError::AtFirstQuestion]
    );
    assert_eq!(finalization.answers[0].answer, "Nucleus");
}

#[tokio::test]
async fn queued_match_positions_apply_to_the_question_reached_by_queued_moves() {
    let questions: Vec<_> = mixed_quiz()
        .into_iter()
        .filter(|q| matches!(q.question_type, QuestionType::ShortAnswer | QuestionType::Matching))
        .collect();
    let session = QuizSession::new(questions, 0, Box::new(Identity)).unwrap();
    let runner = SessionRunner::new(session);
    let input = runner.sender();
    input.send(SessionEvent::Next).unwrap();
    input.send(SessionEvent::MatchAt { left: 1, right: 1 }).unwrap();
    input.send(SessionEvent::MatchAt { left: 0, right: 0 }).unwrap();
    input.send(SessionEvent::Next).unwrap();

    let finalization = runner.run(|_, outcome| assert!(outcome.is_ok(), "{outcome:?}")).await.unwrap();
    assert_eq!(finalization.answers[1].answer, "Berlin -> Germany, Paris -> France");
}

#[tokio::test]
async fn closing_input_without_a_timer_abandons_the_run() {
    let session = QuizSession::new(mixed_quiz(), 0, Box::new(Identity)).unwrap();
    let runner = SessionRunner::new(session);
    let input = runner.sender();
    input.send(SessionEvent::Next).unwrap();
    drop(input);

    let outcome = runner.run(|_, _| {}).await;
    assert_eq!(outcome.unwrap_err(), SessionError::Abandoned);
}
