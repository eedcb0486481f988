use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{
    AnswerOption, QuestionBankError, QuizSettings, RawQuestion, ScoreKey, SessionStatus,
    TierClassifier,
};
use quiz_core::time::fixed_clock;
use services::{
    QuizEvent, QuizLoopService, QuizRunner, QuizSession, SessionError, TierBadgeService,
    Transition,
};
use storage::repository::{InMemoryScoreStore, ScoreStore, StorageError};

/// Records every write so tests can assert on how often the score was saved.
#[derive(Clone, Default)]
struct RecordingStore {
    inner: InMemoryScoreStore,
    saves: Arc<Mutex<Vec<u32>>>,
}

impl RecordingStore {
    fn saves(&self) -> Vec<u32> {
        self.saves.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScoreStore for RecordingStore {
    async fn save_score(&self, key: &ScoreKey, score: u32) -> Result<(), StorageError> {
        self.saves.lock().unwrap().push(score);
        self.inner.save_score(key, score).await
    }

    async fn load_score(&self, key: &ScoreKey) -> Result<Option<u32>, StorageError> {
        self.inner.load_score(key).await
    }
}

struct FailingStore;

#[async_trait]
impl ScoreStore for FailingStore {
    async fn save_score(&self, _key: &ScoreKey, _score: u32) -> Result<(), StorageError> {
        Err(StorageError::Connection("disk full".into()))
    }

    async fn load_score(&self, _key: &ScoreKey) -> Result<Option<u32>, StorageError> {
        Ok(None)
    }
}

#[derive(Debug, Clone, Copy)]
enum Play {
    Correct,
    Wrong,
    Timeout,
}

fn bank(n: usize) -> Vec<RawQuestion> {
    (1..=n)
        .map(|i| {
            RawQuestion::with_correct_text(
                format!("Question {i}?"),
                ["alpha", "beta", "gamma"],
                ["alpha", "beta", "gamma"][i % 3],
            )
        })
        .collect()
}

fn service(store: Arc<dyn ScoreStore>) -> QuizLoopService {
    QuizLoopService::new(fixed_clock(), QuizSettings::default(), store).with_seed(Some(2024))
}

/// Steps timers until the session accepts an answer again or has finished.
async fn settle(service: &QuizLoopService, session: &mut QuizSession) {
    while session.status() == SessionStatus::AnswerLocked {
        service.step(session).await.unwrap();
    }
}

async fn play(service: &QuizLoopService, session: &mut QuizSession, plays: &[Play]) {
    for play in plays {
        assert_eq!(session.status(), SessionStatus::AwaitingAnswer);
        let question = session.current_question().unwrap();
        let correct = question.correct_index();
        let wrong = (correct + 1) % question.options().len();
        match play {
            Play::Correct => {
                session.answer(correct).unwrap();
            }
            Play::Wrong => {
                session.answer(wrong).unwrap();
            }
            Play::Timeout => {
                while session.status() == SessionStatus::AwaitingAnswer {
                    service.step(session).await.unwrap();
                }
            }
        }
        settle(service, session).await;
    }
}

#[tokio::test(start_paused = true)]
async fn all_correct_saves_full_score_once() {
    let store = RecordingStore::default();
    let service = service(Arc::new(store.clone()));
    let mut session = service.start_session(bank(5)).unwrap();

    play(&service, &mut session, &[Play::Correct; 5]).await;

    assert_eq!(session.status(), SessionStatus::Finished);
    let outcome = session.outcome().unwrap();
    assert_eq!(outcome.score(), 5);
    assert_eq!(outcome.tier(), TierClassifier::default().tier(5));
    assert_eq!(store.saves(), vec![5]);

    // Finalizing again does not write a second time.
    assert_eq!(service.finalize_score(&mut session).await.unwrap(), 5);
    assert_eq!(store.saves(), vec![5]);
}

#[tokio::test(start_paused = true)]
async fn all_timeouts_score_zero() {
    let store = RecordingStore::default();
    let service = service(Arc::new(store.clone()));
    let mut session = service.start_session(bank(5)).unwrap();

    play(&service, &mut session, &[Play::Timeout; 5]).await;

    let outcome = session.outcome().unwrap();
    assert_eq!(outcome.score(), 0);
    assert_eq!(outcome.tier().value(), 0);
    assert_eq!(outcome.timed_out(), 5);
    assert!(outcome.reviews().iter().all(|r| r.selected.is_none() && !r.correct));
    assert_eq!(store.saves(), vec![0]);
}

#[tokio::test(start_paused = true)]
async fn mixed_outcomes_count_only_correct_locks() {
    let store = RecordingStore::default();
    let service = service(Arc::new(store.clone()));
    let mut session = service.start_session(bank(5)).unwrap();

    play(
        &service,
        &mut session,
        &[Play::Correct, Play::Wrong, Play::Timeout, Play::Correct, Play::Wrong],
    )
    .await;

    let outcome = session.outcome().unwrap();
    assert_eq!(outcome.score(), 2);
    assert_eq!(
        outcome.score() as usize,
        outcome.reviews().iter().filter(|r| r.correct).count()
    );
    assert_eq!(store.saves(), vec![2]);
}

#[tokio::test(start_paused = true)]
async fn two_correct_options_reject_the_bank() {
    let service = service(Arc::new(RecordingStore::default()));
    let mut raw = bank(2);
    raw.push(RawQuestion::new(
        "Which is right?",
        vec![AnswerOption::correct("this"), AnswerOption::correct("that")],
    ));

    let err = service.start_session(raw).unwrap_err();

    assert!(matches!(
        err,
        SessionError::InvalidQuestionBank(QuestionBankError::MultipleCorrectOptions {
            position: 3,
            count: 2
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn empty_bank_is_retryable_empty_state() {
    let service = service(Arc::new(RecordingStore::default()));
    let mut session = service.start_session(Vec::new()).unwrap();

    assert_eq!(session.status(), SessionStatus::Empty);
    service.retry(&mut session).unwrap();
    assert_eq!(session.status(), SessionStatus::Empty);
}

#[tokio::test(start_paused = true)]
async fn failed_write_keeps_outcome_and_reports() {
    let service = service(Arc::new(FailingStore));
    let mut session = service.start_session(bank(1)).unwrap();
    let correct = session.current_question().unwrap().correct_index();
    session.answer(correct).unwrap();

    let err = service.step(&mut session).await.unwrap_err();

    assert!(matches!(err, SessionError::PersistenceWriteFailed(_)));
    assert_eq!(session.status(), SessionStatus::Finished);
    assert_eq!(session.outcome().unwrap().score(), 1);
    assert!(!session.score_saved());
}

#[tokio::test(start_paused = true)]
async fn retry_after_finish_starts_fresh_and_saves_again() {
    let store = RecordingStore::default();
    let service = service(Arc::new(store.clone()));
    let mut session = service.start_session(bank(3)).unwrap();
    play(&service, &mut session, &[Play::Correct; 3]).await;

    service.retry(&mut session).unwrap();
    assert_eq!(session.score(), 0);
    assert_eq!(session.index(), 0);
    play(&service, &mut session, &[Play::Wrong, Play::Correct, Play::Timeout]).await;

    assert_eq!(store.saves(), vec![3, 1]);
    let badge = TierBadgeService::new(Arc::new(store.clone()), TierClassifier::default());
    assert_eq!(badge.last_score(&ScoreKey::default()).await.unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn step_applies_one_tick_at_a_time() {
    let service = service(Arc::new(RecordingStore::default()));
    let mut session = service.start_session(bank(1)).unwrap();

    assert_eq!(
        service.step(&mut session).await.unwrap(),
        Transition::Ticked { remaining: 29 }
    );
    assert_eq!(session.snapshot().remaining_secs, 29);
}

#[tokio::test(start_paused = true)]
async fn runner_drives_session_to_completion() {
    let store = RecordingStore::default();
    let service = service(Arc::new(store.clone())).with_score_key(ScoreKey::for_user("ana"));
    // Option 0 is always correct; shuffling only reorders questions.
    let raw: Vec<_> = (1..=3)
        .map(|i| RawQuestion::with_correct_text(format!("Q{i}"), ["yes", "no"], "yes"))
        .collect();
    let mut handle = QuizRunner::spawn(service, raw).unwrap();
    let mut snapshots = handle.subscribe();

    for index in 0..3 {
        snapshots
            .wait_for(|s| s.status == SessionStatus::AwaitingAnswer && s.index == index)
            .await
            .unwrap();
        handle.answer(0).await.unwrap();
    }

    let event = handle.next_event().await.unwrap();
    let QuizEvent::Finished(outcome) = event else {
        panic!("expected finish, got {event:?}");
    };
    assert_eq!(outcome.score(), 3);
    assert_eq!(store.saves(), vec![3]);
    assert_eq!(
        store.load_score(&ScoreKey::for_user("ana")).await.unwrap(),
        Some(3)
    );

    snapshots
        .wait_for(|s| s.status == SessionStatus::Finished)
        .await
        .unwrap();
    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn runner_reports_rejected_commands_and_persistence_failures() {
    let service = service(Arc::new(FailingStore));
    let raw = vec![RawQuestion::with_correct_text("Only", ["a", "b"], "a")];
    let mut handle = QuizRunner::spawn(service, raw).unwrap();

    handle.answer(9).await.unwrap();
    let rejected = handle.next_event().await.unwrap();
    assert!(matches!(rejected, QuizEvent::Rejected { .. }));

    handle.retry().await.unwrap();
    assert!(matches!(
        handle.next_event().await.unwrap(),
        QuizEvent::Rejected { .. }
    ));

    // Let the question time out.
    let failed = handle.next_event().await.unwrap();
    assert!(matches!(failed, QuizEvent::PersistenceFailed { score: 0, .. }));
    assert!(matches!(
        handle.next_event().await.unwrap(),
        QuizEvent::Finished(outcome) if outcome.score() == 0
    ));
    assert_eq!(handle.snapshot().status, SessionStatus::Finished);

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn runner_answer_at_expiry_instant_wins() {
    let store = RecordingStore::default();
    let settings = QuizSettings::new(2, 1_000, 5).unwrap();
    let service = QuizLoopService::new(fixed_clock(), settings, Arc::new(store.clone()));
    let raw = vec![RawQuestion::with_correct_text("Only", ["yes", "no"], "yes")];
    let mut handle = QuizRunner::spawn(service, raw).unwrap();

    // Queued before the session task first runs; the clock then lands on the deadline.
    handle.answer(0).await.unwrap();
    tokio::time::advance(Duration::from_secs(2)).await;

    let event = handle.next_event().await.unwrap();
    let QuizEvent::Finished(outcome) = event else {
        panic!("expected finish, got {event:?}");
    };
    assert_eq!(outcome.score(), 1);
    assert_eq!(outcome.timed_out(), 0);
    assert_eq!(outcome.reviews()[0].selected, Some(0));
    assert!(outcome.reviews()[0].correct);
    assert_eq!(store.saves(), vec![1]);

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn runner_retry_after_finish_resets_and_saves_again() {
    let store = RecordingStore::default();
    let service = service(Arc::new(store.clone()));
    let raw: Vec<_> = (1..=2)
        .map(|i| RawQuestion::with_correct_text(format!("Q{i}"), ["yes", "no"], "yes"))
        .collect();
    let mut handle = QuizRunner::spawn(service, raw).unwrap();
    let mut snapshots = handle.subscribe();

    for index in 0..2 {
        snapshots
            .wait_for(|s| s.status == SessionStatus::AwaitingAnswer && s.index == index)
            .await
            .unwrap();
        handle.answer(0).await.unwrap();
    }
    assert!(matches!(
        handle.next_event().await.unwrap(),
        QuizEvent::Finished(outcome) if outcome.score() == 2
    ));

    handle.retry().await.unwrap();
    let fresh = snapshots
        .wait_for(|s| s.status == SessionStatus::AwaitingAnswer)
        .await
        .unwrap()
        .clone();
    assert_eq!(fresh.score, 0);
    assert_eq!(fresh.index, 0);
    assert_eq!(fresh.remaining_secs, 30);

    // Both questions time out on the second run.
    let event = handle.next_event().await.unwrap();
    let QuizEvent::Finished(outcome) = event else {
        panic!("expected finish, got {event:?}");
    };
    assert_eq!(outcome.score(), 0);
    assert_eq!(outcome.timed_out(), 2);
    assert_eq!(store.saves(), vec![2, 0]);
    assert_eq!(store.load_score(&ScoreKey::default()).await.unwrap(), Some(0));

    handle.close().await;
}

#[tokio::test(start_paused = true)]
async fn runner_rejects_invalid_bank_before_spawning() {
    let service = service(Arc::new(RecordingStore::default()));
    let raw = vec![RawQuestion::new("No options", Vec::new())];

    assert!(matches!(
        QuizRunner::spawn(service, raw),
        Err(SessionError::InvalidQuestionBank(QuestionBankError::NoOptions { position: 1 }))
    ));
}
