use chrono::{DateTime, Utc};
use std::fmt;
use std::future;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use quiz_core::model::{
    AnswerReview, Question, QuestionSet, QuizSettings, SessionOutcome, SessionStatus,
    TierClassifier,
};
use quiz_core::{Clock, Shuffler};

use super::countdown::{Countdown, CountdownEvent};
use super::view::{QuestionView, SessionSnapshot};
use crate::error::SessionError;

//
// ─── TRANSITIONS ───────────────────────────────────────────────────────────────
//

/// Result of an `answer` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerResult {
    /// The answer locked the current question.
    Locked(AnswerReview),
    /// The session was not awaiting an answer; nothing changed.
    Ignored,
}

/// State change produced by a timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// One second elapsed on the current question.
    Ticked { remaining: u32 },
    /// The countdown ran out and locked the question unanswered.
    TimedOut(AnswerReview),
    /// The reveal delay elapsed and the next question is live.
    Advanced { index: usize },
    /// The last question's reveal delay elapsed.
    Finished(SessionOutcome),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One run of the quiz over a shuffled question order.
///
/// Owns the only countdown of the run. Every transition out of `AwaitingAnswer` cancels
/// it before anything else happens, and timer events are only ever produced by
/// [`QuizSession::wait_timer`] for the state the session is in at that moment.
pub struct QuizSession {
    set: QuestionSet,
    settings: QuizSettings,
    classifier: TierClassifier,
    shuffler: Shuffler,
    clock: Clock,
    order: Vec<Question>,
    index: usize,
    score: u32,
    selected: Option<usize>,
    remaining: u32,
    status: SessionStatus,
    countdown: Countdown,
    reveal_at: Option<Instant>,
    reviews: Vec<AnswerReview>,
    started_at: DateTime<Utc>,
    outcome: Option<SessionOutcome>,
    score_saved: bool,
}

impl QuizSession {
    /// Shuffle `set` and start on its first question, or land in `Empty` for an empty set.
    ///
    /// Must be called within a tokio runtime; the first countdown starts immediately.
    #[must_use]
    pub fn start(set: QuestionSet, settings: QuizSettings, shuffler: Shuffler, clock: Clock) -> Self {
        let mut session = Self {
            set,
            settings,
            classifier: TierClassifier::new(settings.max_tier()),
            shuffler,
            clock,
            order: Vec::new(),
            index: 0,
            score: 0,
            selected: None,
            remaining: 0,
            status: SessionStatus::Loading,
            countdown: Countdown::new(),
            reveal_at: None,
            reviews: Vec::new(),
            started_at: clock.now(),
            outcome: None,
            score_saved: false,
        };
        session.load();
        session
    }

    fn load(&mut self) {
        self.order = self.shuffler.next_order(self.set.questions());
        self.index = 0;
        self.score = 0;
        self.selected = None;
        self.reviews.clear();
        self.outcome = None;
        self.score_saved = false;
        self.started_at = self.clock.now();

        if self.order.is_empty() {
            self.remaining = 0;
            self.status = SessionStatus::Empty;
            info!("quiz has no questions available");
            return;
        }

        self.begin_question();
        info!(total = self.order.len(), "quiz session started");
    }

    fn begin_question(&mut self) {
        self.selected = None;
        self.remaining = self.settings.question_secs();
        self.countdown.start(self.remaining);
        self.status = SessionStatus::AwaitingAnswer;
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    #[must_use]
    pub fn order(&self) -> &[Question] {
        &self.order
    }

    /// Locks recorded so far in this run, in question order.
    #[must_use]
    pub fn reviews(&self) -> &[AnswerReview] {
        &self.reviews
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Available once `Finished`, independent of whether the score was persisted.
    #[must_use]
    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.status {
            SessionStatus::AwaitingAnswer | SessionStatus::AnswerLocked => {
                self.order.get(self.index)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let reveal = self.status == SessionStatus::AnswerLocked;
        SessionSnapshot {
            status: self.status,
            question: self
                .current_question()
                .map(|question| QuestionView::from_question(question, reveal)),
            remaining_secs: self.remaining,
            selected: self.selected,
            score: self.score,
            index: self.index,
            total: self.order.len(),
            tier: self.classifier.tier(self.score),
        }
    }

    /// Lock the current question with `selected`.
    ///
    /// A no-op unless the session is awaiting an answer, so a second answer (or one that
    /// races the countdown) cannot change the result.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidOption` if `selected` is not an option of the current
    /// question. The session is left unchanged.
    pub fn answer(&mut self, selected: usize) -> Result<AnswerResult, SessionError> {
        if self.status != SessionStatus::AwaitingAnswer {
            debug!(status = ?self.status, selected, "answer ignored");
            return Ok(AnswerResult::Ignored);
        }

        let len = self
            .current_question()
            .map_or(0, |question| question.options().len());
        if selected >= len {
            return Err(SessionError::InvalidOption {
                index: selected,
                len,
            });
        }

        Ok(self
            .lock(Some(selected))
            .map_or(AnswerResult::Ignored, AnswerResult::Locked))
    }

    fn lock(&mut self, selected: Option<usize>) -> Option<AnswerReview> {
        self.countdown.cancel();

        let question = self.order.get(self.index)?;
        let correct = selected
            .and_then(|idx| question.is_correct(idx))
            .unwrap_or(false);
        let review = AnswerReview {
            question_id: question.id(),
            selected,
            correct,
        };

        if correct {
            self.score = self.score.saturating_add(1);
        }
        self.selected = selected;
        self.reviews.push(review);
        self.status = SessionStatus::AnswerLocked;
        self.reveal_at = Some(Instant::now() + self.settings.reveal_delay());

        debug!(
            question = %review.question_id,
            ?selected,
            correct,
            score = self.score,
            "question locked"
        );
        Some(review)
    }

    /// Wait for the next timer-driven transition and apply it.
    ///
    /// Yields ticks and the expiry while awaiting an answer, the advance after the reveal
    /// delay while locked, and never resolves in `Finished` or `Empty`. Cancel safe: the
    /// transition is applied in the same poll that produces it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Outcome` if the finished session's outcome cannot be built.
    pub async fn wait_timer(&mut self) -> Result<Transition, SessionError> {
        match self.status {
            SessionStatus::AwaitingAnswer => match self.countdown.tick().await {
                CountdownEvent::Tick { remaining } => {
                    self.remaining = remaining;
                    Ok(Transition::Ticked { remaining })
                }
                CountdownEvent::Expired => {
                    self.remaining = 0;
                    match self.lock(None) {
                        Some(review) => Ok(Transition::TimedOut(review)),
                        None => future::pending().await,
                    }
                }
            },
            SessionStatus::AnswerLocked => {
                let Some(reveal_at) = self.reveal_at else {
                    return future::pending().await;
                };
                sleep_until(reveal_at).await;
                self.advance()
            }
            SessionStatus::Loading | SessionStatus::Finished | SessionStatus::Empty => {
                future::pending().await
            }
        }
    }

    fn advance(&mut self) -> Result<Transition, SessionError> {
        self.reveal_at = None;
        self.index += 1;

        if self.index < self.order.len() {
            self.begin_question();
            return Ok(Transition::Advanced { index: self.index });
        }

        self.countdown.cancel();
        self.selected = None;
        self.status = SessionStatus::Finished;
        let completed_at = self.clock.now().max(self.started_at);
        let outcome = SessionOutcome::from_reviews(
            self.started_at,
            completed_at,
            self.reviews.clone(),
            self.classifier,
        )?;
        debug_assert_eq!(outcome.score(), self.score);
        info!(
            score = outcome.score(),
            total = outcome.total(),
            tier = %outcome.tier(),
            "quiz session finished"
        );
        self.outcome = Some(outcome.clone());
        Ok(Transition::Finished(outcome))
    }

    /// Start over with a fresh order of the same questions.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotRetryable` unless the session is `Finished` or `Empty`.
    pub fn retry(&mut self) -> Result<(), SessionError> {
        if !self.status.is_terminal() {
            return Err(SessionError::NotRetryable {
                status: self.status,
            });
        }

        self.countdown.cancel();
        self.reveal_at = None;
        self.status = SessionStatus::Loading;
        info!("quiz session retried");
        self.load();
        Ok(())
    }

    /// End the session, e.g. when the player navigates away.
    pub fn close(mut self) {
        self.countdown.cancel();
        self.reveal_at = None;
        debug!(status = ?self.status, "quiz session closed");
    }

    #[must_use]
    pub fn score_saved(&self) -> bool {
        self.score_saved
    }

    pub(crate) fn mark_score_saved(&mut self) {
        self.score_saved = true;
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("status", &self.status)
            .field("order_len", &self.order.len())
            .field("index", &self.index)
            .field("score", &self.score)
            .field("remaining", &self.remaining)
            .field("reviews_len", &self.reviews.len())
            .field("score_saved", &self.score_saved)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
