use std::sync::Arc;

use tracing::{info, warn};

use quiz_core::model::{QuestionSet, QuizSettings, RawQuestion, ScoreKey};
use quiz_core::{Clock, Shuffler};
use storage::repository::ScoreStore;

use super::service::{QuizSession, Transition};
use crate::error::SessionError;

/// Orchestrates session start, timer stepping and final score persistence.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    settings: QuizSettings,
    scores: Arc<dyn ScoreStore>,
    score_key: ScoreKey,
    seed: Option<u64>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(clock: Clock, settings: QuizSettings, scores: Arc<dyn ScoreStore>) -> Self {
        Self {
            clock,
            settings,
            scores,
            score_key: ScoreKey::default(),
            seed: None,
        }
    }

    #[must_use]
    pub fn with_score_key(mut self, score_key: ScoreKey) -> Self {
        self.score_key = score_key;
        self
    }

    /// Use a deterministic shuffle for every session this service starts.
    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    #[must_use]
    pub fn score_key(&self) -> &ScoreKey {
        &self.score_key
    }

    /// Validate `bank` and start a new session over it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidQuestionBank` if any record is malformed; no session
    /// is created in that case.
    pub fn start_session(&self, bank: Vec<RawQuestion>) -> Result<QuizSession, SessionError> {
        let set = QuestionSet::build(bank)?;
        let shuffler = self
            .seed
            .map_or_else(Shuffler::from_entropy, Shuffler::seeded);
        Ok(QuizSession::start(set, self.settings, shuffler, self.clock))
    }

    /// Apply the next timer transition, persisting the score when the session finishes.
    ///
    /// Not cancel safe once the session has finished: dropping the future during the
    /// write leaves the score unsaved (see [`Self::finalize_score`]).
    ///
    /// # Errors
    ///
    /// Returns `SessionError::PersistenceWriteFailed` if the final write fails; the
    /// outcome stays available through [`QuizSession::outcome`].
    pub async fn step(&self, session: &mut QuizSession) -> Result<Transition, SessionError> {
        let transition = session.wait_timer().await?;
        if matches!(transition, Transition::Finished(_)) {
            self.finalize_score(session).await?;
        }
        Ok(transition)
    }

    /// Persist the finished session's score unless it was already saved.
    ///
    /// Called automatically by [`Self::step`]; callers may call it again after a failed
    /// write. Failures are never retried here.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFinished` if the session has no outcome yet.
    /// Returns `SessionError::PersistenceWriteFailed` if the write fails.
    pub async fn finalize_score(&self, session: &mut QuizSession) -> Result<u32, SessionError> {
        let Some(outcome) = session.outcome() else {
            return Err(SessionError::NotFinished);
        };
        let score = outcome.score();
        if session.score_saved() {
            return Ok(score);
        }

        if let Err(err) = self.scores.save_score(&self.score_key, score).await {
            warn!(key = %self.score_key, score, error = %err, "failed to persist quiz score");
            return Err(SessionError::PersistenceWriteFailed(err));
        }
        session.mark_score_saved();
        info!(key = %self.score_key, score, "quiz score persisted");
        Ok(score)
    }

    /// Start the session over with a fresh order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotRetryable` unless the session is `Finished` or `Empty`.
    pub fn retry(&self, session: &mut QuizSession) -> Result<(), SessionError> {
        session.retry()
    }
}
