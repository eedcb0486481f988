use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{QuestionId, Tier, TierClassifier};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionOutcomeError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("too many reviews for a single session: {len}")]
    TooManyReviews { len: usize },
}

/// Lifecycle state of a quiz session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Building and shuffling the question order.
    Loading,
    /// The current question accepts an answer and its countdown is running.
    AwaitingAnswer,
    /// The current question has been answered or timed out; the correct answer is revealed.
    AnswerLocked,
    /// Every question has been locked. Terminal until retried.
    Finished,
    /// The bank held no questions. Terminal until retried.
    Empty,
}

impl SessionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Empty)
    }
}

/// How one question was locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerReview {
    pub question_id: QuestionId,
    /// `None` when the countdown ran out first.
    pub selected: Option<usize>,
    pub correct: bool,
}

impl AnswerReview {
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.selected.is_none()
    }
}

/// Result of a finished session, kept in memory whether or not it was persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    score: u32,
    total: u32,
    tier: Tier,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    reviews: Vec<AnswerReview>,
}

impl SessionOutcome {
    /// Build an outcome from the review list of a finished session.
    ///
    /// The score is recomputed from the reviews, so it always equals the number of
    /// correctly locked questions.
    ///
    /// # Errors
    ///
    /// Returns `SessionOutcomeError::InvalidTimeRange` if `completed_at` is before `started_at`.
    /// Returns `SessionOutcomeError::TooManyReviews` if the review count cannot fit in `u32`.
    pub fn from_reviews(
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        reviews: Vec<AnswerReview>,
        classifier: TierClassifier,
    ) -> Result<Self, SessionOutcomeError> {
        if completed_at < started_at {
            return Err(SessionOutcomeError::InvalidTimeRange);
        }
        let total = u32::try_from(reviews.len())
            .map_err(|_| SessionOutcomeError::TooManyReviews { len: reviews.len() })?;
        let score = reviews
            .iter()
            .filter(|review| review.correct)
            .fold(0_u32, |acc, _| acc.saturating_add(1));

        Ok(Self {
            score,
            total,
            tier: classifier.tier(score),
            started_at,
            completed_at,
            reviews,
        })
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn tier(&self) -> Tier {
        self.tier
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn reviews(&self) -> &[AnswerReview] {
        &self.reviews
    }

    #[must_use]
    pub fn timed_out(&self) -> u32 {
        self.reviews
            .iter()
            .filter(|review| review.timed_out())
            .fold(0_u32, |acc, _| acc.saturating_add(1))
    }
}
