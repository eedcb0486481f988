use std::sync::Arc;

use quiz_core::model::{ScoreKey, Tier, TierClassifier};
use storage::repository::ScoreStore;

use crate::error::ScoreServiceError;

/// Read path for the profile badge: last persisted score mapped onto a tier.
#[derive(Clone)]
pub struct TierBadgeService {
    scores: Arc<dyn ScoreStore>,
    classifier: TierClassifier,
}

impl TierBadgeService {
    #[must_use]
    pub fn new(scores: Arc<dyn ScoreStore>, classifier: TierClassifier) -> Self {
        Self { scores, classifier }
    }

    /// Last persisted score, or 0 if none was ever saved.
    ///
    /// # Errors
    ///
    /// Returns `ScoreServiceError` on storage failures.
    pub async fn last_score(&self, key: &ScoreKey) -> Result<u32, ScoreServiceError> {
        let score = self.scores.load_score(key).await?;
        Ok(score.unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns `ScoreServiceError` on storage failures.
    pub async fn current_tier(&self, key: &ScoreKey) -> Result<Tier, ScoreServiceError> {
        let score = self.last_score(key).await?;
        Ok(self.classifier.tier(score))
    }
}
