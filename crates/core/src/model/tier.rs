use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest tier reachable with the default classifier.
pub const DEFAULT_MAX_TIER: u32 = 5;

/// Engagement tier shown as the profile badge and progress icon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tier(u32);

impl Tier {
    pub const ZERO: Tier = Tier(0);

    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maps a cumulative score onto `[0, max_tier]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TierClassifier {
    max_tier: u32,
}

impl TierClassifier {
    #[must_use]
    pub fn new(max_tier: u32) -> Self {
        Self { max_tier }
    }

    #[must_use]
    pub fn max_tier(&self) -> u32 {
        self.max_tier
    }

    /// Saturating: every score at or above `max_tier` lands on the top tier.
    #[must_use]
    pub fn tier(&self, score: u32) -> Tier {
        Tier(score.min(self.max_tier))
    }
}

impl Default for TierClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TIER)
    }
}
