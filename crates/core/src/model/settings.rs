use std::time::Duration;

use thiserror::Error;

use crate::model::tier::DEFAULT_MAX_TIER;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizSettingsError {
    #[error("question time must be between 1 and 600 seconds")]
    InvalidQuestionSecs,

    #[error("reveal delay must be at most 10000 ms")]
    InvalidRevealDelay,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Timing and scoring knobs for a quiz session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizSettings {
    question_secs: u32,
    reveal_delay_ms: u32,
    max_tier: u32,
}

impl QuizSettings {
    pub const DEFAULT_QUESTION_SECS: u32 = 30;
    pub const DEFAULT_REVEAL_DELAY_MS: u32 = 1_000;

    /// Creates custom quiz settings.
    ///
    /// # Errors
    ///
    /// Returns `QuizSettingsError` if the question time is outside `1..=600` seconds or
    /// the reveal delay exceeds ten seconds.
    pub fn new(
        question_secs: u32,
        reveal_delay_ms: u32,
        max_tier: u32,
    ) -> Result<Self, QuizSettingsError> {
        if !(1..=600).contains(&question_secs) {
            return Err(QuizSettingsError::InvalidQuestionSecs);
        }
        if reveal_delay_ms > 10_000 {
            return Err(QuizSettingsError::InvalidRevealDelay);
        }
        Ok(Self {
            question_secs,
            reveal_delay_ms,
            max_tier,
        })
    }

    /// Seconds each question accepts an answer before locking on its own.
    #[must_use]
    pub fn question_secs(&self) -> u32 {
        self.question_secs
    }

    /// Pause between a lock and the next question, so the correct answer can be shown.
    #[must_use]
    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.reveal_delay_ms))
    }

    #[must_use]
    pub fn reveal_delay_ms(&self) -> u32 {
        self.reveal_delay_ms
    }

    #[must_use]
    pub fn max_tier(&self) -> u32 {
        self.max_tier
    }
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            question_secs: Self::DEFAULT_QUESTION_SECS,
            reveal_delay_ms: Self::DEFAULT_REVEAL_DELAY_MS,
            max_tier: DEFAULT_MAX_TIER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_quiz_screen() {
        let settings = QuizSettings::default();
        assert_eq!(settings.question_secs(), 30);
        assert_eq!(settings.reveal_delay(), Duration::from_secs(1));
        assert_eq!(settings.max_tier(), DEFAULT_MAX_TIER);
    }

    #[test]
    fn new_validates_ranges() {
        assert_eq!(
            QuizSettings::new(0, 1_000, 5).unwrap_err(),
            QuizSettingsError::InvalidQuestionSecs
        );
        assert_eq!(
            QuizSettings::new(30, 10_001, 5).unwrap_err(),
            QuizSettingsError::InvalidRevealDelay
        );
        assert!(QuizSettings::new(600, 0, 0).is_ok());
    }
}
