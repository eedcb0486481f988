//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use quiz_core::model::{QuestionBankError, SessionOutcomeError, SessionStatus};
use storage::repository::StorageError;

/// Errors emitted by quiz sessions and the services driving them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("invalid question bank: {0}")]
    InvalidQuestionBank(#[from] QuestionBankError),
    #[error("option {index} does not exist (question has {len} options)")]
    InvalidOption { index: usize, len: usize },
    #[error("session cannot be retried while {status:?}")]
    NotRetryable { status: SessionStatus },
    #[error("session has not finished")]
    NotFinished,
    #[error("failed to persist final score")]
    PersistenceWriteFailed(#[source] StorageError),
    #[error("quiz runner has stopped")]
    RunnerStopped,
    #[error(transparent)]
    Outcome(#[from] SessionOutcomeError),
}

/// Errors emitted while reading a question bank.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BankLoadError {
    #[error("failed to read question bank {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed question bank: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors emitted by `TierBadgeService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScoreServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}
