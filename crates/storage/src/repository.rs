use async_trait::async_trait;
use quiz_core::model::ScoreKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Single-slot persistence of the last completed quiz score.
///
/// Each key holds exactly one value; saving overwrites it. Nothing accumulates across
/// sessions.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Overwrite the score stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be written.
    async fn save_score(&self, key: &ScoreKey, score: u32) -> Result<(), StorageError>;

    /// Read the score stored under `key`, or `None` if nothing was ever saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn load_score(&self, key: &ScoreKey) -> Result<Option<u32>, StorageError>;
}

/// Simple in-memory score store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryScoreStore {
    scores: Arc<Mutex<HashMap<ScoreKey, u32>>>,
}

impl InMemoryScoreStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScoreStore for InMemoryScoreStore {
    async fn save_score(&self, key: &ScoreKey, score: u32) -> Result<(), StorageError> {
        let mut guard = self
            .scores
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.clone(), score);
        Ok(())
    }

    async fn load_score(&self, key: &ScoreKey) -> Result<Option<u32>, StorageError> {
        let guard = self
            .scores
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).copied())
    }
}

/// Holds the score store behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub scores: Arc<dyn ScoreStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let scores: Arc<dyn ScoreStore> = Arc::new(InMemoryScoreStore::new());
        Self { scores }
    }
}
