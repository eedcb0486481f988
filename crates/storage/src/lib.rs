#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{InMemoryScoreStore, ScoreStore, Storage, StorageError};
