use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use crate::repository::{ScoreStore, StorageError};
use quiz_core::model::ScoreKey;

use super::SqliteRepository;

#[async_trait]
impl ScoreStore for SqliteRepository {
    async fn save_score(&self, key: &ScoreKey, score: u32) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO scores (key, score, saved_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                score = excluded.score,
                saved_at = excluded.saved_at
            ",
        )
        .bind(key.as_str())
        .bind(i64::from(score))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn load_score(&self, key: &ScoreKey) -> Result<Option<u32>, StorageError> {
        let row = sqlx::query("SELECT score FROM scores WHERE key = ?1")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let score: i64 = row
            .try_get("score")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        u32::try_from(score)
            .map(Some)
            .map_err(|err| StorageError::Serialization(err.to_string()))
    }
}
