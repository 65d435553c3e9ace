use crate::models::{NewQnaEntry, QnaEntry, ScoredEntry};
use async_trait::async_trait;

mod memory;
mod postgres;

pub use memory::InMemoryQnaStore;
pub use postgres::PgQnaStore;

/// Data access for the `qna_library` table
#[async_trait]
pub trait QnaStore: Send + Sync {
    /// All entries ordered by id ascending
    async fn list(&self) -> Result<Vec<QnaEntry>, StorageError>;

    async fn insert(&self, entry: NewQnaEntry) -> Result<QnaEntry, StorageError>;

    /// Returns false when no row had that id
    async fn delete(&self, id: i64) -> Result<bool, StorageError>;

    /// Entries whose question scores above `min_score` against `question`,
    /// best first, at most `limit` of them.
    async fn find_similar(
        &self,
        question: &str,
        min_score: f32,
        limit: usize,
    ) -> Result<Vec<ScoredEntry>, StorageError>;

    async fn ping(&self) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid database configuration: {0}")]
    Configuration(String),

    #[error("Storage operation failed: {0}")]
    OperationFailed(String),
}
