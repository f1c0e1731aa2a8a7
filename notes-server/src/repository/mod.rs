mod embedded;
mod memory;
mod postgres;

pub use memory::MemoryNoteStore;
pub use postgres::PgNoteStore;

use async_trait::async_trait;

use crate::models::{Note, NoteDraft};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("migration error: {0}")]
    Migration(#[from] refinery::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence contract consumed by the note service.
///
/// Implementations assign `id`, `created_at` and `updated_at` atomically with
/// the write that creates or modifies a row. `list` returns notes newest first
/// (`created_at` descending, ties broken by `id` descending).
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn insert(&self, draft: NoteDraft) -> Result<Note, StoreError>;

    async fn find(&self, id: i64) -> Result<Option<Note>, StoreError>;

    async fn list(&self) -> Result<Vec<Note>, StoreError>;

    /// Overwrites title and content and refreshes `updated_at` so that it is
    /// strictly greater than its previous value.
    async fn update(&self, id: i64, draft: NoteDraft) -> Result<Option<Note>, StoreError>;

    /// Returns `false` when no row had the given id.
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}
