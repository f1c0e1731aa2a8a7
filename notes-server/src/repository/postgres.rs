use async_trait::async_trait;
use tokio_postgres::{Client, NoTls, Row};

use super::{NoteStore, StoreError, embedded::migrations};
use crate::models::{Note, NoteDraft};

const NOTE_COLUMNS: &str = "id, title, content, created_at, updated_at";

pub struct PgNoteStore {
    client: Client,
}

impl PgNoteStore {
    pub async fn connect(database_dsn: &str) -> Result<Self, StoreError> {
        let (client, con) = tokio_postgres::connect(database_dsn, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = con.await {
                tracing::error!("connection error: {}", e);
            }
        });

        Ok(Self { client })
    }

    pub async fn migrate(&mut self) -> Result<(), StoreError> {
        let migrations_report = migrations::runner().run_async(&mut self.client).await?;

        for migration in migrations_report.applied_migrations() {
            tracing::info!(
                "Migration Applied -  Name: {}, Version: {}",
                migration.name(),
                migration.version()
            );
        }

        tracing::info!("DB migrations finished!");

        Ok(())
    }

    /// The connection task ends for good once the server drops it.
    fn client(&self) -> Result<&Client, StoreError> {
        if self.client.is_closed() {
            return Err(StoreError::Unavailable(
                "database connection is closed".to_string(),
            ));
        }
        Ok(&self.client)
    }
}

fn note_from_row(row: &Row) -> Note {
    Note {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl NoteStore for PgNoteStore {
    async fn insert(&self, draft: NoteDraft) -> Result<Note, StoreError> {
        let row = self
            .client()?
            .query_one(
                &format!(
                    "INSERT INTO notes (title, content) VALUES ($1, $2) RETURNING {NOTE_COLUMNS}"
                ),
                &[&draft.title, &draft.content],
            )
            .await?;

        Ok(note_from_row(&row))
    }

    async fn find(&self, id: i64) -> Result<Option<Note>, StoreError> {
        let row = self
            .client()?
            .query_opt(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1"),
                &[&id],
            )
            .await?;

        Ok(row.as_ref().map(note_from_row))
    }

    async fn list(&self) -> Result<Vec<Note>, StoreError> {
        let rows = self
            .client()?
            .query(
                &format!("SELECT {NOTE_COLUMNS} FROM notes ORDER BY created_at DESC, id DESC"),
                &[],
            )
            .await?;

        Ok(rows.iter().map(note_from_row).collect())
    }

    async fn update(&self, id: i64, draft: NoteDraft) -> Result<Option<Note>, StoreError> {
        // updated_at must move forward even when NOW() (transaction start) has not.
        let row = self
            .client()?
            .query_opt(
                &format!(
                    "UPDATE notes \
                     SET title = $1, content = $2, \
                         updated_at = GREATEST(NOW(), updated_at + INTERVAL '1 microsecond') \
                     WHERE id = $3 RETURNING {NOTE_COLUMNS}"
                ),
                &[&draft.title, &draft.content, &id],
            )
            .await?;

        Ok(row.as_ref().map(note_from_row))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let rows = self
            .client()?
            .execute("DELETE FROM notes WHERE id = $1", &[&id])
            .await?;

        Ok(rows == 1)
    }
}
