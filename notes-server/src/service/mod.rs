mod validation;

use crate::{
    dto::{NoteRequest, NoteResponse},
    envelope::FieldErrors,
    repository::{NoteStore, StoreError},
};

use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    #[error("validation failed for {} field(s)", .0.len())]
    Validation(FieldErrors),

    #[error("note not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct NoteService {
    store: Arc<dyn NoteStore>,
}

impl NoteService {
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self { store }
    }

    pub async fn create_note(&self, request: NoteRequest) -> Result<NoteResponse, NoteError> {
        let draft = validation::validate(request).map_err(NoteError::Validation)?;
        let note = self.store.insert(draft).await?;

        tracing::info!("created note {}", note.id);
        Ok(note.into())
    }

    pub async fn update_note(
        &self,
        id: i64,
        request: NoteRequest,
    ) -> Result<NoteResponse, NoteError> {
        // A missing note is reported as such whatever the body holds.
        if self.store.find(id).await?.is_none() {
            return Err(NoteError::NotFound);
        }
        let draft = validation::validate(request).map_err(NoteError::Validation)?;

        self.store
            .update(id, draft)
            .await?
            .map(NoteResponse::from)
            .ok_or(NoteError::NotFound)
    }

    pub async fn delete_note(&self, id: i64) -> Result<(), NoteError> {
        if self.store.delete(id).await? {
            tracing::info!("deleted note {}", id);
            Ok(())
        } else {
            Err(NoteError::NotFound)
        }
    }

    pub async fn get_one_note(&self, id: i64) -> Result<NoteResponse, NoteError> {
        self.store
            .find(id)
            .await?
            .map(NoteResponse::from)
            .ok_or(NoteError::NotFound)
    }

    pub async fn get_all_notes(&self) -> Result<Vec<NoteResponse>, NoteError> {
        Ok(self
            .store
            .list()
            .await?
            .into_iter()
            .map(NoteResponse::from)
            .collect())
    }
}
