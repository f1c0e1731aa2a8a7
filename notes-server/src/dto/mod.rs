use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::models::Note;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NoteResponse {
    /// Note ID
    pub id: i64,
    /// Note title
    pub title: String,
    /// Note content
    pub content: String,
    /// Creation time (RFC 3339)
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time (RFC 3339)
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            title: note.title,
            content: note.content,
            created_at: Some(note.created_at),
            updated_at: Some(note.updated_at),
        }
    }
}

/// Body of create and update requests.
///
/// Fields are kept as raw JSON values so that a missing field or one of the
/// wrong type is reported as a validation failure instead of a body parsing
/// error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NoteRequest {
    /// Note title, at most 255 characters
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "My Note")]
    pub title: Option<Value>,
    /// Note content
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "Note content")]
    pub content: Option<Value>,
}
