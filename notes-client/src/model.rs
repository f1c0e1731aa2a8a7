use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

pub const TITLE_MAX_CHARS: usize = 255;

impl NoteDraft {
    /// Same rules the server applies, checked before anything is sent. Returns
    /// the trimmed draft or the messages joined the way server field errors
    /// are shown.
    pub fn checked(self) -> Result<Self, String> {
        let title = self.title.trim().to_string();
        let content = self.content.trim().to_string();
        let mut messages = Vec::new();

        if title.is_empty() {
            messages.push("The title field is required.".to_string());
        } else if title.chars().count() > TITLE_MAX_CHARS {
            messages.push(format!(
                "The title field must not be greater than {TITLE_MAX_CHARS} characters."
            ));
        }
        if content.is_empty() {
            messages.push("The content field is required.".to_string());
        }

        if messages.is_empty() {
            Ok(Self { title, content })
        } else {
            Err(messages.join(", "))
        }
    }
}

/// Successful `{success, message?, data?}` response body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

/// Whatever could be read from the body of an error response. Every part is
/// optional since proxies in front of the server answer with their own
/// bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<FieldErrors>,
}
