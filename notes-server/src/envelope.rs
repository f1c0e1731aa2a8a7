//! The `{success, message?, data?, errors?}` wrapper shared by every `/api`
//! response. Handlers and the error normalizer both go through [`respond`].

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Field name to the list of messages describing why it was rejected.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl<T> Envelope<T> {
    pub const fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            errors: None,
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            errors: None,
        }
    }
}

impl Envelope<()> {
    /// Successful outcome that carries only an acknowledgement.
    pub fn acknowledge(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            errors: None,
        }
    }

    pub fn failure(message: impl Into<String>, errors: Option<FieldErrors>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            errors,
        }
    }
}

pub fn respond<T: Serialize>(status: StatusCode, envelope: Envelope<T>) -> Response {
    (status, Json(envelope)).into_response()
}
