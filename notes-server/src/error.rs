//! Failure taxonomy of the HTTP layer and the normalizer that turns every
//! error response under `/api` into an [`Envelope`].

use std::any::Any;

use axum::{
    body::{self, Body},
    extract::{FromRequestParts, Path, Request, State, rejection::JsonRejection},
    http::{StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    envelope::{self, Envelope, FieldErrors},
    service::NoteError,
};

pub const VALIDATION_FAILED: &str = "Validation failed";
pub const RESOURCE_NOT_FOUND: &str = "Resource not found";
pub const INTERNAL_SERVER_ERROR: &str = "Internal server error";
pub const GENERIC_FAILURE: &str = "An error occurred";

/// Framework bodies larger than this are not worth echoing back as a message.
const MAX_FRAMEWORK_BODY: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("resource not found")]
    NotFound,

    /// Failure that carries its own status, e.g. an extractor rejection.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("{0}")]
    Internal(String),
}

impl From<NoteError> for ApiError {
    fn from(e: NoteError) -> Self {
        match e {
            NoteError::Validation(errors) => Self::Validation(errors),
            NoteError::NotFound => Self::NotFound,
            NoteError::Store(e) => {
                tracing::error!("note store failure: {e}");
                Self::Internal(e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

/// What went wrong with a request, before the mapping policy is applied.
///
/// Travels from [`ApiError::into_response`] to [`normalize_errors`] as a
/// response extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub status: StatusCode,
    pub message: String,
    pub errors: Option<FieldErrors>,
}

impl Failure {
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            errors: None,
        }
    }

    /// Maps the failure to its outbound status and envelope. First match wins:
    /// field errors, then not-found, then the failure's own status.
    pub fn normalize(self, debug: bool) -> (StatusCode, Envelope<()>) {
        if let Some(errors) = self.errors {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Envelope::failure(VALIDATION_FAILED, Some(errors)),
            );
        }

        if self.status == StatusCode::NOT_FOUND {
            return (
                StatusCode::NOT_FOUND,
                Envelope::failure(RESOURCE_NOT_FOUND, None),
            );
        }

        let message = if !debug && self.status == StatusCode::INTERNAL_SERVER_ERROR {
            INTERNAL_SERVER_ERROR.to_string()
        } else if self.message.trim().is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            self.message
        };

        (self.status, Envelope::failure(message, None))
    }
}

impl From<ApiError> for Failure {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Validation(errors) => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                message: VALIDATION_FAILED.to_string(),
                errors: Some(errors),
            },
            ApiError::NotFound => Self::from_status(StatusCode::NOT_FOUND, RESOURCE_NOT_FOUND),
            ApiError::Rejected { status, message } => Self::from_status(status, message),
            ApiError::Internal(message) => {
                Self::from_status(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let failure = Failure::from(self);
        let mut response = failure.status.into_response();
        response.extensions_mut().insert(failure);
        response
    }
}

/// Settings of the `/api` error normalizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorPolicy {
    /// Expose the message of 500 failures instead of a generic one.
    pub debug: bool,
}

/// Middleware for the `/api` router: every 4xx/5xx response leaves as an
/// envelope, whether it came from a handler or from axum itself (unmatched
/// route, wrong method, body rejection).
pub async fn normalize_errors(
    State(policy): State<ErrorPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let failure = match parts.extensions.remove::<Failure>() {
        Some(failure) => failure,
        None => framework_failure(status, body).await,
    };

    if failure.status.is_server_error() {
        tracing::warn!("request failed with {}: {}", failure.status, failure.message);
    }

    let (status, envelope) = failure.normalize(policy.debug);
    let mut normalized = envelope::respond(status, envelope);
    if let Some(allow) = parts.headers.remove(header::ALLOW) {
        normalized.headers_mut().insert(header::ALLOW, allow);
    }
    normalized
}

async fn framework_failure(status: StatusCode, body: Body) -> Failure {
    let text = body::to_bytes(body, MAX_FRAMEWORK_BODY)
        .await
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
        .unwrap_or_default();

    let message = if text.is_empty() {
        status.canonical_reason().unwrap_or_default().to_string()
    } else {
        text
    };

    Failure::from_status(status, message)
}

/// Fallback of the `/api` router.
pub async fn route_not_found() -> ApiError {
    ApiError::NotFound
}

/// Response for a handler that panicked; installed with
/// `CatchPanicLayer::custom`.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");

    tracing::error!("request handler panicked: {detail}");
    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}

/// Note id taken from the path. An id that does not parse cannot name an
/// existing note, so it is rejected as not found.
#[derive(Debug, Clone, Copy)]
pub struct NoteId(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for NoteId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::NotFound)?;
        Ok(Self(id))
    }
}
