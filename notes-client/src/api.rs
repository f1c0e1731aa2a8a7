//! Client adapter for the notes REST API.
//!
//! Every call gets a verb-dependent timeout, goes through
//! [`call_with_resilience`], and any final failure is classified into a
//! [`ClientError`] whose message can be shown to a user as is.

use std::time::Duration;

use reqwest::{
    Method, StatusCode,
    header::{ACCEPT, HeaderMap, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    config::{ClientConfig, Timeouts},
    model::{Envelope, ErrorBody, FieldErrors, Note, NoteDraft},
    resilience::{CallReport, RetryPolicy, TransportError, call_with_resilience},
};

pub const NOT_FOUND_MESSAGE: &str = "Resource not found";
pub const SERVER_ERROR_MESSAGE: &str = "Server error. Please try again later.";
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The server rejected the input field by field.
    #[error("{message}")]
    Validation {
        message: String,
        errors: FieldErrors,
    },

    /// The server answered with an error status.
    #[error("{message}")]
    Server { status: StatusCode, message: String },

    /// No response at all: the server is down or unreachable, or the call
    /// timed out.
    #[error("Cannot connect to server. Please check if the backend is running on {endpoint}")]
    Network { endpoint: String, timed_out: bool },

    #[error("{0}")]
    Other(String),
}

impl ClientError {
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

/// Turns the last failure of a call into a user-facing error. `endpoint` is
/// the configured API URL, named in network errors.
pub fn classify(error: TransportError, endpoint: &str) -> ClientError {
    match error {
        TransportError::Status { status, body } => {
            let body = body.unwrap_or_default();

            if let Some(errors) = body.errors.filter(|errors| !errors.is_empty()) {
                let message = errors
                    .values()
                    .flatten()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                return ClientError::Validation { message, errors };
            }

            let message = match body.message.filter(|m| !m.is_empty()) {
                Some(message) => message,
                None if status == StatusCode::NOT_FOUND => NOT_FOUND_MESSAGE.to_string(),
                None if status.is_server_error() => SERVER_ERROR_MESSAGE.to_string(),
                None => GENERIC_ERROR_MESSAGE.to_string(),
            };
            ClientError::Server { status, message }
        }
        TransportError::NoResponse(_) => ClientError::Network {
            endpoint: endpoint.to_string(),
            timed_out: false,
        },
        TransportError::Timeout(_) => ClientError::Network {
            endpoint: endpoint.to_string(),
            timed_out: true,
        },
        TransportError::Other(message) => ClientError::Other(message),
    }
}

/// Per-call settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallOptions {
    /// Overrides the verb-dependent timeout.
    pub timeout: Option<Duration>,
}

#[derive(Clone)]
pub struct NotesApi {
    client: reqwest::Client,
    base_url: String,
    timeouts: Timeouts,
    retry: RetryPolicy,
    defaults: CallOptions,
}

impl NotesApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            timeouts: config.timeouts,
            retry: config.retry.into(),
            defaults: CallOptions::default(),
        })
    }

    /// Uses `timeout` for every call made through the returned handle.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.defaults.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.base_url
    }

    pub async fn list(&self) -> Result<Envelope<Vec<Note>>, ClientError> {
        self.call(Method::GET, "/notes", None::<&()>).await
    }

    pub async fn get(&self, id: i64) -> Result<Envelope<Note>, ClientError> {
        self.call(Method::GET, &format!("/notes/{id}"), None::<&()>).await
    }

    pub async fn create(&self, draft: &NoteDraft) -> Result<Envelope<Note>, ClientError> {
        self.call(Method::POST, "/notes", Some(draft)).await
    }

    pub async fn update(&self, id: i64, draft: &NoteDraft) -> Result<Envelope<Note>, ClientError> {
        self.call(Method::PUT, &format!("/notes/{id}"), Some(draft)).await
    }

    pub async fn delete(&self, id: i64) -> Result<Envelope<()>, ClientError> {
        self.call(Method::DELETE, &format!("/notes/{id}"), None::<&()>).await
    }

    async fn call<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Envelope<T>, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let (result, report) = self.execute(method, path, body, self.defaults).await;
        if report.retries() > 0 {
            tracing::debug!("{} finished after {} attempt(s)", path, report.attempts);
        }
        result
    }

    /// Sends one logical request with retries and returns the decoded
    /// envelope along with what happened on the way.
    pub async fn execute<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        options: CallOptions,
    ) -> (Result<Envelope<T>, ClientError>, CallReport)
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let url = format!("{}{}", self.base_url, path);
        let timeout = options
            .timeout
            .unwrap_or_else(|| self.timeouts.for_method(&method));

        let (result, report) = call_with_resilience(&self.retry, || {
            self.attempt(method.clone(), &url, body, timeout)
        })
        .await;

        let result = result.map_err(|e| {
            tracing::error!(
                "{} {} failed after {} attempt(s): {}",
                method,
                url,
                report.attempts,
                e
            );
            classify(e, &self.base_url)
        });

        (result, report)
    }

    async fn attempt<T, B>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        timeout: Duration,
    ) -> Result<Envelope<T>, TransportError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        tracing::debug!("{} {} (timeout {:?})", method, url, timeout);

        let mut request = self.client.request(method, url).timeout(timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(timeout)
            } else {
                TransportError::NoResponse(e.to_string())
            }
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(timeout)
            } else {
                TransportError::Other(format!("failed to read response body: {e}"))
            }
        })?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status,
                body: serde_json::from_slice::<ErrorBody>(&bytes).ok(),
            });
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| TransportError::Other(format!("unexpected response from server: {e}")))
    }
}
