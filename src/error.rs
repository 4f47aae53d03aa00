//! Client error types
//!
//! Every failure a user action can hit: local validation, a response the
//! backend rejected, no response at all, or a local persistence problem.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Message shown when the backend could not be reached.
pub const NETWORK_ERROR_MESSAGE: &str =
    "Network error. Please check your connection and try again.";

/// Errors returned by the session store, gateway and repository
#[derive(Error, Debug)]
pub enum ClientError {
    /// Input rejected before any request was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backend answered with a status the operation does not accept
    #[error("Request rejected ({status}): {body}")]
    Rejected {
        status: StatusCode,
        body: RejectionBody,
    },

    /// No response was received
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A success response carried a body we could not decode
    #[error("Decode error: {0}")]
    Decode(String),

    /// Token persistence failed
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// An authenticated call was attempted without a token
    #[error("Not authenticated")]
    NotAuthenticated,
}

impl ClientError {
    /// Human-readable message for the triggering action.
    ///
    /// `fallback` is used when a rejection body carries nothing presentable.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Validation(msg) => msg.clone(),
            ClientError::Rejected { body, .. } => {
                body.describe().unwrap_or_else(|| fallback.to_string())
            }
            ClientError::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            ClientError::NotAuthenticated => "Please log in first.".to_string(),
            ClientError::Decode(_) | ClientError::Storage(_) => fallback.to_string(),
        }
    }

    /// Whether the backend refused the credentials used for the call
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            ClientError::Rejected { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
        )
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

/// Body of a rejected response
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionBody {
    /// No body at all
    Empty,
    /// A plain string payload (raw text or a JSON string)
    Text(String),
    /// Any other JSON payload
    Json(Value),
}

impl RejectionBody {
    /// Classify a raw response body
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return RejectionBody::Empty;
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::String(s)) => RejectionBody::Text(s),
            Ok(value) => RejectionBody::Json(value),
            Err(_) => RejectionBody::Text(trimmed.to_string()),
        }
    }

    /// Render the body for display, or `None` when nothing presentable exists
    pub fn describe(&self) -> Option<String> {
        match self {
            RejectionBody::Empty => None,
            RejectionBody::Text(text) => Some(text.clone()),
            RejectionBody::Json(Value::Object(map)) => {
                if let Some(error) = map.get("error") {
                    return describe_error_field(error);
                }

                let pairs: Vec<String> = map
                    .iter()
                    .filter_map(|(field, messages)| {
                        flatten_messages(messages).map(|m| format!("{}: {}", field, m))
                    })
                    .collect();

                if pairs.is_empty() {
                    None
                } else {
                    Some(pairs.join(", "))
                }
            }
            RejectionBody::Json(_) => None,
        }
    }
}

impl std::fmt::Display for RejectionBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionBody::Empty => write!(f, "<empty>"),
            RejectionBody::Text(text) => write!(f, "{}", text),
            RejectionBody::Json(value) => write!(f, "{}", value),
        }
    }
}

fn describe_error_field(error: &Value) -> Option<String> {
    match error {
        Value::String(s) => Some(s.clone()),
        Value::Object(inner) => inner
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(error.to_string())),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn flatten_messages(messages: &Value) -> Option<String> {
    match messages {
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            Some(parts.join(" "))
        }
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
