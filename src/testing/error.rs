//! Mock backend error responses
//!
//! Shapes mirror what the real backend sends: `detail` for auth failures,
//! `error` for operational failures, field-keyed lists for validation.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};

#[derive(Debug)]
pub(crate) enum MockError {
    Unauthorized,
    /// Field-keyed or `error` body
    BadRequest(Value),
    Forbidden(String),
    NotFound(String),
    Internal(String),
}

impl MockError {
    pub(crate) fn field(field: &str, message: &str) -> Self {
        let mut body = Map::new();
        body.insert(field.to_string(), json!([message]));
        MockError::BadRequest(Value::Object(body))
    }

    pub(crate) fn error(message: impl Into<String>) -> Self {
        MockError::BadRequest(json!({ "error": message.into() }))
    }
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            MockError::Unauthorized => (StatusCode::UNAUTHORIZED, json!({ "detail": "Invalid token" })),
            MockError::BadRequest(body) => (StatusCode::BAD_REQUEST, body),
            MockError::Forbidden(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            MockError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            MockError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg })),
        };

        (status, Json(body)).into_response()
    }
}

pub(crate) type MockResult<T> = Result<T, MockError>;
