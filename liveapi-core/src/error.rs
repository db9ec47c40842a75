//! Error types for liveapi.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`LiveError`] - every failure a listener invocation can produce
//! - [`ValidationErrors`] - field-level schema failures
//! - [`ErrorReply`] - the classified `{status_code, detail}` pair sent to clients

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Detail sent when an authorization credential is absent or malformed.
pub const NOT_AUTHENTICATED: &str = "Not authenticated";

/// Detail sent when a required header is absent.
pub const HEADER_MISSING: &str = "Header is not present";

/// Detail sent for every unclassified failure.
pub const INTERNAL_ERROR: &str = "Internal Server Error";

/// Every failure a listener invocation can produce.
#[derive(Error, Debug)]
pub enum LiveError {
    /// An HTTP-style error carrying an explicit status code.
    #[error("status {status_code}: {detail}")]
    Http {
        /// Status-like code reported to the client.
        status_code: u16,
        /// Detail payload reported to the client.
        detail: Value,
    },

    /// The payload did not match the declared schema.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// The payload was not decodable as JSON.
    #[error("payload decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// Outbound data could not be serialized.
    #[error("failed to encode outbound data: {0}")]
    Encode(#[source] serde_json::Error),

    /// A request/response exchange did not complete in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The transport engine reported a failure.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// Dependency resolution nested deeper than allowed.
    #[error("dependency chain exceeded the depth limit of {0}")]
    DependencyDepth(usize),

    /// A callback asked for an argument that is missing or of another type.
    #[error("argument `{name}` is missing or is not a `{expected}`")]
    Argument {
        /// Parameter name.
        name: String,
        /// Requested type.
        expected: &'static str,
    },

    /// Any other error raised by a callback.
    #[error(transparent)]
    Callback(BoxError),
}

impl LiveError {
    /// Create an HTTP-style error with an explicit status code.
    pub fn http(status_code: u16, detail: impl Into<Value>) -> Self {
        Self::Http {
            status_code,
            detail: detail.into(),
        }
    }

    /// The 401 failure raised for missing or malformed credentials.
    pub fn not_authenticated() -> Self {
        Self::http(401, NOT_AUTHENTICATED)
    }

    /// The 422 failure raised for a missing required header.
    pub fn header_missing() -> Self {
        Self::http(422, HEADER_MISSING)
    }

    /// Wrap a transport failure.
    pub fn transport(err: impl Into<BoxError>) -> Self {
        Self::Transport(err.into())
    }

    /// Recover a typed error from a boxed callback error.
    ///
    /// Errors that started life as a [`LiveError`] keep their classification;
    /// bare `serde_json` errors become decode failures.
    pub fn from_boxed(err: BoxError) -> Self {
        let err = match err.downcast::<LiveError>() {
            Ok(live) => return *live,
            Err(err) => err,
        };
        match err.downcast::<serde_json::Error>() {
            Ok(json) => Self::Decode(*json),
            Err(err) => Self::Callback(err),
        }
    }

    /// The status-like code this error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Http { status_code, .. } => *status_code,
            Self::Validation(_) | Self::Decode(_) => 422,
            _ => 500,
        }
    }

    /// Classify this error into the payload sent to the client.
    pub fn reply(&self) -> ErrorReply {
        let detail = match self {
            Self::Http { detail, .. } => detail.clone(),
            Self::Validation(errors) => errors.to_detail(),
            Self::Decode(err) => Value::String(format!("JSON Serializer Error: {err}")),
            _ => Value::String(INTERNAL_ERROR.to_owned()),
        };
        ErrorReply {
            status_code: self.status_code(),
            detail,
        }
    }
}

/// The classified `{status_code, detail}` body sent on the error event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReply {
    /// Status-like code.
    pub status_code: u16,
    /// Detail payload.
    pub detail: Value,
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Failure category (`missing`, `type_error`, `value_error`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Path to the failing field.
    pub loc: Vec<String>,
    /// Human readable message.
    pub msg: String,
}

impl FieldError {
    /// Create a new field error.
    pub fn new(kind: impl Into<String>, loc: Vec<String>, msg: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            loc,
            msg: msg.into(),
        }
    }
}

/// A list of field-level schema failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Create from a list of field errors.
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Get the field errors.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Consume into the field errors.
    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }

    /// Build from a path-tracking deserialization failure.
    pub fn from_path_error(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        let mut loc: Vec<String> = err
            .path()
            .iter()
            .filter_map(|segment| match segment {
                serde_path_to_error::Segment::Seq { index } => Some(index.to_string()),
                serde_path_to_error::Segment::Map { key } => Some(key.clone()),
                serde_path_to_error::Segment::Enum { variant } => Some(variant.clone()),
                serde_path_to_error::Segment::Unknown => None,
            })
            .collect();

        // serde_json appends the position for text input.
        let message = err.inner().to_string();
        let msg = message
            .split(" at line ")
            .next()
            .unwrap_or(&message)
            .to_owned();

        let kind = if let Some(field) = missing_field(&msg) {
            loc.push(field.to_owned());
            "missing"
        } else if msg.starts_with("invalid type") {
            "type_error"
        } else {
            "value_error"
        };

        Self::new(vec![FieldError::new(kind, loc, msg)])
    }

    fn to_detail(&self) -> Value {
        Value::Array(
            self.errors
                .iter()
                .map(|e| json!({ "type": e.kind, "loc": e.loc, "msg": e.msg }))
                .collect(),
        )
    }
}

fn missing_field(msg: &str) -> Option<&str> {
    msg.strip_prefix("missing field `")?.strip_suffix('`')
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "; {}: {}", error.loc.join("."), error.msg)?;
        }
        Ok(())
    }
}
