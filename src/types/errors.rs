//! Client error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and carry
//! enough context (offending value, URL, status) to diagnose a failure without
//! re-running under verbose tracing.

use std::time::Duration;
use thiserror::Error;

/// Client result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the device-path client.
#[derive(Error, Debug)]
pub enum Error {
    /// A value has no unambiguous wire form (local, never retried).
    #[error("cannot encode parameter '{name}' value {value:?}: {reason}")]
    UnencodableValue {
        name: String,
        value: String,
        reason: String,
    },

    /// A mapping or parameter list repeats a key (local, never retried).
    #[error("duplicate key '{key}' in '{name}'")]
    DuplicateKey { name: String, key: String },

    /// An address segment is empty or contains a reserved separator.
    #[error("invalid address segment {segment:?}: {reason}")]
    InvalidSegment { segment: String, reason: String },

    /// A parameter name cannot appear in a request address.
    #[error("invalid parameter name {name:?}")]
    InvalidParamName { name: String },

    /// A header name or value cannot be sent.
    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    /// A typed literal does not parse as its declared type.
    #[error("parameter '{name}' declared {expected} but got {literal:?}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        literal: String,
    },

    /// A wire parameter does not have the `name[+type]=value` shape.
    #[error("malformed parameter {input:?}: {reason}")]
    MalformedParam { input: String, reason: String },

    /// The request exceeded the endpoint timeout.
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// The node answered with a non-success status.
    #[error("request to {url} failed: {status} {status_text}")]
    RequestFailed {
        url: String,
        status: u16,
        status_text: String,
    },

    /// A response claimed to be structured but did not parse.
    #[error("malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    /// The node could not be reached (connect/DNS/body transport failures).
    #[error("node unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// `wait_for` exhausted its attempts.
    #[error("predicate not met after {attempts} attempts")]
    PredicateNotMet { attempts: u32 },

    /// An observer rejected a state update.
    #[error("observer failed: {0}")]
    ObserverFailed(String),

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Request-construction errors. These are raised before any I/O.
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            Error::UnencodableValue { .. }
                | Error::DuplicateKey { .. }
                | Error::InvalidSegment { .. }
                | Error::InvalidParamName { .. }
                | Error::InvalidHeader { .. }
        )
    }

    /// Transport errors surfaced by the request mediator.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Timeout { .. }
                | Error::RequestFailed { .. }
                | Error::MalformedResponse { .. }
                | Error::Unreachable { .. }
        )
    }

    /// HTTP status for `RequestFailed`, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// Convenience constructors
impl Error {
    pub fn unencodable(
        name: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnencodableValue {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn duplicate_key(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::DuplicateKey {
            name: name.into(),
            key: key.into(),
        }
    }

    pub fn invalid_segment(segment: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSegment {
            segment: segment.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed_param(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedParam {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed_response(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn observer(msg: impl Into<String>) -> Self {
        Self::ObserverFailed(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
