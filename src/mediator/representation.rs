//! Negotiated response bodies.

use bytes::Bytes;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use std::fmt;

/// A successful response, shaped by its declared content kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Representation {
    /// The response declared a JSON content kind and parsed.
    Structured(serde_json::Value),
    /// Any other content kind, as text.
    Text(String),
    /// A successful response with no body.
    Empty,
}

impl Representation {
    pub fn as_structured(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Structured(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Look up a JSON pointer (`/a/b/0`) in a structured body.
    pub fn pointer(&self, pointer: &str) -> Option<&serde_json::Value> {
        self.as_structured().and_then(|value| value.pointer(pointer))
    }

    pub fn into_structured(self) -> Option<serde_json::Value> {
        match self {
            Self::Structured(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structured(value) => match serde_json::to_string_pretty(value) {
                Ok(pretty) => f.write_str(&pretty),
                Err(_) => write!(f, "{value}"),
            },
            Self::Text(text) => f.write_str(text),
            Self::Empty => Ok(()),
        }
    }
}

/// A request body and the content type it is sent with.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(serde_json::Value),
    Text(String),
    Bytes(Bytes),
}

impl RequestBody {
    pub fn content_type(&self) -> HeaderValue {
        match self {
            Self::Json(_) => HeaderValue::from_static("application/json"),
            Self::Text(_) => HeaderValue::from_static("text/plain; charset=utf-8"),
            Self::Bytes(_) => HeaderValue::from_static("application/octet-stream"),
        }
    }

    pub(crate) fn into_bytes(self) -> crate::types::Result<Bytes> {
        Ok(match self {
            Self::Json(value) => Bytes::from(serde_json::to_vec(&value)?),
            Self::Text(text) => Bytes::from(text),
            Self::Bytes(bytes) => bytes,
        })
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Whether a response header map declares a structured (JSON) body.
pub fn declares_structured(headers: &reqwest::header::HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(is_structured_media_type)
        .unwrap_or(false)
}

fn is_structured_media_type(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    media_type == "application/json" || media_type.ends_with("+json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_media_types() {
        assert!(is_structured_media_type("application/json"));
        assert!(is_structured_media_type("Application/JSON; charset=utf-8"));
        assert!(is_structured_media_type("application/problem+json"));
        assert!(!is_structured_media_type("text/plain"));
        assert!(!is_structured_media_type("text/json-ish"));
        assert!(!is_structured_media_type(""));
    }

    #[test]
    fn test_pointer_into_structured() {
        let rep = Representation::Structured(json!({"cache": {"count": 3}}));
        assert_eq!(rep.pointer("/cache/count"), Some(&json!(3)));
        assert_eq!(Representation::Text("x".into()).pointer("/cache"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Representation::Text("hi".into()).to_string(), "hi");
        assert_eq!(Representation::Empty.to_string(), "");
        assert_eq!(
            Representation::Structured(json!({"a": 1})).to_string(),
            "{\n  \"a\": 1\n}"
        );
    }

    #[test]
    fn test_body_content_types() {
        assert_eq!(
            RequestBody::from(json!({})).content_type(),
            "application/json"
        );
        assert_eq!(
            RequestBody::from("x").content_type(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(
            RequestBody::from(json!({"a": 1})).into_bytes().unwrap(),
            Bytes::from_static(b"{\"a\":1}")
        );
    }
}
