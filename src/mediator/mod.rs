//! Request mediation against a node endpoint.
//!
//! One call to [`RequestMediator::send`] is exactly one HTTP exchange:
//! - construction errors (address, headers, body) surface before any I/O
//! - the endpoint timeout bounds the whole exchange, body included
//! - non-2xx statuses fail as `RequestFailed` without reading the body
//! - a JSON content kind is parsed, anything else is returned as UTF-8 text
//!
//! Retrying is left to callers (see [`crate::subscription`]).

mod endpoint;
mod representation;

pub use endpoint::{merge_headers, Endpoint, DEFAULT_TIMEOUT};
pub use representation::{declares_structured, Representation, RequestBody};

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Url};
use std::sync::Arc;
use std::time::Instant;

use crate::address::Address;
use crate::types::{Error, Result};

/// Issues requests against one endpoint and normalizes the outcome.
#[derive(Debug, Clone)]
pub struct RequestMediator {
    endpoint: Arc<Endpoint>,
    client: reqwest::Client,
}

impl RequestMediator {
    pub fn new(endpoint: Endpoint) -> Result<Self> {
        Self::shared(Arc::new(endpoint))
    }

    /// Build a mediator over an already-shared endpoint.
    pub fn shared(endpoint: Arc<Endpoint>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(endpoint.timeout())
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("devpath-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &Arc<Endpoint> {
        &self.endpoint
    }

    pub async fn get(&self, address: &Address) -> Result<Representation> {
        self.send(Method::GET, address, None, &[]).await
    }

    pub async fn post(
        &self,
        address: &Address,
        body: Option<RequestBody>,
        headers: &[(&str, &str)],
    ) -> Result<Representation> {
        self.send(Method::POST, address, body, headers).await
    }

    /// Send one request and negotiate the response representation.
    ///
    /// A body claimed as JSON must parse, except that an empty success body
    /// is always `Representation::Empty` whatever its content type. Any other
    /// body must be valid UTF-8 and is returned as text.
    pub async fn send(
        &self,
        method: Method,
        address: &Address,
        body: Option<RequestBody>,
        headers: &[(&str, &str)],
    ) -> Result<Representation> {
        let rendered = address.render()?;
        let url = self.endpoint.url_for(&rendered)?;
        let mut merged = merge_headers(self.endpoint.default_headers(), headers)?;

        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            if !merged.contains_key(CONTENT_TYPE) {
                merged.insert(CONTENT_TYPE, body.content_type());
            }
            request = request.body(body.into_bytes()?);
        }
        let request = request.headers(merged);

        tracing::debug!(method = %method, url = %url, "sending request");
        let started = Instant::now();

        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(&url, e))?;

        let status = response.status();
        tracing::debug!(
            method = %method,
            url = %url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "response received"
        );

        if !status.is_success() {
            return Err(Error::RequestFailed {
                url: url.to_string(),
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let structured = declares_structured(response.headers());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(&url, e))?;

        if bytes.is_empty() {
            return Ok(Representation::Empty);
        }

        if structured {
            serde_json::from_slice(&bytes)
                .map(Representation::Structured)
                .map_err(|e| Error::malformed_response(url.as_str(), e.to_string()))
        } else {
            String::from_utf8(bytes.to_vec())
                .map(Representation::Text)
                .map_err(|e| Error::malformed_response(url.as_str(), e.to_string()))
        }
    }

    fn transport_error(&self, url: &Url, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                url: url.to_string(),
                timeout: self.endpoint.timeout(),
            }
        } else {
            Error::Unreachable {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }
}
