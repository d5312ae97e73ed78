//! Immutable endpoint configuration and header merging.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use std::time::Duration;

use crate::types::{EndpointConfig, Error, HeaderEntry, Result};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how requests are sent.
///
/// Assembled once and shared read-only (`Arc<Endpoint>`) by every request.
/// To change configuration, build a new `Endpoint` and a new mediator.
#[derive(Debug, Clone)]
pub struct Endpoint {
    base_url: Url,
    default_headers: HeaderMap,
    timeout: Duration,
}

impl Endpoint {
    /// Endpoint with no default headers and the default timeout.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::config(format!("invalid base url {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "base url {base_url} cannot carry a path"
            )));
        }
        Ok(Self {
            base_url,
            default_headers: HeaderMap::new(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn from_config(config: &EndpointConfig) -> Result<Self> {
        let endpoint = Self::new(&config.base_url)?.with_timeout(config.timeout);
        config
            .default_headers
            .iter()
            .try_fold(endpoint, |endpoint, HeaderEntry { name, value }| {
                endpoint.with_header(name, value)
            })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a default header; a later header with the same name replaces it.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let (name, value) = parse_header(name, value)?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Join a rendered address (`/...?...`) onto the base URL.
    pub fn url_for(&self, rendered: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}{rendered}"))
            .map_err(|e| Error::invalid_segment(rendered, format!("not a valid url path: {e}")))
    }
}

/// Merge call-level headers over defaults.
///
/// Defaults are applied first, then `overrides` in order. A later entry
/// replaces every earlier value with the same (case-insensitive) name.
pub fn merge_headers(defaults: &HeaderMap, overrides: &[(&str, &str)]) -> Result<HeaderMap> {
    let mut merged = defaults.clone();
    for (name, value) in overrides {
        let (name, value) = parse_header(name, value)?;
        merged.insert(name, value);
    }
    Ok(merged)
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    let header_value = HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    Ok((header_name, header_value))
}
