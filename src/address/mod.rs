//! Request address construction.
//!
//! Address shape:
//! ```text
//! /[<prefix>]~<device>@<version>[/<segment>...][?<typed params>]
//! ```
//! Rendering is pure: every construction error surfaces here, before any
//! request is issued.

use std::fmt;

use crate::codec::{self, TypedValue};
use crate::types::{Error, Result};

/// Characters that may not appear inside a single segment.
const SEGMENT_RESERVED: &[char] = &['/', '?', '#'];

/// Characters that may not appear in a device name or version.
const DEVICE_RESERVED: &[char] = &['/', '?', '#', '~', '@'];

/// A request address against a named device.
///
/// Segment order is significant and preserved. Parameters render in insertion
/// order; adding a parameter whose name is already present replaces its value
/// in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    prefix: Option<String>,
    device: String,
    version: String,
    segments: Vec<String>,
    params: Vec<(String, TypedValue)>,
}

impl Address {
    pub fn new(device: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            prefix: None,
            device: device.into(),
            version: version.into(),
            segments: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Scope the device under a path prefix (e.g. a process id).
    pub fn under(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Append one segment.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Append several segments in order.
    pub fn segments<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.segments.extend(segments.into_iter().map(Into::into));
        self
    }

    /// Set a typed parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.params.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.params.push((name, value)),
        }
        self
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn path_segments(&self) -> &[String] {
        &self.segments
    }

    pub fn params(&self) -> &[(String, TypedValue)] {
        &self.params
    }

    /// Render the address as path plus query.
    pub fn render(&self) -> Result<String> {
        let mut out = String::from("/");
        if let Some(prefix) = &self.prefix {
            validate_segment(prefix)?;
            out.push_str(prefix);
        }
        out.push('~');
        out.push_str(&device_root(&self.device, &self.version)?);

        for segment in &self.segments {
            validate_segment(segment)?;
            out.push('/');
            out.push_str(segment);
        }

        if !self.params.is_empty() {
            out.push('?');
            out.push_str(&codec::encode_params(&self.params)?);
        }

        Ok(out)
    }
}

impl fmt::Display for Address {
    /// Best-effort rendering for logs; use [`Address::render`] to build requests.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Ok(rendered) => f.write_str(&rendered),
            Err(_) => write!(f, "~{}@{} (invalid)", self.device, self.version),
        }
    }
}

/// Build `<device>@<version>/<segments...>?<params>` without a prefix.
///
/// Unlike [`Address::param`], duplicate names in `params` are an error.
pub fn build<S: AsRef<str>>(
    device: &str,
    version: &str,
    segments: &[S],
    params: &[(String, TypedValue)],
) -> Result<String> {
    let mut out = device_root(device, version)?;

    for segment in segments {
        let segment = segment.as_ref();
        validate_segment(segment)?;
        out.push('/');
        out.push_str(segment);
    }

    if !params.is_empty() {
        out.push('?');
        out.push_str(&codec::encode_params(params)?);
    }

    Ok(out)
}

fn device_root(device: &str, version: &str) -> Result<String> {
    for part in [device, version] {
        if part.is_empty() || part.contains(DEVICE_RESERVED) {
            return Err(Error::invalid_segment(
                format!("{device}@{version}"),
                "device and version must be non-empty and free of '/', '?', '#', '~', '@'",
            ));
        }
    }
    Ok(format!("{device}@{version}"))
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(Error::invalid_segment(segment, "segment is empty"));
    }
    if let Some(c) = segment.chars().find(|c| SEGMENT_RESERVED.contains(c)) {
        return Err(Error::invalid_segment(
            segment,
            format!("segment contains '{c}'"),
        ));
    }
    Ok(())
}
