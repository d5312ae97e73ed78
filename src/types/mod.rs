//! Core types for the device-path client.
//!
//! This module provides foundational types used throughout the crate:
//! - **IDs**: Strongly-typed identifiers (ProcessId, SubscriptionId)
//! - **Errors**: Client error types with thiserror derives
//! - **Config**: Endpoint, polling and observability configuration

mod config;
mod errors;
mod ids;

pub use config::{ClientConfig, EndpointConfig, HeaderEntry, ObservabilityConfig, PollingConfig};
pub use errors::{Error, Result};
pub use ids::{ProcessId, SubscriptionId};
