//! # Devpath Client - Device-Path Node Client
//!
//! Client for nodes that expose computation through path-like addresses
//! resolved against named devices:
//! - Typed-value codec for `name+type=value` request parameters
//! - Address builder for `/<prefix>~<device>@<version>/<segments>?<params>`
//! - Request mediation with timeouts, content negotiation and uniform errors
//! - Process handles over the live, cached, log and cached-subtree views
//! - Polling engine that turns a process's live state into change notifications
//!
//! ## Architecture
//!
//! ```text
//!   TypedValue ─▶ Address ─▶ RequestMediator ─▶ ProcessHandle ─▶ PollingEngine
//!    (codec)     (address)     (mediator)         (process)      (subscription)
//!                                   │
//!                              Arc<Endpoint>  (immutable, shared)
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod address;
pub mod client;
pub mod codec;
pub mod mediator;
pub mod process;
pub mod subscription;
pub mod types;

// Internal utilities
pub mod observability;

pub use address::Address;
pub use client::NodeClient;
pub use codec::TypedValue;
pub use mediator::{Endpoint, Representation, RequestBody, RequestMediator};
pub use process::{ProcessHandle, ProcessRef, ProcessView, ProcessViews};
pub use subscription::{observer_fn, Aggregate, EngineState, PollingEngine, StateObserver, StateUpdate};
pub use types::{ClientConfig, Error, ProcessId, Result, SubscriptionId};
