//! Observers and the subscription registry entries that own them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::mediator::Representation;
use crate::types::{Error, Result, SubscriptionId};

/// One sample of a process's live state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateUpdate {
    /// Engine tick that produced the sample (starts at 1).
    pub tick: u64,
    pub observed_at: DateTime<Utc>,
    pub state: Representation,
}

/// Receives live-state samples from a polling engine.
///
/// Each call is isolated: an error or panic in one observer is logged and
/// does not affect delivery to the others.
#[async_trait]
pub trait StateObserver: Send + Sync {
    async fn on_state(&self, update: &StateUpdate) -> Result<()>;

    /// Called when a tick fails to fetch live state.
    async fn on_error(&self, _error: &Error) {}
}

/// Adapts a closure into a [`StateObserver`].
pub struct FnObserver<F>(F);

impl<F> fmt::Debug for FnObserver<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnObserver").finish_non_exhaustive()
    }
}

/// Wrap a closure as an observer.
pub fn observer_fn<F>(f: F) -> FnObserver<F>
where
    F: Fn(&StateUpdate) -> Result<()> + Send + Sync,
{
    FnObserver(f)
}

#[async_trait]
impl<F> StateObserver for FnObserver<F>
where
    F: Fn(&StateUpdate) -> Result<()> + Send + Sync,
{
    async fn on_state(&self, update: &StateUpdate) -> Result<()> {
        (self.0)(update)
    }
}

/// A registered observer plus its liveness flag.
pub(crate) struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) observer: Arc<dyn StateObserver>,
    active: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(observer: Arc<dyn StateObserver>) -> Self {
        Self {
            id: SubscriptionId::new(),
            observer,
            active: AtomicBool::new(true),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Mark inactive so an in-flight delivery round skips it.
    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
