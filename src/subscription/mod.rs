//! Polling/subscription engine over a process's live state.
//!
//! State machine:
//! ```text
//!   Idle ──start(i)──▶ Polling(i) ──stop()──▶ Idle
//!                       │    ▲
//!                       └────┘ start(j): old timer cancelled and joined first
//! ```
//! Every transition goes through one function holding the state lock, so at
//! most one timer task exists per engine. Each tick samples `live_state()` and
//! fans the result out to every active observer; a failed tick is logged and
//! reported to observers' `on_error`, and the timer keeps running.
//!
//! `wait_for` and `aggregate` read the source directly and are independent of
//! the timer.

mod observer;

pub use observer::{observer_fn, FnObserver, StateObserver, StateUpdate};

use chrono::Utc;
use futures::FutureExt;
use serde::Serialize;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::mediator::Representation;
use crate::process::ProcessViews;
use crate::types::{Error, Result, SubscriptionId};

use observer::Subscription;

/// Observable engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Polling { interval: Duration },
}

/// Result of [`PollingEngine::aggregate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    pub live_state: Representation,
    pub log: Representation,
    /// `None` when the best-effort cached-subtree fetch failed.
    pub cached: Option<Representation>,
}

enum PollState {
    Idle,
    Polling {
        interval: Duration,
        cancel: CancellationToken,
        task: JoinHandle<()>,
    },
}

enum Transition {
    Start(Duration),
    Stop,
}

/// State shared between the engine and its timer task.
struct Shared {
    source: Arc<dyn ProcessViews>,
    subscriptions: RwLock<Vec<Arc<Subscription>>>,
    ticks: AtomicU64,
}

impl Shared {
    /// Sample once and deliver. Returns the number of successful deliveries.
    async fn tick(&self) -> Result<usize> {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;

        match self.source.live_state().await {
            Ok(state) => {
                let update = StateUpdate {
                    tick,
                    observed_at: Utc::now(),
                    state,
                };
                Ok(self.deliver(&update).await)
            }
            Err(err) => {
                tracing::warn!(tick, error = %err, "live state poll failed");
                self.report(&err).await;
                Err(err)
            }
        }
    }

    async fn snapshot(&self) -> Vec<Arc<Subscription>> {
        self.subscriptions.read().await.clone()
    }

    async fn deliver(&self, update: &StateUpdate) -> usize {
        let mut delivered = 0;
        for subscription in self.snapshot().await {
            if !subscription.is_active() {
                continue;
            }
            let outcome = AssertUnwindSafe(subscription.observer.on_state(update))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => tracing::warn!(
                    subscription = %subscription.id,
                    tick = update.tick,
                    error = %err,
                    "observer rejected state update"
                ),
                Err(_) => tracing::warn!(
                    subscription = %subscription.id,
                    tick = update.tick,
                    "observer panicked during state delivery"
                ),
            }
        }
        delivered
    }

    async fn report(&self, err: &Error) {
        for subscription in self.snapshot().await {
            if !subscription.is_active() {
                continue;
            }
            let outcome = AssertUnwindSafe(subscription.observer.on_error(err))
                .catch_unwind()
                .await;
            if outcome.is_err() {
                tracing::warn!(
                    subscription = %subscription.id,
                    "observer panicked during error report"
                );
            }
        }
    }
}

/// Polls a process's live state and fans samples out to observers.
pub struct PollingEngine {
    shared: Arc<Shared>,
    state: Mutex<PollState>,
}

impl fmt::Debug for PollingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingEngine")
            .field("ticks", &self.shared.ticks.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl PollingEngine {
    pub fn new(source: Arc<dyn ProcessViews>) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                subscriptions: RwLock::new(Vec::new()),
                ticks: AtomicU64::new(0),
            }),
            state: Mutex::new(PollState::Idle),
        }
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Register an observer.
    pub async fn subscribe(&self, observer: impl StateObserver + 'static) -> SubscriptionId {
        self.subscribe_shared(Arc::new(observer)).await
    }

    /// Register an observer that is also held elsewhere.
    pub async fn subscribe_shared(&self, observer: Arc<dyn StateObserver>) -> SubscriptionId {
        let subscription = Arc::new(Subscription::new(observer));
        let id = subscription.id;

        let mut subscriptions = self.shared.subscriptions.write().await;
        subscriptions.push(subscription);
        tracing::debug!(subscription = %id, total = subscriptions.len(), "observer subscribed");

        id
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.shared.subscriptions.write().await;
        let Some(index) = subscriptions.iter().position(|s| s.id == id) else {
            return false;
        };
        subscriptions.remove(index).deactivate();
        tracing::debug!(subscription = %id, total = subscriptions.len(), "observer unsubscribed");
        true
    }

    pub async fn subscriber_count(&self) -> usize {
        self.shared.subscriptions.read().await.len()
    }

    // =========================================================================
    // Timer
    // =========================================================================

    /// Start polling every `interval`, replacing any running timer.
    pub async fn start(&self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(Error::config("polling interval must be greater than zero"));
        }
        self.transition(Transition::Start(interval)).await;
        Ok(())
    }

    /// Stop polling. A no-op when idle.
    pub async fn stop(&self) {
        self.transition(Transition::Stop).await;
    }

    /// Stop polling and drop every subscription.
    pub async fn shutdown(&self) {
        self.stop().await;
        let mut subscriptions = self.shared.subscriptions.write().await;
        for subscription in subscriptions.drain(..) {
            subscription.deactivate();
        }
    }

    pub async fn state(&self) -> EngineState {
        match &*self.state.lock().await {
            PollState::Idle => EngineState::Idle,
            PollState::Polling { interval, .. } => EngineState::Polling {
                interval: *interval,
            },
        }
    }

    /// Run one tick now, outside the timer.
    pub async fn poll_once(&self) -> Result<usize> {
        self.shared.tick().await
    }

    async fn transition(&self, transition: Transition) {
        let mut state = self.state.lock().await;

        if let PollState::Polling { cancel, task, interval } =
            std::mem::replace(&mut *state, PollState::Idle)
        {
            cancel.cancel();
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "polling task ended abnormally");
            }
            tracing::info!(interval_ms = interval.as_millis() as u64, "polling stopped");
        }

        if let Transition::Start(interval) = transition {
            let cancel = CancellationToken::new();
            let task = tokio::spawn(run_timer(
                Arc::clone(&self.shared),
                interval,
                cancel.clone(),
            ));
            *state = PollState::Polling {
                interval,
                cancel,
                task,
            };
            tracing::info!(interval_ms = interval.as_millis() as u64, "polling started");
        }
    }

    // =========================================================================
    // One-shot reads
    // =========================================================================

    /// Re-read live state until `predicate` holds.
    ///
    /// Makes at most `max_attempts` fetches, sleeping `interval` between them.
    /// A fetch error counts as a failed attempt, except on the final attempt
    /// where it is returned.
    pub async fn wait_for<P>(
        &self,
        predicate: P,
        max_attempts: u32,
        interval: Duration,
    ) -> Result<Representation>
    where
        P: Fn(&Representation) -> bool,
    {
        for attempt in 1..=max_attempts {
            match self.shared.source.live_state().await {
                Ok(state) if predicate(&state) => return Ok(state),
                Ok(_) => tracing::debug!(attempt, max_attempts, "predicate not met yet"),
                Err(err) if attempt == max_attempts => return Err(err),
                Err(err) => tracing::warn!(
                    attempt,
                    max_attempts,
                    error = %err,
                    "live state fetch failed while waiting"
                ),
            }
            if attempt < max_attempts {
                tokio::time::sleep(interval).await;
            }
        }

        Err(Error::PredicateNotMet {
            attempts: max_attempts,
        })
    }

    /// Fetch live state, log and cached subtree concurrently.
    ///
    /// The cached subtree is best-effort: its failure yields `cached: None`.
    pub async fn aggregate(&self) -> Result<Aggregate> {
        let source = &self.shared.source;
        let (live_state, log, cached) = tokio::join!(
            source.live_state(),
            source.log(),
            source.cached_subtree(None)
        );

        let cached = match cached {
            Ok(cached) => Some(cached),
            Err(err) => {
                tracing::debug!(error = %err, "cached subtree unavailable");
                None
            }
        };

        Ok(Aggregate {
            live_state: live_state?,
            log: log?,
            cached,
        })
    }
}

impl Drop for PollingEngine {
    fn drop(&mut self) {
        if let PollState::Polling { cancel, .. } = self.state.get_mut() {
            cancel.cancel();
        }
    }
}

async fn run_timer(shared: Arc<Shared>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            // Failures are already logged and reported inside tick().
            _ = shared.tick() => {}
        }
    }
}
