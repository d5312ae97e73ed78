//! Process handle: a narrow view of the mediator scoped to one process.
//!
//! Views map onto the process device:
//! ```text
//! live state     GET  /<id>~process@1.0/now
//! cached state   GET  /<id>~process@1.0/compute
//! log            GET  /<id>~process@1.0/schedule
//! cached subtree GET  /<id>~process@1.0/compute/cache[/<path>]
//! submit         POST /<id>~process@1.0/schedule   (Action: <name>)
//! ```
//! `submit` confirms acceptance only. The effect becomes visible in later
//! reads of `now`/`compute`; the log, not the client, orders writes.

use async_trait::async_trait;
use std::sync::Arc;

use crate::address::Address;
use crate::mediator::{Endpoint, Representation, RequestBody, RequestMediator};
use crate::types::{Error, ProcessId, Result};

/// Device name of the process device.
pub const PROCESS_DEVICE: &str = "process";
/// Version of the process device.
pub const PROCESS_VERSION: &str = "1.0";
/// Header carrying the action name of a write.
pub const ACTION_HEADER: &str = "Action";
/// Region of the cached view published by the process.
pub const CACHE_REGION: &str = "cache";

/// A canonical view of a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessView {
    Live,
    Cached,
    Log,
    CachedSubtree(Option<String>),
}

impl ProcessView {
    fn segments(&self) -> Vec<String> {
        match self {
            Self::Live => vec!["now".to_string()],
            Self::Cached => vec!["compute".to_string()],
            Self::Log => vec!["schedule".to_string()],
            Self::CachedSubtree(path) => {
                let mut segments = vec!["compute".to_string(), CACHE_REGION.to_string()];
                if let Some(path) = path {
                    segments.extend(path.trim_matches('/').split('/').map(str::to_string));
                }
                segments
            }
        }
    }
}

/// A process identifier bound to an endpoint.
///
/// Addresses are derived on demand; the same reference and view always
/// render the same address.
#[derive(Debug, Clone)]
pub struct ProcessRef {
    id: ProcessId,
    endpoint: Arc<Endpoint>,
}

impl ProcessRef {
    pub fn new(id: ProcessId, endpoint: Arc<Endpoint>) -> Self {
        Self { id, endpoint }
    }

    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    pub fn endpoint(&self) -> &Arc<Endpoint> {
        &self.endpoint
    }

    pub fn address(&self, view: &ProcessView) -> Address {
        Address::new(PROCESS_DEVICE, PROCESS_VERSION)
            .under(self.id.as_str())
            .segments(view.segments())
    }
}

/// Read access to the views of a process.
///
/// The polling engine samples through this trait so it can run against any
/// source of process state.
#[async_trait]
pub trait ProcessViews: Send + Sync {
    /// Most recent accepted writes applied; most expensive.
    async fn live_state(&self) -> Result<Representation>;

    /// Cheaper view that may lag `live_state`.
    async fn cached_state(&self) -> Result<Representation>;

    /// Ordered record of accepted writes.
    async fn log(&self) -> Result<Representation>;

    /// A region of the cached view; `None` returns the whole region.
    async fn cached_subtree(&self, path: Option<&str>) -> Result<Representation>;
}

/// Process handle over a request mediator.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    process: ProcessRef,
    mediator: RequestMediator,
}

impl ProcessHandle {
    pub fn new(id: ProcessId, mediator: RequestMediator) -> Self {
        let process = ProcessRef::new(id, Arc::clone(mediator.endpoint()));
        Self { process, mediator }
    }

    pub fn id(&self) -> &ProcessId {
        self.process.id()
    }

    pub fn process_ref(&self) -> &ProcessRef {
        &self.process
    }

    /// Read one view.
    pub async fn view(&self, view: ProcessView) -> Result<Representation> {
        let address = self.process.address(&view);
        self.mediator.get(&address).await
    }

    /// Submit a write; `action` travels as the `Action` header.
    ///
    /// Success means the node accepted the write for processing, not that it
    /// has been applied.
    pub async fn submit(
        &self,
        action: &str,
        payload: impl Into<RequestBody>,
        extra_headers: &[(&str, &str)],
    ) -> Result<Representation> {
        if action.is_empty() {
            return Err(Error::InvalidHeader {
                name: ACTION_HEADER.to_string(),
                reason: "action name is empty".to_string(),
            });
        }

        let mut headers = extra_headers.to_vec();
        headers.push((ACTION_HEADER, action));

        let address = self.process.address(&ProcessView::Log);
        tracing::debug!(process = %self.id(), action, "submitting write");
        self.mediator
            .post(&address, Some(payload.into()), &headers)
            .await
    }
}

#[async_trait]
impl ProcessViews for ProcessHandle {
    async fn live_state(&self) -> Result<Representation> {
        self.view(ProcessView::Live).await
    }

    async fn cached_state(&self) -> Result<Representation> {
        self.view(ProcessView::Cached).await
    }

    async fn log(&self) -> Result<Representation> {
        self.view(ProcessView::Log).await
    }

    async fn cached_subtree(&self, path: Option<&str>) -> Result<Representation> {
        self.view(ProcessView::CachedSubtree(path.map(str::to_string)))
            .await
    }
}
