//! Node client facade.
//!
//! Bundles one mediator and hands out process handles and polling engines
//! that share its endpoint.

use std::sync::Arc;

use crate::address::Address;
use crate::mediator::{Endpoint, Representation, RequestBody, RequestMediator};
use crate::process::ProcessHandle;
use crate::subscription::PollingEngine;
use crate::types::{ClientConfig, ProcessId, Result};

/// Device serving node metadata.
pub const META_DEVICE: &str = "meta";
/// Version of the metadata device.
pub const META_VERSION: &str = "1.0";

/// Entry point for talking to one node.
#[derive(Debug, Clone)]
pub struct NodeClient {
    mediator: RequestMediator,
}

impl NodeClient {
    pub fn new(endpoint: Endpoint) -> Result<Self> {
        Ok(Self {
            mediator: RequestMediator::new(endpoint)?,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(Endpoint::from_config(&config.endpoint)?)
    }

    pub fn mediator(&self) -> &RequestMediator {
        &self.mediator
    }

    /// `GET /~meta@1.0/info`.
    pub async fn info(&self) -> Result<Representation> {
        let address = Address::new(META_DEVICE, META_VERSION).segment("info");
        self.mediator.get(&address).await
    }

    /// GET an arbitrary device address.
    pub async fn get(&self, address: &Address) -> Result<Representation> {
        self.mediator.get(address).await
    }

    /// POST to an arbitrary device address.
    pub async fn post(
        &self,
        address: &Address,
        body: Option<RequestBody>,
        headers: &[(&str, &str)],
    ) -> Result<Representation> {
        self.mediator.post(address, body, headers).await
    }

    pub fn process(&self, id: ProcessId) -> ProcessHandle {
        ProcessHandle::new(id, self.mediator.clone())
    }

    /// A polling engine over a process's live state.
    pub fn engine(&self, id: ProcessId) -> PollingEngine {
        PollingEngine::new(Arc::new(self.process(id)))
    }
}
