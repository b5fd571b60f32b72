//! Backend plugin client over the simulated service.

use std::sync::Arc;

use async_trait::async_trait;
use compute_nodes_sdk::{
    BackendError, BackendNodeRecord, Capabilities, ComputeBackendPluginClient, Enumeration,
    ImageRef, ProvisionRequest, QueryScope, SizeRef, StatusTable, Transition,
};

use super::Service;

/// Plugin client registered with the compute nodes manager.
///
/// Cloning is cheap; clones share the simulated state, so tests can keep a
/// handle to the [`Service`] for fault injection.
#[derive(Debug, Clone)]
pub struct InMemoryComputeClient {
    svc: Arc<Service>,
}

impl InMemoryComputeClient {
    #[must_use]
    pub fn new(svc: Arc<Service>) -> Self {
        Self { svc }
    }

    #[must_use]
    pub fn service(&self) -> &Arc<Service> {
        &self.svc
    }
}

#[async_trait]
impl ComputeBackendPluginClient for InMemoryComputeClient {
    fn provider_name(&self) -> &str {
        &self.svc.config().provider_name
    }

    fn status_table(&self) -> StatusTable {
        self.svc.config().dialect.status_table()
    }

    fn capabilities(&self) -> Capabilities {
        self.svc.config().capability_set()
    }

    async fn resolve_image(&self, spec: &str) -> Result<ImageRef, BackendError> {
        Service::resolve_image(spec)
    }

    async fn resolve_size(&self, spec: &str) -> Result<SizeRef, BackendError> {
        self.svc.resolve_size(spec)
    }

    async fn provision(
        &self,
        request: ProvisionRequest,
    ) -> Result<BackendNodeRecord, BackendError> {
        self.svc.provision(&request)
    }

    async fn query(&self, scope: &QueryScope) -> Result<Enumeration, BackendError> {
        self.svc.query(scope)
    }

    async fn transition(
        &self,
        group: &str,
        name: &str,
        transition: Transition,
    ) -> Result<BackendNodeRecord, BackendError> {
        self.svc.transition(group, name, transition)
    }

    async fn deprovision(&self, group: &str, name: &str) -> Result<(), BackendError> {
        self.svc.deprovision(group, name)
    }

    async fn rename(
        &self,
        group: &str,
        name: &str,
        destination: &str,
    ) -> Result<BackendNodeRecord, BackendError> {
        self.svc.rename(group, name, destination)
    }
}
