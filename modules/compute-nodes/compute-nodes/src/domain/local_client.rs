//! Local (in-process) client for the compute nodes module.

use std::sync::Arc;

use async_trait::async_trait;
use compute_nodes_sdk::{
    ComputeNodesClient, ComputeNodesError, CreateNodeRequest, Node, NodeCollection, NodeTarget,
};

use super::{DomainError, Service};

/// Local client wrapping the manager service.
#[derive(Debug, Clone)]
pub struct ComputeNodesLocalClient {
    svc: Arc<Service>,
}

impl ComputeNodesLocalClient {
    #[must_use]
    pub fn new(svc: Arc<Service>) -> Self {
        Self { svc }
    }
}

fn log_and_convert(op: &str, e: DomainError) -> ComputeNodesError {
    tracing::error!(operation = op, error = ?e, "compute-nodes call failed");
    e.into()
}

#[async_trait]
impl ComputeNodesClient for ComputeNodesLocalClient {
    async fn create(&self, request: CreateNodeRequest) -> Result<Node, ComputeNodesError> {
        self.svc
            .create(request)
            .await
            .map_err(|e| log_and_convert("create", e))
    }

    async fn start(&self, target: &NodeTarget) -> Result<Node, ComputeNodesError> {
        self.svc
            .start(target)
            .await
            .map_err(|e| log_and_convert("start", e))
    }

    async fn stop(&self, target: &NodeTarget) -> Result<Node, ComputeNodesError> {
        self.svc
            .stop(target)
            .await
            .map_err(|e| log_and_convert("stop", e))
    }

    async fn restart(&self, target: &NodeTarget) -> Result<Node, ComputeNodesError> {
        self.svc
            .restart(target)
            .await
            .map_err(|e| log_and_convert("restart", e))
    }

    async fn destroy(&self, target: &NodeTarget) -> Result<Option<Node>, ComputeNodesError> {
        self.svc
            .destroy(target)
            .await
            .map_err(|e| log_and_convert("destroy", e))
    }

    async fn list(&self) -> Result<NodeCollection, ComputeNodesError> {
        self.svc
            .list()
            .await
            .map_err(|e| log_and_convert("list", e))
    }

    async fn info(&self, group: Option<&str>) -> Result<NodeCollection, ComputeNodesError> {
        self.svc
            .info(group)
            .await
            .map_err(|e| log_and_convert("info", e))
    }

    async fn suspend(&self, target: &NodeTarget) -> Result<Node, ComputeNodesError> {
        self.svc
            .suspend(target)
            .await
            .map_err(|e| log_and_convert("suspend", e))
    }

    async fn resume(&self, target: &NodeTarget) -> Result<Node, ComputeNodesError> {
        self.svc
            .resume(target)
            .await
            .map_err(|e| log_and_convert("resume", e))
    }

    async fn rename(
        &self,
        target: &NodeTarget,
        destination: Option<&str>,
    ) -> Result<Node, ComputeNodesError> {
        self.svc
            .rename(target, destination)
            .await
            .map_err(|e| log_and_convert("rename", e))
    }
}
