use std::sync::Arc;
use std::time::Duration;

use compute_nodes_sdk::{
    BackendError, Capabilities, Capability, ComputeBackendPluginClient, CreateNodeRequest,
    NetworkPlacement, Node, NodeCollection, NodeOptions, NodeState, NodeTarget, ProvisionRequest,
    QueryScope, StatusTable, Transition,
};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::config::ComputeNodesConfig;
use crate::domain::error::DomainError;
use crate::domain::locks::NodeLocks;
use crate::domain::naming::next_available_name;
use crate::domain::normalize::{normalize_collection, normalize_record};
use crate::domain::registry::BackendRegistry;

/// Automatic rename retries when the derived name is taken concurrently.
const MAX_RENAME_ATTEMPTS: usize = 8;

/// Compute nodes manager bound to one backend.
pub struct Service {
    backend: Arc<dyn ComputeBackendPluginClient>,
    cloud: String,
    table: StatusTable,
    capabilities: Capabilities,
    config: ComputeNodesConfig,
    locks: NodeLocks,
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("cloud", &self.cloud)
            .field("vocabulary", &self.table.vocabulary())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Service {
    /// Validates `config` and binds the backend named by `config.provider`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` for invalid config or an unknown
    /// provider.
    pub fn new(registry: &BackendRegistry, config: ComputeNodesConfig) -> Result<Self, DomainError> {
        config.validate()?;
        let backend = registry.select(&config.provider)?;
        let cloud = backend.provider_name().to_owned();
        let table = backend.status_table();
        let capabilities = backend.capabilities();

        info!(
            cloud = %cloud,
            vocabulary = table.vocabulary(),
            group = %config.default_group,
            "compute nodes manager bound to backend"
        );

        Ok(Self {
            backend,
            cloud,
            table,
            capabilities,
            config,
            locks: NodeLocks::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ComputeNodesConfig {
        &self.config
    }

    #[must_use]
    pub fn cloud(&self) -> &str {
        &self.cloud
    }

    /// Fills omitted group and name from the configured defaults.
    fn resolve_target(&self, target: &NodeTarget) -> Result<(String, String), DomainError> {
        let group = target
            .group
            .clone()
            .unwrap_or_else(|| self.config.default_group.clone());
        let name = match (&target.name, &self.config.default_node) {
            (Some(name), _) => name.clone(),
            (None, Some(default)) => default.clone(),
            (None, None) => {
                return Err(DomainError::Configuration(
                    "no node name given and no default_node configured".to_owned(),
                ));
            }
        };
        if name.trim().is_empty() {
            return Err(DomainError::InvalidArgument(
                "node name must not be empty".to_owned(),
            ));
        }
        Ok((group, name))
    }

    fn backend_err(&self, group: &str, name: &str) -> impl FnOnce(BackendError) -> DomainError {
        let cloud = self.cloud.clone();
        let group = group.to_owned();
        let name = name.to_owned();
        move |e| DomainError::from_backend(e, &cloud, &group, &name)
    }

    fn require(&self, capability: Capability) -> Result<(), DomainError> {
        if self.capabilities.supports(capability) {
            Ok(())
        } else {
            Err(DomainError::unsupported(capability.as_str(), &self.cloud))
        }
    }

    async fn enumerate(&self, scope: &QueryScope) -> Result<NodeCollection, DomainError> {
        let group = match scope {
            QueryScope::All => "*",
            QueryScope::Group(group) => group.as_str(),
        };
        let enumeration = self
            .backend
            .query(scope)
            .await
            .map_err(self.backend_err(group, "*"))?;

        if !enumeration.is_complete() {
            warn!(failed = ?enumeration.failed_groups, "partial enumeration");
            return Err(DomainError::BackendUnavailable(format!(
                "could not enumerate groups: {}",
                enumeration.failed_groups.join(", ")
            )));
        }
        normalize_collection(&self.cloud, &self.table, enumeration.records)
    }

    async fn query_group(&self, group: &str) -> Result<NodeCollection, DomainError> {
        self.enumerate(&QueryScope::Group(group.to_owned())).await
    }

    async fn find_node(&self, group: &str, name: &str) -> Result<Option<Node>, DomainError> {
        Ok(self.query_group(group).await?.take(name))
    }

    /// Polls until the node reports `target` or `timeout` elapses.
    async fn wait_for(
        &self,
        group: &str,
        name: &str,
        target: NodeState,
        timeout: Duration,
    ) -> Result<Node, DomainError> {
        let started = Instant::now();
        let deadline = started.checked_add(timeout);
        loop {
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => self.config.poll_interval,
            };
            if remaining.is_zero() {
                return Err(DomainError::Timeout {
                    name: name.to_owned(),
                    target,
                    timeout,
                });
            }
            tokio::time::sleep(remaining.min(self.config.poll_interval)).await;

            let node = self
                .find_node(group, name)
                .await?
                .ok_or_else(|| DomainError::not_found(group, name))?;
            debug!(name, state = %node.state, %target, "polled node");
            if node.state == target {
                debug!(name, elapsed = ?started.elapsed(), "node reached target state");
                return Ok(node);
            }
        }
    }

    /// Polls until the backend stops listing the node; returns the last
    /// record seen.
    async fn wait_for_absence(
        &self,
        group: &str,
        mut last: Node,
        timeout: Duration,
    ) -> Result<Node, DomainError> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => self.config.poll_interval,
            };
            if remaining.is_zero() {
                return Err(DomainError::Timeout {
                    name: last.name,
                    target: NodeState::Terminated,
                    timeout,
                });
            }
            tokio::time::sleep(remaining.min(self.config.poll_interval)).await;

            let Some(node) = self
                .find_node(group, &last.name)
                .await?
                .filter(|node| node.state != NodeState::Terminated)
            else {
                return Ok(last);
            };
            last = node;
        }
    }

    /// Provisions a node and waits for it to run.
    ///
    /// # Errors
    ///
    /// `DuplicateName` if the name exists in the default group, `Timeout` if
    /// the node does not run within the request timeout, and mapped backend
    /// errors otherwise.
    #[instrument(skip_all, fields(cloud = %self.cloud, name = %request.name))]
    pub async fn create(&self, request: CreateNodeRequest) -> Result<Node, DomainError> {
        let CreateNodeRequest {
            name,
            image,
            size,
            timeout,
            options,
        } = request;
        if name.trim().is_empty() {
            return Err(DomainError::InvalidArgument(
                "node name must not be empty".to_owned(),
            ));
        }
        let group = self.config.default_group.clone();
        let image = image
            .or_else(|| self.config.default_image.clone())
            .ok_or_else(|| DomainError::Configuration("no image given and no default_image configured".to_owned()))?;
        let size = size
            .or_else(|| self.config.default_size.clone())
            .ok_or_else(|| DomainError::Configuration("no size given and no default_size configured".to_owned()))?;
        let timeout = timeout.unwrap_or(self.config.timeout);
        if timeout.is_zero() {
            return Err(DomainError::InvalidArgument(
                "timeout must be positive".to_owned(),
            ));
        }

        let created = {
            let _guard = self.locks.acquire(&group, &name).await;
            self.create_locked(&group, name, &image, &size, timeout, options)
                .await
        };
        self.locks.prune();
        created
    }

    async fn create_locked(
        &self,
        group: &str,
        name: String,
        image: &str,
        size: &str,
        timeout: Duration,
        options: NodeOptions,
    ) -> Result<Node, DomainError> {
        if self.find_node(group, &name).await?.is_some() {
            return Err(DomainError::DuplicateName { name });
        }

        let image = self
            .backend
            .resolve_image(image)
            .await
            .map_err(self.backend_err(group, &name))?;
        let size = self
            .backend
            .resolve_size(size)
            .await
            .map_err(self.backend_err(group, &name))?;

        info!(%group, %image, %size, "provisioning node");
        let record = self
            .backend
            .provision(ProvisionRequest {
                name: name.clone(),
                image,
                size,
                network: NetworkPlacement {
                    group: group.to_owned(),
                    region: self.config.default_region.clone(),
                    network: self.config.default_network.clone(),
                    subnet: self.config.default_subnet.clone(),
                },
                options,
            })
            .await
            .map_err(self.backend_err(group, &name))?;

        let node = normalize_record(&self.cloud, &self.table, record);
        if node.state == NodeState::Running {
            return Ok(node);
        }
        let node = self.wait_for(group, &name, NodeState::Running, timeout).await?;
        info!(cloud_id = %node.cloud_id, "node created");
        Ok(node)
    }

    #[instrument(skip_all, fields(cloud = %self.cloud, %transition))]
    async fn run_transition(
        &self,
        target: &NodeTarget,
        transition: Transition,
    ) -> Result<Node, DomainError> {
        if let Some(capability) = transition.capability() {
            self.require(capability)?;
        }
        let (group, name) = self.resolve_target(target)?;
        let outcome = {
            let _guard = self.locks.acquire(&group, &name).await;
            self.transition_locked(&group, &name, transition).await
        };
        self.locks.prune();
        outcome
    }

    async fn transition_locked(
        &self,
        group: &str,
        name: &str,
        transition: Transition,
    ) -> Result<Node, DomainError> {
        info!(%group, %name, "requesting transition");
        let record = self
            .backend
            .transition(group, name, transition)
            .await
            .map_err(self.backend_err(group, name))?;

        let node = normalize_record(&self.cloud, &self.table, record);
        let wanted = transition.target_state();
        if node.state == wanted {
            return Ok(node);
        }
        self.wait_for(group, name, wanted, self.config.timeout).await
    }

    /// Starts a node and waits until it runs.
    ///
    /// # Errors
    ///
    /// `NodeNotFound`, `Timeout`, or mapped backend errors.
    pub async fn start(&self, target: &NodeTarget) -> Result<Node, DomainError> {
        self.run_transition(target, Transition::Start).await
    }

    /// Stops a node and waits until it is stopped.
    ///
    /// # Errors
    ///
    /// `NodeNotFound`, `Timeout`, or mapped backend errors.
    pub async fn stop(&self, target: &NodeTarget) -> Result<Node, DomainError> {
        self.run_transition(target, Transition::Stop).await
    }

    /// # Errors
    ///
    /// As for [`start`](Self::start).
    pub async fn restart(&self, target: &NodeTarget) -> Result<Node, DomainError> {
        self.run_transition(target, Transition::Restart).await
    }

    /// # Errors
    ///
    /// `Unsupported` when the backend cannot suspend, otherwise as for
    /// [`stop`](Self::stop).
    pub async fn suspend(&self, target: &NodeTarget) -> Result<Node, DomainError> {
        self.run_transition(target, Transition::Suspend).await
    }

    /// # Errors
    ///
    /// `Unsupported` when the backend cannot resume, otherwise as for
    /// [`start`](Self::start).
    pub async fn resume(&self, target: &NodeTarget) -> Result<Node, DomainError> {
        self.run_transition(target, Transition::Resume).await
    }

    /// Destroys a node. A node that is already gone is not an error.
    ///
    /// # Errors
    ///
    /// `Timeout` if the backend keeps listing the node, or mapped backend
    /// errors.
    #[instrument(skip_all, fields(cloud = %self.cloud))]
    pub async fn destroy(&self, target: &NodeTarget) -> Result<Option<Node>, DomainError> {
        let (group, name) = self.resolve_target(target)?;
        let destroyed = {
            let _guard = self.locks.acquire(&group, &name).await;
            self.destroy_locked(&group, &name).await
        };
        self.locks.prune();
        destroyed
    }

    async fn destroy_locked(&self, group: &str, name: &str) -> Result<Option<Node>, DomainError> {
        let Some(last) = self
            .find_node(group, name)
            .await?
            .filter(|node| node.state != NodeState::Terminated)
        else {
            debug!(%group, %name, "node already absent");
            return Ok(None);
        };

        info!(%group, %name, cloud_id = %last.cloud_id, "deprovisioning node");
        match self.backend.deprovision(group, name).await {
            Ok(()) => {}
            Err(BackendError::NotFound { .. }) => {
                debug!(%group, %name, "node vanished before deprovision");
                return Ok(None);
            }
            Err(e) => return Err(self.backend_err(group, name)(e)),
        }

        let mut node = self.wait_for_absence(group, last, self.config.timeout).await?;
        node.state = NodeState::Terminated;
        Ok(Some(node))
    }

    /// Every node across all groups.
    ///
    /// # Errors
    ///
    /// `BackendUnavailable` when any group fails to enumerate,
    /// `DuplicateName` when two groups share a name.
    #[instrument(skip_all, fields(cloud = %self.cloud))]
    pub async fn list(&self) -> Result<NodeCollection, DomainError> {
        let nodes = self.enumerate(&QueryScope::All).await?;
        debug!(count = nodes.len(), "listed nodes");
        Ok(nodes)
    }

    /// Nodes of one group, the default group when `group` is `None`.
    ///
    /// # Errors
    ///
    /// As for [`list`](Self::list).
    #[instrument(skip_all, fields(cloud = %self.cloud))]
    pub async fn info(&self, group: Option<&str>) -> Result<NodeCollection, DomainError> {
        let group = group.unwrap_or(self.config.default_group.as_str());
        let nodes = self.query_group(group).await?;
        debug!(%group, count = nodes.len(), "listed group");
        Ok(nodes)
    }

    /// Renames a node, deriving a free name when `destination` is `None`.
    ///
    /// # Errors
    ///
    /// `Unsupported`, `NodeNotFound`, `DuplicateName` for a taken
    /// destination, or mapped backend errors.
    #[instrument(skip_all, fields(cloud = %self.cloud))]
    pub async fn rename(
        &self,
        target: &NodeTarget,
        destination: Option<&str>,
    ) -> Result<Node, DomainError> {
        self.require(Capability::Rename)?;
        let (group, name) = self.resolve_target(target)?;

        if let Some(dest) = destination {
            if dest.trim().is_empty() {
                return Err(DomainError::InvalidArgument(
                    "destination name must not be empty".to_owned(),
                ));
            }
            if dest == name {
                return Err(DomainError::InvalidArgument(format!(
                    "node {name} already has that name"
                )));
            }
        }

        let mut last_candidate = name.clone();
        for attempt in 1..=MAX_RENAME_ATTEMPTS {
            let candidate = match destination {
                Some(dest) => dest.to_owned(),
                None => {
                    let nodes = self.query_group(&group).await?;
                    next_available_name(&name, |c| nodes.contains(c))
                }
            };

            let renamed = {
                let _guards = self.locks.acquire_pair(&group, &name, &candidate).await;
                self.rename_locked(&group, &name, &candidate).await
            };
            match renamed {
                Err(DomainError::DuplicateName { .. }) if destination.is_none() => {
                    debug!(attempt, %candidate, "derived name taken, retrying");
                    last_candidate = candidate;
                }
                other => {
                    self.locks.prune();
                    return other;
                }
            }
        }

        self.locks.prune();
        Err(DomainError::DuplicateName {
            name: last_candidate,
        })
    }

    async fn rename_locked(
        &self,
        group: &str,
        name: &str,
        destination: &str,
    ) -> Result<Node, DomainError> {
        let nodes = self.query_group(group).await?;
        if !nodes.contains(name) {
            return Err(DomainError::not_found(group, name));
        }
        if nodes.contains(destination) {
            return Err(DomainError::DuplicateName {
                name: destination.to_owned(),
            });
        }

        info!(%group, from = %name, to = %destination, "renaming node");
        let record = self
            .backend
            .rename(group, name, destination)
            .await
            .map_err(self.backend_err(group, name))?;
        Ok(normalize_record(&self.cloud, &self.table, record))
    }
}
