//! Plugin API for compute backends.
//!
//! A backend plugin wraps one cloud vendor's compute service. The manager
//! selects exactly one plugin per instance, by provider name, when it is
//! constructed, and talks to it only through [`ComputeBackendPluginClient`].

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::models::{NodeOptions, NodeState};
use crate::status_tables::StatusTable;

/// Image reference after backend resolution (e.g. an image URN).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

/// Size reference after backend resolution (e.g. a VM SKU).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SizeRef(pub String);

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for SizeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a new node is placed: resource group, location and network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPlacement {
    pub group: String,
    pub region: String,
    pub network: String,
    pub subnet: String,
}

/// Everything a backend needs to provision one node.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionRequest {
    pub name: String,
    pub image: ImageRef,
    pub size: SizeRef,
    pub network: NetworkPlacement,
    pub options: NodeOptions,
}

/// Which groups a query enumerates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryScope {
    /// Every group visible to the backend credentials.
    All,
    /// A single group.
    Group(String),
}

/// A node as the backend reports it, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendNodeRecord {
    pub cloud_id: String,
    pub name: String,
    pub group: String,
    pub region: String,
    pub size: String,
    /// Backend-native status code, translated through the backend's
    /// [`StatusTable`].
    pub status: String,
    #[serde(default)]
    pub public_ips: Vec<String>,
    #[serde(default)]
    pub private_ips: Vec<String>,
}

/// Result of a query.
///
/// `failed_groups` lists groups the backend could not enumerate; their nodes
/// are absent from `records`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enumeration {
    pub records: Vec<BackendNodeRecord>,
    pub failed_groups: Vec<String>,
}

impl Enumeration {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed_groups.is_empty()
    }
}

/// Lifecycle transition requested from a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Start,
    Stop,
    Restart,
    Suspend,
    Resume,
}

impl Transition {
    /// State the manager waits for after requesting this transition.
    #[must_use]
    pub const fn target_state(self) -> NodeState {
        match self {
            Self::Start | Self::Restart | Self::Resume => NodeState::Running,
            Self::Stop | Self::Suspend => NodeState::Stopped,
        }
    }

    /// Optional capability the backend must declare for this transition.
    #[must_use]
    pub const fn capability(self) -> Option<Capability> {
        match self {
            Self::Start | Self::Stop | Self::Restart => None,
            Self::Suspend => Some(Capability::Suspend),
            Self::Resume => Some(Capability::Resume),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Suspend => "suspend",
            Self::Resume => "resume",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations a backend may leave out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Suspend,
    Resume,
    Rename,
}

impl Capability {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Suspend => "suspend",
            Self::Resume => "resume",
            Self::Rename => "rename",
        }
    }
}

/// Set of optional operations a backend supports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities(BTreeSet<Capability>);

impl Capabilities {
    /// No optional operations.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Every optional operation.
    #[must_use]
    pub fn all() -> Self {
        [Capability::Suspend, Capability::Resume, Capability::Rename]
            .into_iter()
            .collect()
    }

    #[must_use]
    pub fn with(mut self, capability: Capability) -> Self {
        self.0.insert(capability);
        self
    }

    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Plugin API trait for compute backends.
///
/// Implementations must be safe to call concurrently. The manager serializes
/// calls per node name, not per backend.
#[async_trait]
pub trait ComputeBackendPluginClient: Send + Sync {
    /// Provider name used for selection and reported as [`Node::cloud`](crate::Node).
    fn provider_name(&self) -> &str;

    /// Conversion table from native status codes to [`NodeState`].
    fn status_table(&self) -> StatusTable;

    /// Optional operations this backend implements.
    fn capabilities(&self) -> Capabilities;

    /// Resolves a caller image spec (alias or full reference).
    ///
    /// # Errors
    ///
    /// - `Rejected` if the spec does not name a known image
    /// - `Unavailable` on remote failure
    async fn resolve_image(&self, spec: &str) -> Result<ImageRef, BackendError>;

    /// Resolves a caller size spec.
    ///
    /// # Errors
    ///
    /// - `Rejected` if the size is not offered
    /// - `Unavailable` on remote failure
    async fn resolve_size(&self, spec: &str) -> Result<SizeRef, BackendError>;

    /// Provisions a node and returns its record as soon as the backend has
    /// accepted it. The node may still be booting.
    ///
    /// # Errors
    ///
    /// - `NameConflict` if the name is taken in the target group
    /// - `Rejected` if the request is invalid for this backend
    /// - `Unavailable` on remote failure
    async fn provision(&self, request: ProvisionRequest)
    -> Result<BackendNodeRecord, BackendError>;

    /// Enumerates nodes in scope.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if nothing could be enumerated
    async fn query(&self, scope: &QueryScope) -> Result<Enumeration, BackendError>;

    /// Requests a lifecycle transition and returns the record right after the
    /// backend accepted it.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the node does not exist in `group`
    /// - `Unsupported` if the transition is not implemented
    /// - `Rejected` if the node cannot make this transition from its state
    /// - `Unavailable` on remote failure
    async fn transition(
        &self,
        group: &str,
        name: &str,
        transition: Transition,
    ) -> Result<BackendNodeRecord, BackendError>;

    /// Starts deleting a node.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the node does not exist; the manager treats this as success
    /// - `Unavailable` on remote failure
    async fn deprovision(&self, group: &str, name: &str) -> Result<(), BackendError>;

    /// Renames a node, keeping its `cloud_id`.
    ///
    /// # Errors
    ///
    /// - `Unsupported` unless overridden
    /// - `NotFound` / `NameConflict` / `Unavailable` as for other calls
    async fn rename(
        &self,
        group: &str,
        name: &str,
        destination: &str,
    ) -> Result<BackendNodeRecord, BackendError> {
        let _ = (group, name, destination);
        Err(BackendError::Unsupported {
            operation: Capability::Rename.as_str(),
        })
    }
}
