//! Domain models for the compute nodes module.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Open map of backend-specific provisioning parameters.
pub type NodeOptions = serde_json::Map<String, serde_json::Value>;

/// Normalized lifecycle state of a compute node.
///
/// Every backend translates its native status vocabulary into this closed set
/// through an explicit [`StatusTable`](crate::StatusTable).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Node is booting or resuming.
    Starting,
    /// Node is up.
    Running,
    /// Node is shutting down.
    Stopping,
    /// Node is powered off (possibly deallocated).
    Stopped,
    /// Node has been destroyed. Terminal.
    Terminated,
    /// State not yet observed, or a status code the backend table does not know.
    #[default]
    Unknown,
}

impl NodeState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Terminated => "terminated",
            Self::Unknown => "unknown",
        }
    }

    /// Returns `true` while the backend is still moving the node between
    /// stable states.
    #[must_use]
    pub const fn is_transitional(self) -> bool {
        matches!(self, Self::Starting | Self::Stopping)
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One compute instance as seen by the manager.
///
/// Values are only ever built from a backend response; the manager keeps no
/// copies between calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Backend-assigned identifier. Never changes, including across renames.
    pub cloud_id: String,
    /// Provider that owns the node.
    pub cloud: String,
    /// Caller-assigned name, unique within provider and group.
    pub name: String,
    /// Backend location identifier.
    pub region: String,
    /// Backend size or SKU identifier.
    pub size: String,
    /// Normalized lifecycle state.
    pub state: NodeState,
    /// Public addresses in backend order.
    #[serde(default)]
    pub public_ips: Vec<String>,
    /// Private addresses in backend order.
    #[serde(default)]
    pub private_ips: Vec<String>,
}

/// Nodes indexed by name.
///
/// Keys always equal the `name` of the node stored under them; inserting a
/// second node with an existing name is rejected instead of overwriting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NodeCollection {
    nodes: BTreeMap<String, Node>,
}

impl NodeCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node under its own name.
    ///
    /// # Errors
    ///
    /// Returns the rejected node when a node with the same name is already
    /// present.
    #[allow(clippy::result_large_err)]
    pub fn try_insert(&mut self, node: Node) -> Result<(), Node> {
        match self.nodes.entry(node.name.clone()) {
            btree_map::Entry::Occupied(_) => Err(node),
            btree_map::Entry::Vacant(slot) => {
                slot.insert(node);
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Removes and returns the node stored under `name`.
    pub fn take(&mut self, name: &str) -> Option<Node> {
        self.nodes.remove(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Node> {
        self.nodes.iter()
    }
}

impl IntoIterator for NodeCollection {
    type Item = (String, Node);
    type IntoIter = btree_map::IntoIter<String, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

impl<'a> IntoIterator for &'a NodeCollection {
    type Item = (&'a String, &'a Node);
    type IntoIter = btree_map::Iter<'a, String, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

/// Addresses a single node for lifecycle operations.
///
/// A `None` field resolves to the manager's configured default group or
/// default node. It never widens the operation to several nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeTarget {
    pub group: Option<String>,
    pub name: Option<String>,
}

impl NodeTarget {
    /// Targets `name` in the default group.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            group: None,
            name: Some(name.into()),
        }
    }

    /// Sets the group explicitly.
    #[must_use]
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// Request to provision a new node.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateNodeRequest {
    /// Name for the new node. Must be non-empty and unused in scope.
    pub name: String,
    /// Image reference understood by the backend. Falls back to the
    /// configured default image.
    pub image: Option<String>,
    /// Size reference understood by the backend. Falls back to the
    /// configured default size.
    pub size: Option<String>,
    /// How long to wait for the node to reach `running`. Falls back to the
    /// configured timeout.
    pub timeout: Option<Duration>,
    /// Backend-specific extras, passed through untouched.
    pub options: NodeOptions,
}

impl CreateNodeRequest {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: None,
            size: None,
            timeout: None,
            options: NodeOptions::new(),
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_option(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}
