//! Public API trait for the compute nodes manager.

use async_trait::async_trait;

use crate::error::ComputeNodesError;
use crate::models::{CreateNodeRequest, Node, NodeCollection, NodeTarget};

/// Uniform lifecycle contract over whichever backend the manager was built
/// with.
///
/// Every returned [`Node`] reflects a state the backend has confirmed. Calls
/// that change state return only after the backend reports the target state
/// (or fail with `Timeout`). Two calls addressing the same node are
/// serialized; calls on different nodes run independently.
///
/// ```ignore
/// let node = nodes.create(CreateNodeRequest::new("web-1")).await?;
/// nodes.stop(&NodeTarget::named("web-1")).await?;
/// nodes.destroy(&NodeTarget::named("web-1")).await?;
/// ```
#[async_trait]
pub trait ComputeNodesClient: Send + Sync {
    /// Provisions a node in the default group and waits until it runs.
    ///
    /// # Errors
    ///
    /// - `DuplicateName` if the name already exists in scope
    /// - `InvalidArgument` for an empty name or a spec the backend refuses
    /// - `Configuration` if image or size are missing and have no default
    /// - `BackendUnavailable` on remote failure
    /// - `Timeout` if the node is not running within the request timeout
    async fn create(&self, request: CreateNodeRequest) -> Result<Node, ComputeNodesError>;

    /// Starts a node and waits until it runs.
    ///
    /// # Errors
    ///
    /// - `NodeNotFound` if the node does not exist
    /// - `Configuration` if no name is given and no default node is configured
    /// - `BackendUnavailable` on remote failure
    /// - `Timeout` if the node is not running within the configured timeout
    async fn start(&self, target: &NodeTarget) -> Result<Node, ComputeNodesError>;

    /// Stops a node and waits until it is stopped.
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start).
    async fn stop(&self, target: &NodeTarget) -> Result<Node, ComputeNodesError>;

    /// Restarts a node and waits until it runs again.
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start).
    async fn restart(&self, target: &NodeTarget) -> Result<Node, ComputeNodesError>;

    /// Destroys a node and waits until the backend no longer lists it.
    ///
    /// Returns the node with state `terminated`, or `None` if it was already
    /// absent. Destroying a missing node is not an error.
    ///
    /// # Errors
    ///
    /// - `BackendUnavailable` on remote failure
    /// - `Timeout` if the node is still listed after the configured timeout
    async fn destroy(&self, target: &NodeTarget) -> Result<Option<Node>, ComputeNodesError>;

    /// Lists every node across all groups.
    ///
    /// # Errors
    ///
    /// - `BackendUnavailable` on remote failure, including partial enumeration
    /// - `DuplicateName` if two groups hold the same name
    async fn list(&self) -> Result<NodeCollection, ComputeNodesError>;

    /// Lists nodes of one group (`None` = default group).
    ///
    /// # Errors
    ///
    /// Same as [`list`](Self::list).
    async fn info(&self, group: Option<&str>) -> Result<NodeCollection, ComputeNodesError>;

    /// Suspends a node and waits until it is stopped.
    ///
    /// # Errors
    ///
    /// - `UnsupportedOperation` if the backend cannot suspend
    /// - otherwise as [`stop`](Self::stop)
    async fn suspend(&self, target: &NodeTarget) -> Result<Node, ComputeNodesError>;

    /// Resumes a suspended node and waits until it runs.
    ///
    /// # Errors
    ///
    /// - `UnsupportedOperation` if the backend cannot resume
    /// - otherwise as [`start`](Self::start)
    async fn resume(&self, target: &NodeTarget) -> Result<Node, ComputeNodesError>;

    /// Renames a node.
    ///
    /// With `destination == None` the new name is derived from the current
    /// one by adding or incrementing a numeric suffix (`web` -> `web-1`,
    /// `web-1` -> `web-2`), skipping names already in use.
    ///
    /// # Errors
    ///
    /// - `UnsupportedOperation` if the backend cannot rename
    /// - `NodeNotFound` if the node does not exist
    /// - `DuplicateName` if `destination` is taken
    async fn rename(
        &self,
        target: &NodeTarget,
        destination: Option<&str>,
    ) -> Result<Node, ComputeNodesError>;
}
