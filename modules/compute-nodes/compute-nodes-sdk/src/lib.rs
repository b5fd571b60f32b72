//! Compute Nodes SDK
//!
//! This crate provides the public API for the `compute-nodes` module:
//!
//! - [`ComputeNodesClient`] - Public API trait for consumers
//! - [`ComputeBackendPluginClient`] - Plugin API trait for cloud backends
//! - [`Node`], [`NodeCollection`], [`NodeState`] - Domain models
//! - [`ComputeNodesError`], [`BackendError`] - Error types
//! - [`StatusTable`] - Per-backend conversion of native status codes
//!
//! ## Usage
//!
//! ```ignore
//! use compute_nodes_sdk::{ComputeNodesClient, CreateNodeRequest, NodeTarget};
//!
//! let node = nodes.create(CreateNodeRequest::new("web-1").with_size("Standard_B1s")).await?;
//!
//! // Omitted group/name resolve to the manager's configured defaults
//! let stopped = nodes.stop(&NodeTarget::default()).await?;
//!
//! let all = nodes.list().await?;
//! for (name, node) in &all {
//!     tracing::info!(%name, state = %node.state, "node");
//! }
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod error;
pub mod models;
pub mod plugin_api;
pub mod status_tables;

pub use api::ComputeNodesClient;
pub use error::{BackendError, ComputeNodesError};
pub use models::{CreateNodeRequest, Node, NodeCollection, NodeOptions, NodeState, NodeTarget};
pub use plugin_api::{
    BackendNodeRecord, Capabilities, Capability, ComputeBackendPluginClient, Enumeration,
    ImageRef, NetworkPlacement, ProvisionRequest, QueryScope, SizeRef, Transition,
};
pub use status_tables::StatusTable;
