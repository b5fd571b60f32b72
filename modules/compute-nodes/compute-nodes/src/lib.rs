//! Compute Nodes Module
//!
//! Normalized lifecycle manager over pluggable cloud backends. The manager
//! selects one [`ComputeBackendPluginClient`](compute_nodes_sdk::ComputeBackendPluginClient)
//! from a [`BackendRegistry`] by provider name, then exposes the
//! `ComputeNodesClient` contract through [`ComputeNodesLocalClient`].
//!
//! ```ignore
//! let mut registry = BackendRegistry::new();
//! registry.register(azure_backend)?;
//!
//! let svc = Arc::new(Service::new(&registry, config)?);
//! let nodes: Arc<dyn ComputeNodesClient> = Arc::new(ComputeNodesLocalClient::new(svc));
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;

pub use config::ComputeNodesConfig;
pub use domain::{BackendRegistry, ComputeNodesLocalClient, DomainError, Service};
