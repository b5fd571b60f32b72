//! In-Memory Compute Plugin
//!
//! Simulated compute backend for the `compute-nodes` module. Nodes live in
//! process memory, report Azure ARM (or EC2) native status codes, and settle
//! out of transitional states after a configurable number of queries.
//! Useful for tests, demos and local development.
//!
//! ## Configuration
//!
//! ```yaml
//! inmemory:
//!   provider_name: "inmemory"
//!   dialect: azure_arm
//!   settle_after_polls: 1
//!   capabilities: [suspend, resume, rename]
//!   nodes:
//!     - name: "web-1"
//!       group: "cloudmesh"
//!       state: running
//!       public_ip: true
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use std::sync::Arc;

use compute_nodes_sdk::BackendError;

pub mod config;
pub mod domain;

pub use config::{Dialect, InMemoryComputePluginConfig, SeedNode, SeedState};
pub use domain::{InMemoryComputeClient, Service};

/// Builds a plugin client from configuration.
///
/// # Errors
///
/// Fails when seed nodes are invalid.
pub fn build(config: InMemoryComputePluginConfig) -> Result<InMemoryComputeClient, BackendError> {
    Ok(InMemoryComputeClient::new(Arc::new(Service::new(config)?)))
}
