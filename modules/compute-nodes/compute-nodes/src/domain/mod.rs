//! Domain layer for the compute nodes manager.

pub mod error;
pub mod local_client;
pub mod locks;
pub mod naming;
pub mod normalize;
pub mod registry;
pub mod service;

pub use error::DomainError;
pub use local_client::ComputeNodesLocalClient;
pub use registry::BackendRegistry;
pub use service::Service;
