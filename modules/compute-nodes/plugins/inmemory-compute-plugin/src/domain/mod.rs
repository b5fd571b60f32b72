//! Domain layer for the in-memory compute plugin.

pub mod client;
pub mod service;

pub use client::InMemoryComputeClient;
pub use service::Service;
