#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! Common test utilities for compute-nodes integration tests

use std::sync::Arc;
use std::time::Duration;

use compute_nodes::{BackendRegistry, ComputeNodesConfig, ComputeNodesLocalClient, Service};
use compute_nodes_sdk::ComputeNodesClient;
use inmemory_compute_plugin::{InMemoryComputePluginConfig, SeedNode, SeedState};

pub const GROUP: &str = "rg";

/// Manager wired to an in-memory backend, with a handle on the backend for
/// fault injection.
pub struct Harness {
    pub client: Arc<dyn ComputeNodesClient>,
    pub backend: Arc<inmemory_compute_plugin::Service>,
}

pub fn manager_config() -> ComputeNodesConfig {
    ComputeNodesConfig {
        provider: "inmemory".to_owned(),
        default_group: GROUP.to_owned(),
        default_node: Some("web".to_owned()),
        timeout: Duration::from_secs(2),
        poll_interval: Duration::from_millis(5),
        ..ComputeNodesConfig::default()
    }
}

pub fn plugin_config() -> InMemoryComputePluginConfig {
    InMemoryComputePluginConfig {
        settle_after_polls: 2,
        ..InMemoryComputePluginConfig::default()
    }
}

pub fn seed(name: &str, group: &str, state: SeedState) -> SeedNode {
    SeedNode {
        name: name.to_owned(),
        group: group.to_owned(),
        region: "eastus".to_owned(),
        size: "Standard_B1s".to_owned(),
        image: "linux".to_owned(),
        state,
        public_ip: false,
    }
}

pub fn harness_with(
    manager: ComputeNodesConfig,
    plugin: InMemoryComputePluginConfig,
) -> Harness {
    let plugin = inmemory_compute_plugin::build(plugin).unwrap();
    let backend = Arc::clone(plugin.service());

    let mut registry = BackendRegistry::new();
    registry.register(Arc::new(plugin)).unwrap();

    let svc = Arc::new(Service::new(&registry, manager).unwrap());
    Harness {
        client: Arc::new(ComputeNodesLocalClient::new(svc)),
        backend,
    }
}

pub fn harness() -> Harness {
    harness_with(manager_config(), plugin_config())
}

/// Harness with the given nodes present in [`GROUP`].
pub fn seeded(nodes: &[(&str, SeedState)]) -> Harness {
    let plugin = InMemoryComputePluginConfig {
        nodes: nodes
            .iter()
            .map(|(name, state)| seed(name, GROUP, *state))
            .collect(),
        ..plugin_config()
    };
    harness_with(manager_config(), plugin)
}
