//! Configuration for the in-memory compute plugin.

use compute_nodes_sdk::status_tables::{AZURE_ARM, EC2};
use compute_nodes_sdk::{Capabilities, Capability, StatusTable};
use serde::{Deserialize, Serialize};

/// Plugin configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InMemoryComputePluginConfig {
    /// Provider name the manager selects this backend by.
    pub provider_name: String,

    /// Native status vocabulary the simulated backend reports.
    pub dialect: Dialect,

    /// Queries a node stays in a transitional state before settling.
    pub settle_after_polls: u32,

    /// Sizes the backend offers.
    pub sizes: Vec<String>,

    /// Optional operations to advertise.
    pub capabilities: Vec<Capability>,

    /// Nodes present at startup.
    pub nodes: Vec<SeedNode>,
}

impl Default for InMemoryComputePluginConfig {
    fn default() -> Self {
        Self {
            provider_name: "inmemory".to_owned(),
            dialect: Dialect::AzureArm,
            settle_after_polls: 1,
            sizes: vec![
                "Standard_B1s".to_owned(),
                "Standard_DS1_v2".to_owned(),
                "Standard_D2s_v3".to_owned(),
            ],
            capabilities: vec![Capability::Suspend, Capability::Resume, Capability::Rename],
            nodes: Vec::new(),
        }
    }
}

impl InMemoryComputePluginConfig {
    #[must_use]
    pub fn capability_set(&self) -> Capabilities {
        self.capabilities.iter().copied().collect()
    }
}

/// Native status vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// Azure Resource Manager `PowerState/*` codes.
    #[default]
    AzureArm,
    /// EC2 instance state names.
    Ec2,
}

impl Dialect {
    #[must_use]
    pub const fn status_table(self) -> StatusTable {
        match self {
            Self::AzureArm => AZURE_ARM,
            Self::Ec2 => EC2,
        }
    }
}

/// A node that exists before the first call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedNode {
    pub name: String,

    pub group: String,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_size")]
    pub size: String,

    #[serde(default = "default_image")]
    pub image: String,

    #[serde(default)]
    pub state: SeedState,

    /// Allocate a public address.
    #[serde(default)]
    pub public_ip: bool,
}

fn default_region() -> String {
    "eastus".to_owned()
}

fn default_size() -> String {
    "Standard_DS1_v2".to_owned()
}

fn default_image() -> String {
    "linux".to_owned()
}

/// Stable state of a seeded node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedState {
    #[default]
    Running,
    Stopped,
    Deallocated,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn seed_defaults() {
        let cfg: InMemoryComputePluginConfig = serde_json::from_value(serde_json::json!({
            "nodes": [{ "name": "web", "group": "rg" }]
        }))
        .unwrap();

        let seed = &cfg.nodes[0];
        assert_eq!(seed.state, SeedState::Running);
        assert_eq!(seed.region, "eastus");
        assert_eq!(seed.size, "Standard_DS1_v2");
        assert!(!seed.public_ip);
        assert_eq!(cfg.provider_name, "inmemory");
    }

    #[test]
    fn dialect_selects_table() {
        let cfg: InMemoryComputePluginConfig =
            serde_json::from_value(serde_json::json!({ "dialect": "ec2" })).unwrap();
        assert_eq!(cfg.dialect.status_table().vocabulary(), "ec2");
        assert_eq!(Dialect::default().status_table().vocabulary(), "azure-arm");
    }

    #[test]
    fn capabilities_can_be_restricted() {
        let cfg: InMemoryComputePluginConfig =
            serde_json::from_value(serde_json::json!({ "capabilities": ["rename"] })).unwrap();
        let caps = cfg.capability_set();
        assert!(caps.supports(Capability::Rename));
        assert!(!caps.supports(Capability::Suspend));
    }
}
