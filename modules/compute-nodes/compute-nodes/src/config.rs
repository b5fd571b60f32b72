//! Configuration for the compute nodes module.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Module configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComputeNodesConfig {
    /// Provider name used to select the backend plugin (case-insensitive).
    pub provider: String,

    /// Group (resource group / project) used when a target omits one.
    pub default_group: String,

    /// Location new nodes are placed in.
    pub default_region: String,

    /// Virtual network new nodes attach to.
    pub default_network: String,

    /// Subnet new nodes attach to.
    pub default_subnet: String,

    /// Node addressed when a target omits the name.
    pub default_node: Option<String>,

    /// Image used by `create` when the request has none.
    pub default_image: Option<String>,

    /// Size used by `create` when the request has none.
    pub default_size: Option<String>,

    /// Upper bound for every wait on a backend state change.
    #[serde(with = "humantime_duration")]
    pub timeout: Duration,

    /// Delay between two backend polls while waiting.
    #[serde(with = "humantime_duration")]
    pub poll_interval: Duration,
}

impl Default for ComputeNodesConfig {
    fn default() -> Self {
        Self {
            provider: "azure".to_owned(),
            default_group: "cloudmesh".to_owned(),
            default_region: "eastus".to_owned(),
            default_network: "cloudmesh-vnet".to_owned(),
            default_subnet: "cloudmesh-subnet".to_owned(),
            default_node: None,
            default_image: Some("linux".to_owned()),
            default_size: Some("Standard_DS1_v2".to_owned()),
            timeout: Duration::from_secs(360),
            poll_interval: Duration::from_secs(5),
        }
    }
}

impl ComputeNodesConfig {
    /// Checks fields that have no usable fallback.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` naming the first offending field.
    pub fn validate(&self) -> Result<(), DomainError> {
        let required = [
            ("provider", self.provider.as_str()),
            ("default_group", self.default_group.as_str()),
            ("default_region", self.default_region.as_str()),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DomainError::Configuration(format!("{field} must not be empty")));
            }
        }
        if self.timeout.is_zero() {
            return Err(DomainError::Configuration(
                "timeout must be greater than zero".to_owned(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(DomainError::Configuration(
                "poll_interval must be greater than zero".to_owned(),
            ));
        }
        if self.poll_interval > self.timeout {
            return Err(DomainError::Configuration(format!(
                "poll_interval ({}) exceeds timeout ({})",
                humantime::format_duration(self.poll_interval),
                humantime::format_duration(self.timeout)
            )));
        }
        Ok(())
    }
}

/// Serde adapter for durations written as `"360s"`, `"5m"` or `"1h 30m"`.
pub mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    /// # Errors
    ///
    /// Fails when the input is not a valid humantime duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
