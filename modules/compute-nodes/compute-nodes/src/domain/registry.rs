//! Backend selection by provider name.

use std::collections::HashMap;
use std::sync::Arc;

use compute_nodes_sdk::ComputeBackendPluginClient;

use super::DomainError;

/// Backends available to a manager, keyed by lowercase provider name.
#[derive(Default, Clone)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn ComputeBackendPluginClient>>,
}

impl BackendRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a backend under its provider name.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if a backend with the same name
    /// (ignoring case) is already registered.
    pub fn register(
        &mut self,
        backend: Arc<dyn ComputeBackendPluginClient>,
    ) -> Result<(), DomainError> {
        let key = backend.provider_name().to_ascii_lowercase();
        if self.backends.contains_key(&key) {
            return Err(DomainError::Configuration(format!(
                "backend '{key}' registered twice"
            )));
        }
        tracing::debug!(provider = %key, "registered compute backend");
        self.backends.insert(key, backend);
        Ok(())
    }

    /// Picks the backend for `provider`, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` listing the known providers when
    /// none matches.
    pub fn select(&self, provider: &str) -> Result<Arc<dyn ComputeBackendPluginClient>, DomainError> {
        self.backends
            .get(&provider.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| {
                let mut known: Vec<_> = self.backends.keys().map(String::as_str).collect();
                known.sort_unstable();
                DomainError::Configuration(format!(
                    "unknown provider '{provider}', known: [{}]",
                    known.join(", ")
                ))
            })
    }

    /// Registered provider names in sorted order.
    #[must_use]
    pub fn providers(&self) -> Vec<String> {
        let mut names: Vec<_> = self.backends.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("providers", &self.providers())
            .finish_non_exhaustive()
    }
}
