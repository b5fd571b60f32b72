//! Error types for the compute nodes module.

use std::time::Duration;

use thiserror::Error;

use crate::models::NodeState;

/// Errors returned by [`ComputeNodesClient`](crate::ComputeNodesClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComputeNodesError {
    /// A node with this name already exists in scope, or backend data
    /// contained the name twice.
    #[error("duplicate node name: {name}")]
    DuplicateName {
        /// The conflicting name.
        name: String,
    },

    /// The addressed node does not exist.
    #[error("node not found: {name} (group {group})")]
    NodeNotFound {
        /// Group that was searched.
        group: String,
        /// Name that was not found.
        name: String,
    },

    /// The backend could not complete the call. Transient; callers may retry.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The node did not reach the target state in time.
    #[error("timed out after {} waiting for node {name} to become {target}", readable(.timeout))]
    Timeout {
        /// Node being waited on.
        name: String,
        /// State that was never observed.
        target: NodeState,
        /// The bound that expired.
        timeout: Duration,
    },

    /// The selected backend does not offer this operation.
    #[error("operation '{operation}' is not supported by backend '{backend}'")]
    UnsupportedOperation {
        /// Operation name.
        operation: String,
        /// Provider name of the backend.
        backend: String,
    },

    /// Required defaults are missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request itself is malformed or was rejected by the backend.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An internal error occurred.
    #[error("an internal error occurred")]
    Internal,
}

fn readable(timeout: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*timeout)
}

impl ComputeNodesError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NodeNotFound { .. })
    }

    #[must_use]
    pub fn is_duplicate_name(&self) -> bool {
        matches!(self, Self::DuplicateName { .. })
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedOperation { .. })
    }

    /// Only backend outages are worth retrying as-is.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_))
    }
}

/// Errors reported by a backend plugin.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The named node does not exist on the backend.
    #[error("node not found: {name}")]
    NotFound {
        /// Missing node.
        name: String,
    },

    /// The backend refused a name already in use.
    #[error("name already in use: {name}")]
    NameConflict {
        /// Conflicting name.
        name: String,
    },

    /// Remote failure; the call may succeed later.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend has no implementation for this operation.
    #[error("operation not supported: {operation}")]
    Unsupported {
        /// Operation name.
        operation: &'static str,
    },

    /// The backend understood the request and refused it.
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl BackendError {
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    #[must_use]
    pub fn name_conflict(name: impl Into<String>) -> Self {
        Self::NameConflict { name: name.into() }
    }

    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ComputeNodesError::NodeNotFound {
            group: "rg".to_owned(),
            name: "web".to_owned(),
        };
        assert_eq!(err.to_string(), "node not found: web (group rg)");

        let err = ComputeNodesError::Timeout {
            name: "web".to_owned(),
            target: NodeState::Running,
            timeout: Duration::from_secs(360),
        };
        assert_eq!(
            err.to_string(),
            "timed out after 360s waiting for node web to become running"
        );

        let err = ComputeNodesError::UnsupportedOperation {
            operation: "rename".to_owned(),
            backend: "azure".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "operation 'rename' is not supported by backend 'azure'"
        );
    }

    #[test]
    fn test_predicates() {
        assert!(ComputeNodesError::BackendUnavailable("down".to_owned()).is_retryable());
        assert!(!ComputeNodesError::Configuration("x".to_owned()).is_retryable());
        assert!(
            ComputeNodesError::DuplicateName {
                name: "a".to_owned()
            }
            .is_duplicate_name()
        );
    }

    #[test]
    fn test_backend_error_constructors() {
        assert_eq!(
            BackendError::not_found("web"),
            BackendError::NotFound {
                name: "web".to_owned()
            }
        );
        assert_eq!(
            BackendError::name_conflict("web").to_string(),
            "name already in use: web"
        );
    }
}
