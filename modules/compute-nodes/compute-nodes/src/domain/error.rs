use std::time::Duration;

use compute_nodes_sdk::{BackendError, ComputeNodesError, NodeState};

/// Domain-level errors for the compute nodes manager.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Node already exists: {name}")]
    DuplicateName { name: String },

    #[error("Node not found: {name} (group {group})")]
    NodeNotFound { group: String, name: String },

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Timed out after {} waiting for {name} to become {target}", readable(.timeout))]
    Timeout {
        name: String,
        target: NodeState,
        timeout: Duration,
    },

    #[error("Operation '{operation}' not supported by backend '{backend}'")]
    Unsupported { operation: String, backend: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn readable(timeout: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*timeout)
}

impl DomainError {
    #[must_use]
    pub fn not_found(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NodeNotFound {
            group: group.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn unsupported(operation: impl Into<String>, backend: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            backend: backend.into(),
        }
    }

    /// Maps a backend failure observed while addressing `group`/`name`.
    #[must_use]
    pub fn from_backend(err: BackendError, backend: &str, group: &str, name: &str) -> Self {
        match err {
            BackendError::NotFound { name: missing } => Self::not_found(group, missing),
            BackendError::NameConflict { name } => Self::DuplicateName { name },
            BackendError::Unavailable(msg) => Self::BackendUnavailable(msg),
            BackendError::Unsupported { operation } => Self::unsupported(operation, backend),
            BackendError::Rejected(msg) => Self::InvalidArgument(format!("{name}: {msg}")),
        }
    }
}

impl From<DomainError> for ComputeNodesError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::DuplicateName { name } => Self::DuplicateName { name },
            DomainError::NodeNotFound { group, name } => Self::NodeNotFound { group, name },
            DomainError::BackendUnavailable(msg) => Self::BackendUnavailable(msg),
            DomainError::Timeout {
                name,
                target,
                timeout,
            } => Self::Timeout {
                name,
                target,
                timeout,
            },
            DomainError::Unsupported { operation, backend } => {
                Self::UnsupportedOperation { operation, backend }
            }
            DomainError::Configuration(msg) => Self::Configuration(msg),
            DomainError::InvalidArgument(msg) => Self::InvalidArgument(msg),
            DomainError::Internal(_) => Self::Internal,
        }
    }
}
