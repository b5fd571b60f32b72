//! Conversion tables from backend-native status codes to [`NodeState`].
//!
//! Each backend owns one table. Lookups are exact, case-sensitive matches on
//! the code the backend reports; codes missing from the table normalize to
//! [`NodeState::Unknown`].

use crate::models::NodeState;

/// Explicit status conversion table for one backend vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTable {
    vocabulary: &'static str,
    entries: &'static [(&'static str, NodeState)],
}

impl StatusTable {
    #[must_use]
    pub const fn new(
        vocabulary: &'static str,
        entries: &'static [(&'static str, NodeState)],
    ) -> Self {
        Self {
            vocabulary,
            entries,
        }
    }

    /// Name of the native vocabulary, for diagnostics.
    #[must_use]
    pub const fn vocabulary(&self) -> &'static str {
        self.vocabulary
    }

    #[must_use]
    pub fn lookup(&self, code: &str) -> Option<NodeState> {
        self.entries
            .iter()
            .find(|(native, _)| *native == code)
            .map(|(_, state)| *state)
    }

    /// Native codes in table order.
    pub fn codes(&self) -> impl Iterator<Item = &'static str> {
        self.entries.iter().map(|(native, _)| *native)
    }
}

/// Azure Resource Manager instance-view codes.
///
/// Deallocation is Azure's suspend: the VM keeps its disks but releases
/// compute, so it normalizes to the same states as a plain stop.
pub const AZURE_ARM: StatusTable = StatusTable::new(
    "azure-arm",
    &[
        ("PowerState/starting", NodeState::Starting),
        ("PowerState/running", NodeState::Running),
        ("PowerState/stopping", NodeState::Stopping),
        ("PowerState/stopped", NodeState::Stopped),
        ("PowerState/deallocating", NodeState::Stopping),
        ("PowerState/deallocated", NodeState::Stopped),
        ("ProvisioningState/creating", NodeState::Starting),
        ("ProvisioningState/deleting", NodeState::Stopping),
        ("ProvisioningState/deleted", NodeState::Terminated),
    ],
);

/// EC2 `InstanceStateName` codes.
pub const EC2: StatusTable = StatusTable::new(
    "ec2",
    &[
        ("pending", NodeState::Starting),
        ("running", NodeState::Running),
        ("stopping", NodeState::Stopping),
        ("stopped", NodeState::Stopped),
        ("shutting-down", NodeState::Stopping),
        ("terminated", NodeState::Terminated),
    ],
);
