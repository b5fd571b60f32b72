//! Translation of backend records into normalized [`Node`] values.

use compute_nodes_sdk::{BackendNodeRecord, Node, NodeCollection, NodeState, StatusTable};

use super::DomainError;

/// Maps a native status code through `table`.
///
/// Codes the table does not know become [`NodeState::Unknown`] and are
/// logged, since they usually mean the backend grew a new state.
#[must_use]
pub fn normalize_state(table: &StatusTable, code: &str) -> NodeState {
    table.lookup(code).unwrap_or_else(|| {
        tracing::warn!(
            vocabulary = table.vocabulary(),
            code,
            "unmapped backend status code"
        );
        NodeState::Unknown
    })
}

#[must_use]
pub fn normalize_record(cloud: &str, table: &StatusTable, record: BackendNodeRecord) -> Node {
    let state = normalize_state(table, &record.status);
    Node {
        cloud_id: record.cloud_id,
        cloud: cloud.to_owned(),
        name: record.name,
        region: record.region,
        size: record.size,
        state,
        public_ips: record.public_ips,
        private_ips: record.private_ips,
    }
}

/// Builds a collection, refusing to silently drop a node whose name repeats.
///
/// # Errors
///
/// Returns `DomainError::DuplicateName` for the first repeated name.
pub fn normalize_collection(
    cloud: &str,
    table: &StatusTable,
    records: Vec<BackendNodeRecord>,
) -> Result<NodeCollection, DomainError> {
    let mut nodes = NodeCollection::new();
    for record in records {
        nodes
            .try_insert(normalize_record(cloud, table, record))
            .map_err(|dup| {
                tracing::warn!(name = %dup.name, cloud_id = %dup.cloud_id, "backend reported duplicate node name");
                DomainError::DuplicateName { name: dup.name }
            })?;
    }
    Ok(nodes)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use compute_nodes_sdk::status_tables::{AZURE_ARM, EC2};
    use tracing_test::traced_test;

    use super::*;

    fn record(name: &str, group: &str, status: &str) -> BackendNodeRecord {
        BackendNodeRecord {
            cloud_id: format!("/{group}/{name}"),
            name: name.to_owned(),
            group: group.to_owned(),
            region: "eastus".to_owned(),
            size: "Standard_B1s".to_owned(),
            status: status.to_owned(),
            public_ips: vec!["52.0.0.1".to_owned()],
            private_ips: vec!["10.0.0.4".to_owned()],
        }
    }

    #[test]
    fn record_fields_carry_over() {
        let node = normalize_record("azure", &AZURE_ARM, record("web", "rg", "PowerState/running"));
        assert_eq!(node.cloud, "azure");
        assert_eq!(node.cloud_id, "/rg/web");
        assert_eq!(node.state, NodeState::Running);
        assert_eq!(node.public_ips, ["52.0.0.1"]);
        assert_eq!(node.private_ips, ["10.0.0.4"]);
    }

    #[test]
    fn same_code_depends_on_table() {
        assert_eq!(normalize_state(&EC2, "running"), NodeState::Running);
        assert_eq!(normalize_state(&EC2, "pending"), NodeState::Starting);
        assert_eq!(normalize_state(&AZURE_ARM, "PowerState/deallocated"), NodeState::Stopped);
    }

    #[test]
    #[traced_test]
    fn unmapped_code_is_unknown_and_logged() {
        assert_eq!(normalize_state(&AZURE_ARM, "PowerState/hibernated"), NodeState::Unknown);
        assert!(logs_contain("unmapped backend status code"));
        assert!(logs_contain("PowerState/hibernated"));
    }

    #[test]
    fn duplicate_names_across_groups_fail() {
        let records = vec![
            record("web", "rg-a", "PowerState/running"),
            record("web", "rg-b", "PowerState/stopped"),
        ];
        let err = normalize_collection("azure", &AZURE_ARM, records).unwrap_err();
        assert!(matches!(err, DomainError::DuplicateName { ref name } if name == "web"));
    }

    #[test]
    fn collection_is_keyed_by_name() {
        let records = vec![
            record("web", "rg", "PowerState/running"),
            record("db", "rg", "PowerState/stopped"),
        ];
        let nodes = normalize_collection("azure", &AZURE_ARM, records).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes.get("db").unwrap().state, NodeState::Stopped);
    }
}
