#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for node lifecycle operations against the in-memory backend

mod common;

use std::time::Duration;

use common::{GROUP, harness, harness_with, manager_config, plugin_config, seeded};
use compute_nodes_sdk::{ComputeNodesError, CreateNodeRequest, NodeState, NodeTarget};
use inmemory_compute_plugin::SeedState;

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn test_create_returns_running_node_with_requested_name() {
    let h = harness();

    let node = h
        .client
        .create(CreateNodeRequest::new("web").with_size("Standard_B1s"))
        .await
        .unwrap();

    assert_eq!(node.name, "web");
    assert!(matches!(node.state, NodeState::Starting | NodeState::Running));
    assert_eq!(node.cloud, "inmemory");
    assert_eq!(node.size, "Standard_B1s");
    assert_eq!(node.region, "eastus");
    assert_eq!(node.private_ips, ["10.0.0.4"]);
    assert!(!node.cloud_id.is_empty());
}

#[tokio::test]
async fn test_create_uses_default_image_and_size() {
    let h = harness();

    let node = h.client.create(CreateNodeRequest::new("web")).await.unwrap();

    assert_eq!(node.size, "Standard_DS1_v2");
}

#[tokio::test]
async fn test_create_with_public_ip_option() {
    let h = harness();

    let node = h
        .client
        .create(CreateNodeRequest::new("web").with_option("public_ip", true))
        .await
        .unwrap();

    assert_eq!(node.public_ips.len(), 1);
}

#[tokio::test]
async fn test_second_create_with_same_name_is_rejected() {
    let h = harness();
    let first = h.client.create(CreateNodeRequest::new("web")).await.unwrap();

    let err = h
        .client
        .create(CreateNodeRequest::new("web"))
        .await
        .unwrap_err();
    assert!(err.is_duplicate_name());

    let nodes = h.client.list().await.unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes.get("web").unwrap().cloud_id, first.cloud_id);
}

#[tokio::test]
async fn test_concurrent_creates_of_one_name_yield_one_node() {
    let h = harness();

    let (a, b) = tokio::join!(
        h.client.create(CreateNodeRequest::new("web")),
        h.client.create(CreateNodeRequest::new("web")),
    );

    assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
    let failed = a.err().or(b.err()).unwrap();
    assert!(failed.is_duplicate_name());
    assert_eq!(h.client.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_rejects_empty_name_and_unknown_size() {
    let h = harness();

    let err = h.client.create(CreateNodeRequest::new("  ")).await.unwrap_err();
    assert!(matches!(err, ComputeNodesError::InvalidArgument(_)));

    let err = h
        .client
        .create(CreateNodeRequest::new("web").with_size("Standard_X99"))
        .await
        .unwrap_err();
    assert!(matches!(err, ComputeNodesError::InvalidArgument(m) if m.contains("Standard_X99")));
    assert_eq!(h.backend.node_count(), 0);
}

#[tokio::test]
async fn test_create_with_zero_timeout_is_rejected_before_provisioning() {
    let h = harness();

    let err = h
        .client
        .create(CreateNodeRequest::new("web").with_timeout(Duration::ZERO))
        .await
        .unwrap_err();

    assert!(matches!(err, ComputeNodesError::InvalidArgument(ref m) if m.contains("timeout")));
    assert_eq!(h.backend.node_count(), 0);
}

#[tokio::test]
async fn test_create_without_default_size_is_configuration_error() {
    let h = harness_with(
        compute_nodes::ComputeNodesConfig {
            default_size: None,
            ..manager_config()
        },
        plugin_config(),
    );

    let err = h.client.create(CreateNodeRequest::new("web")).await.unwrap_err();
    assert!(matches!(err, ComputeNodesError::Configuration(_)));
}

#[tokio::test]
async fn test_create_times_out_when_node_never_settles() {
    let h = harness();
    h.backend.hold_in_transition(GROUP, "web");

    let err = h
        .client
        .create(CreateNodeRequest::new("web").with_timeout(Duration::from_millis(50)))
        .await
        .unwrap_err();

    let ComputeNodesError::Timeout {
        name,
        target,
        timeout,
    } = err
    else {
        panic!("expected a timeout");
    };
    assert_eq!(name, "web");
    assert_eq!(target, NodeState::Running);
    assert_eq!(timeout, Duration::from_millis(50));

    // The node exists and keeps settling once released.
    h.backend.release(GROUP, "web");
    let node = h.client.start(&NodeTarget::named("web")).await.unwrap();
    assert_eq!(node.state, NodeState::Running);
}

// =============================================================================
// Start / Stop / Restart
// =============================================================================

#[tokio::test]
async fn test_stop_then_start() {
    let h = seeded(&[("web", SeedState::Running)]);
    let target = NodeTarget::named("web");

    let stopped = h.client.stop(&target).await.unwrap();
    assert_eq!(stopped.state, NodeState::Stopped);

    let started = h.client.start(&target).await.unwrap();
    assert_eq!(started.state, NodeState::Running);
    assert_eq!(started.cloud_id, stopped.cloud_id);
}

#[tokio::test]
async fn test_stop_without_arguments_acts_on_default_node_only() {
    let h = seeded(&[("web", SeedState::Running), ("db", SeedState::Running)]);

    let node = h.client.stop(&NodeTarget::default()).await.unwrap();
    assert_eq!(node.name, "web");

    let nodes = h.client.info(None).await.unwrap();
    assert_eq!(nodes.get("web").unwrap().state, NodeState::Stopped);
    assert_eq!(nodes.get("db").unwrap().state, NodeState::Running);
}

#[tokio::test]
async fn test_missing_default_node_is_configuration_error() {
    let h = harness_with(
        compute_nodes::ComputeNodesConfig {
            default_node: None,
            ..manager_config()
        },
        plugin_config(),
    );

    let err = h.client.stop(&NodeTarget::default()).await.unwrap_err();
    assert!(matches!(err, ComputeNodesError::Configuration(_)));
}

#[tokio::test]
async fn test_restart_running_node() {
    let h = seeded(&[("web", SeedState::Running)]);

    let node = h.client.restart(&NodeTarget::named("web")).await.unwrap();
    assert_eq!(node.state, NodeState::Running);
}

#[tokio::test]
async fn test_restart_stopped_node_is_rejected() {
    let h = seeded(&[("web", SeedState::Stopped)]);

    let err = h.client.restart(&NodeTarget::named("web")).await.unwrap_err();
    assert!(matches!(err, ComputeNodesError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_stop_times_out_when_node_never_settles() {
    let h = harness_with(
        compute_nodes::ComputeNodesConfig {
            timeout: Duration::from_millis(50),
            ..manager_config()
        },
        inmemory_compute_plugin::InMemoryComputePluginConfig {
            nodes: vec![common::seed("web", GROUP, SeedState::Running)],
            ..plugin_config()
        },
    );
    h.backend.hold_in_transition(GROUP, "web");

    let err = h.client.stop(&NodeTarget::named("web")).await.unwrap_err();

    assert!(matches!(
        err,
        ComputeNodesError::Timeout { ref name, target: NodeState::Stopped, .. } if name == "web"
    ));
}

#[tokio::test]
async fn test_calls_on_same_node_are_serialized() {
    let h = seeded(&[("web", SeedState::Running)]);
    h.backend.hold_in_transition(GROUP, "web");

    let client = std::sync::Arc::clone(&h.client);
    let stop = tokio::spawn(async move { client.stop(&NodeTarget::named("web")).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    let client = std::sync::Arc::clone(&h.client);
    let start = tokio::spawn(async move { client.start(&NodeTarget::named("web")).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!stop.is_finished());
    assert!(!start.is_finished(), "start must queue behind the pending stop");

    h.backend.release(GROUP, "web");
    let stopped = stop.await.unwrap().unwrap();
    assert_eq!(stopped.state, NodeState::Stopped);
    let started = start.await.unwrap().unwrap();
    assert_eq!(started.state, NodeState::Running);
}

#[tokio::test]
async fn test_start_unknown_node_is_not_found() {
    let h = harness();

    let err = h.client.start(&NodeTarget::named("ghost")).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(
        err,
        ComputeNodesError::NodeNotFound { ref group, ref name } if group == GROUP && name == "ghost"
    ));
}

#[tokio::test]
async fn test_start_in_other_group_is_not_found() {
    let h = seeded(&[("web", SeedState::Stopped)]);

    let err = h
        .client
        .start(&NodeTarget::named("web").in_group("other"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

// =============================================================================
// Destroy
// =============================================================================

#[tokio::test]
async fn test_destroy_twice_succeeds_both_times() {
    let h = seeded(&[("web", SeedState::Running)]);
    let target = NodeTarget::named("web");

    let destroyed = h.client.destroy(&target).await.unwrap().unwrap();
    assert_eq!(destroyed.name, "web");
    assert_eq!(destroyed.state, NodeState::Terminated);
    assert!(h.client.list().await.unwrap().is_empty());

    assert!(h.client.destroy(&target).await.unwrap().is_none());
}

#[tokio::test]
async fn test_destroy_times_out_when_deletion_hangs() {
    let h = harness_with(
        compute_nodes::ComputeNodesConfig {
            timeout: Duration::from_millis(50),
            ..manager_config()
        },
        inmemory_compute_plugin::InMemoryComputePluginConfig {
            nodes: vec![common::seed("web", GROUP, SeedState::Running)],
            ..plugin_config()
        },
    );
    h.backend.hold_in_transition(GROUP, "web");

    let err = h.client.destroy(&NodeTarget::named("web")).await.unwrap_err();
    assert!(matches!(
        err,
        ComputeNodesError::Timeout { target: NodeState::Terminated, .. }
    ));
}

// =============================================================================
// Backend failures
// =============================================================================

#[tokio::test]
async fn test_unavailable_backend_is_retryable() {
    let h = seeded(&[("web", SeedState::Running)]);
    h.backend.set_available(false);

    let err = h.client.stop(&NodeTarget::named("web")).await.unwrap_err();
    assert!(err.is_retryable());
    let err = h.client.list().await.unwrap_err();
    assert!(matches!(err, ComputeNodesError::BackendUnavailable(_)));

    h.backend.set_available(true);
    assert_eq!(
        h.client.stop(&NodeTarget::named("web")).await.unwrap().state,
        NodeState::Stopped
    );
}

#[tokio::test]
async fn test_operations_on_different_nodes_run_concurrently() {
    let h = seeded(&[("a", SeedState::Running), ("b", SeedState::Running)]);
    h.backend.hold_in_transition(GROUP, "a");

    let client = std::sync::Arc::clone(&h.client);
    let stuck = tokio::spawn(async move { client.stop(&NodeTarget::named("a")).await });

    let other = tokio::time::timeout(
        Duration::from_secs(1),
        h.client.stop(&NodeTarget::named("b")),
    )
    .await
    .expect("b must not wait behind a");
    assert_eq!(other.unwrap().state, NodeState::Stopped);

    h.backend.release(GROUP, "a");
    assert_eq!(stuck.await.unwrap().unwrap().state, NodeState::Stopped);
}
