//! Join-or-start tests against a real server
//!
//! 1. Probing a port with no server
//! 2. Joining with a new group
//! 3. Joining an existing group is idempotent per file

use std::time::Duration;

use mo::server::{JoinCoordinator, JoinOutcome};

use super::fixtures::{Docs, TestServer};

const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

#[tokio::test]
async fn test_no_server_means_serve() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    let coordinator = JoinCoordinator::new(address, PROBE_TIMEOUT);
    assert!(coordinator.probe().await.is_none());

    let docs = Docs::new();
    let outcome = coordinator.join(&[docs.path("docs/design.md")], "default").await;
    assert!(matches!(outcome, JoinOutcome::Serve));
}

#[tokio::test]
async fn test_join_new_group() {
    let docs = Docs::new();
    let server = TestServer::start_with(false).await;
    server
        .registry
        .add_file(&docs.path("docs/design.md"), "default")
        .await
        .unwrap();

    let coordinator = JoinCoordinator::new(server.address.clone(), PROBE_TIMEOUT);
    let groups = coordinator.probe().await.unwrap();
    assert_eq!(groups.len(), 1);

    let outcome = coordinator
        .join(&[docs.path("docs/plan.md")], "notes")
        .await;
    let JoinOutcome::Joined {
        new_group,
        added,
        failed,
    } = outcome
    else {
        panic!("expected to join the running server");
    };

    assert!(new_group);
    assert!(failed.is_empty());
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].id, 2);

    let groups = server.registry.groups().await;
    assert_eq!(groups[1].name, "notes");
    assert_eq!(groups[1].files[0].path, docs.path("docs/plan.md"));
    assert_eq!(
        coordinator.group_url("notes"),
        format!("http://{}/notes", server.address)
    );

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_join_existing_group_is_idempotent() {
    let docs = Docs::new();
    let server = TestServer::start_with(false).await;
    let existing = server
        .registry
        .add_file(&docs.path("docs/design.md"), "default")
        .await
        .unwrap();

    let coordinator = JoinCoordinator::new(server.address.clone(), PROBE_TIMEOUT);
    let outcome = coordinator.join(&[docs.path("docs/design.md")], "").await;

    let JoinOutcome::Joined {
        new_group, added, ..
    } = outcome
    else {
        panic!("expected to join the running server");
    };

    assert!(!new_group);
    assert_eq!(added[0].id, existing.id);
    assert_eq!(server.registry.groups().await[0].files.len(), 1);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_join_skips_vanished_file() {
    let docs = Docs::new();
    let server = TestServer::start_with(false).await;

    let vanished = docs.path("docs/gone.md");
    let coordinator = JoinCoordinator::new(server.address.clone(), PROBE_TIMEOUT);
    let outcome = coordinator
        .join(&[vanished.clone(), docs.path("docs/plan.md")], "default")
        .await;

    let JoinOutcome::Joined { added, failed, .. } = outcome else {
        panic!("expected to join the running server");
    };

    assert_eq!(added.len(), 1);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, vanished);

    server.shutdown().await.unwrap();
}
