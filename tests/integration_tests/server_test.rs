//! Server scenarios over real HTTP
//!
//! 1. Registering files and listing groups
//! 2. Reading content and sibling assets
//! 3. Live-reload delivery (registry changes and file writes)
//! 4. Shutdown drain of open streams

use std::io::Write;
use std::time::Duration;

use mo::server::api::FileContent;
use mo::server::{FileEntry, Group};
use serde_json::json;

use super::fixtures::{next_event, Docs, TestServer, PLAN_MARKDOWN};

// ============================================================================
// Registry over HTTP
// ============================================================================

#[tokio::test]
async fn test_groups_scenario() {
    let docs = Docs::new();
    let server = TestServer::start_with(false).await;

    let a: FileEntry = server
        .client
        .post(server.url("/_/api/files"))
        .json(&json!({ "path": docs.path("docs/design.md") }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(a.id, 1);
    assert_eq!(a.name, "design.md");

    let groups: Vec<Group> = server
        .client
        .get(server.url("/_/api/groups"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "default");
    assert_eq!(groups[0].files.len(), 1);

    let b: FileEntry = server
        .client
        .post(server.url("/_/api/files"))
        .json(&json!({ "path": docs.path("docs/plan.md"), "group": "notes" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(b.id, 2);

    let groups: Vec<Group> = server
        .client
        .get(server.url("/_/api/groups"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, ["default", "notes"]);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_group_listing_hides_paths() {
    let docs = Docs::new();
    let server = TestServer::start_with(false).await;
    server
        .registry
        .add_file(&docs.path("docs/design.md"), "default")
        .await
        .unwrap();

    let body: serde_json::Value = server
        .client
        .get(server.url("/_/api/groups"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(
        body,
        json!([{ "name": "default", "files": [{ "name": "design.md", "id": 1 }] }])
    );

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_content_and_raw_assets() {
    let docs = Docs::new();
    let server = TestServer::start_with(false).await;
    let entry = server
        .registry
        .add_file(&docs.path("docs/design.md"), "default")
        .await
        .unwrap();

    let content: FileContent = server
        .client
        .get(server.url(&format!("/_/api/files/{}/content", entry.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(content.content.starts_with("# Design notes"));
    assert_eq!(content.base_dir, docs.path("docs").to_string_lossy());

    let response = server
        .client
        .get(server.url(&format!("/_/api/files/{}/raw/img/flow.png", entry.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "image/png");
    assert_eq!(response.bytes().await.unwrap().as_ref(), b"\x89PNG\r\n\x1a\n");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_open_relative_link() {
    let docs = Docs::new();
    let server = TestServer::start_with(false).await;
    let design = server
        .registry
        .add_file(&docs.path("docs/design.md"), "notes")
        .await
        .unwrap();

    let plan: FileEntry = server
        .client
        .post(server.url("/_/api/files/open"))
        .json(&json!({ "fileId": design.id, "path": "plan.md" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(plan.name, "plan.md");

    let groups = server.registry.groups().await;
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "notes");
    assert_eq!(groups[0].files.len(), 2);

    let content: FileContent = server
        .client
        .get(server.url(&format!("/_/api/files/{}/content", plan.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(content.content, PLAN_MARKDOWN);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_spa_routes() {
    let server = TestServer::start_with(false).await;

    for path in ["/", "/notes", "/some/deep/link"] {
        let response = server.client.get(server.url(path)).send().await.unwrap();
        assert_eq!(response.status(), 200, "{path}");
        assert!(response.text().await.unwrap().contains("<title>mo</title>"));
    }

    server.shutdown().await.unwrap();
}

// ============================================================================
// Live Reload
// ============================================================================

#[tokio::test]
async fn test_update_event_on_new_file() {
    let docs = Docs::new();
    let server = TestServer::start_with(false).await;

    let mut stream = server.client.get(server.url("/_/events")).send().await.unwrap();
    assert_eq!(stream.status(), 200);
    assert_eq!(stream.headers()["content-type"], "text/event-stream");
    assert_eq!(stream.headers()["cache-control"], "no-cache");

    server
        .client
        .post(server.url("/_/api/files"))
        .json(&json!({ "path": docs.path("docs/design.md") }))
        .send()
        .await
        .unwrap();

    let mut buffer = String::new();
    let frame = next_event(&mut stream, &mut buffer).await.unwrap();
    assert_eq!(frame, "event: update\ndata: {}\n\n");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_file_write_produces_file_changed() {
    let docs = Docs::new();
    let server = TestServer::start().await;
    let path = docs.path("docs/design.md");
    let entry = server.registry.add_file(&path, "default").await.unwrap();
    assert_eq!(entry.id, 1);

    let mut stream = server.client.get(server.url("/_/events")).send().await.unwrap();

    // Give the platform watcher a moment to settle before writing
    tokio::time::sleep(Duration::from_millis(200)).await;

    // One write call without truncation is one native modification; a
    // truncating write may legitimately surface as two
    let mut file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.write_all(b"# Design notes\n\nUpdated with a longer body than before.\n")
        .unwrap();
    drop(file);

    let mut buffer = String::new();
    let frame = next_event(&mut stream, &mut buffer).await.unwrap();
    assert_eq!(frame, "event: file-changed\ndata: {\"id\":1}\n\n");

    let extra = tokio::time::timeout(
        Duration::from_millis(500),
        next_event(&mut stream, &mut buffer),
    )
    .await;
    assert!(extra.is_err(), "unexpected second frame: {extra:?}");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_same_file_in_two_groups_notifies_both_ids() {
    let docs = Docs::new();
    let server = TestServer::start_with(false).await;
    let path = docs.path("docs/plan.md");

    let first = server.registry.add_file(&path, "default").await.unwrap();
    let second = server.registry.add_file(&path, "notes").await.unwrap();
    assert_ne!(first.id, second.id);

    let mut stream = server.client.get(server.url("/_/events")).send().await.unwrap();
    server.registry.notify_file_written(&path).await;

    let mut buffer = String::new();
    let one = next_event(&mut stream, &mut buffer).await.unwrap();
    let two = next_event(&mut stream, &mut buffer).await.unwrap();
    assert_eq!(one, format!("event: file-changed\ndata: {{\"id\":{}}}\n\n", first.id));
    assert_eq!(two, format!("event: file-changed\ndata: {{\"id\":{}}}\n\n", second.id));

    server.shutdown().await.unwrap();
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn test_shutdown_ends_open_streams() {
    let server = TestServer::start().await;
    let registry = server.registry.clone();

    let mut stream = server.client.get(server.url("/_/events")).send().await.unwrap();
    assert_eq!(registry.subscriber_count().await, 1);

    let result = server.shutdown().await;
    assert!(result.is_ok());

    let mut buffer = String::new();
    assert!(next_event(&mut stream, &mut buffer).await.is_none());
    assert_eq!(registry.subscriber_count().await, 0);
}

#[tokio::test]
async fn test_disconnected_stream_is_unsubscribed() {
    let server = TestServer::start_with(false).await;

    let stream = server.client.get(server.url("/_/events")).send().await.unwrap();
    assert_eq!(server.registry.subscriber_count().await, 1);
    drop(stream);

    // The sink goes away once the server notices the closed connection
    let mut gone = false;
    for _ in 0..50 {
        server.registry.publish(mo::server::Event::Update).await;
        if server.registry.subscriber_count().await == 0 {
            gone = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(gone);

    server.shutdown().await.unwrap();
}
