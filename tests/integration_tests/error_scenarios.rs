//! Error scenario integration tests
//!
//! Tests failure modes of the HTTP API:
//! 1. Malformed request bodies
//! 2. Unknown and invalid ids
//! 3. Path traversal attempts
//! 4. Read errors on tracked files
//! 5. Port conflicts

use mo::server::{MoServer, ServerConfig, ServerError};
use serde_json::json;

use super::fixtures::{Docs, TestServer};

// ============================================================================
// Request Errors
// ============================================================================

#[tokio::test]
async fn test_malformed_body() {
    let server = TestServer::start_with(false).await;

    for (path, body) in [
        ("/_/api/files", "{\"path\":"),
        ("/_/api/files", "{\"group\":\"notes\"}"),
        ("/_/api/files/open", "{\"path\":\"a.md\"}"),
    ] {
        let response = server
            .client
            .post(server.url(path))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "{path} {body}");
    }

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_missing_path_is_bad_request() {
    let docs = Docs::new();
    let server = TestServer::start_with(false).await;

    let response = server
        .client
        .post(server.url("/_/api/files"))
        .json(&json!({ "path": docs.path("docs/nope.md") }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert!(response.text().await.unwrap().starts_with("file not found"));
    assert!(server.registry.groups().await.is_empty());

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_and_unknown_ids() {
    let server = TestServer::start_with(false).await;

    let cases = [
        ("/_/api/files/abc/content", 400),
        ("/_/api/files/-1/content", 400),
        ("/_/api/files/7/content", 404),
        ("/_/api/files/abc/raw/a.png", 400),
        ("/_/api/files/7/raw/a.png", 404),
    ];
    for (path, status) in cases {
        let response = server.client.get(server.url(path)).send().await.unwrap();
        assert_eq!(response.status(), status, "{path}");
    }

    server.shutdown().await.unwrap();
}

// ============================================================================
// Traversal
// ============================================================================

#[tokio::test]
async fn test_raw_traversal_is_forbidden() {
    let docs = Docs::new();
    let server = TestServer::start_with(false).await;
    let entry = server
        .registry
        .add_file(&docs.path("docs/design.md"), "default")
        .await
        .unwrap();

    // Encoded slashes survive URL normalisation on the client side
    let response = server
        .client
        .get(server.url(&format!("/_/api/files/{}/raw/..%2fprivate.txt", entry.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
    assert_eq!(response.text().await.unwrap(), "access denied");

    let response = server
        .client
        .get(server.url(&format!(
            "/_/api/files/{}/raw/img%2f..%2f..%2f..%2f..%2fetc%2fpasswd",
            entry.id
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_open_traversal_is_forbidden() {
    let docs = Docs::new();
    let server = TestServer::start_with(false).await;
    let entry = server
        .registry
        .add_file(&docs.path("docs/design.md"), "default")
        .await
        .unwrap();

    let response = server
        .client
        .post(server.url("/_/api/files/open"))
        .json(&json!({ "fileId": entry.id, "path": "../private.txt" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
    assert_eq!(server.registry.groups().await[0].files.len(), 1);

    server.shutdown().await.unwrap();
}

// ============================================================================
// I/O Errors
// ============================================================================

#[tokio::test]
async fn test_deleted_file_content_is_server_error() {
    let docs = Docs::new();
    let server = TestServer::start_with(false).await;
    let path = docs.path("docs/plan.md");
    let entry = server.registry.add_file(&path, "default").await.unwrap();
    std::fs::remove_file(&path).unwrap();

    let response = server
        .client
        .get(server.url(&format!("/_/api/files/{}/content", entry.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);

    // The server keeps serving
    let response = server.client.get(server.url("/_/api/groups")).send().await.unwrap();
    assert_eq!(response.status(), 200);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_port_conflict_is_fatal() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = taken.local_addr().unwrap().port();

    let config = ServerConfig::builder()
        .host("127.0.0.1")
        .port(port)
        .watch_files(false)
        .build()
        .unwrap();

    let result = MoServer::new(config)
        .unwrap()
        .start_with_shutdown(std::future::pending())
        .await;
    assert!(matches!(result, Err(ServerError::Bind { .. })));
}
