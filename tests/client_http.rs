//! REST client tests against a mock Local REST API.
//!
//! Verifies request shapes (paths, headers, query strings, bodies) and the
//! mapping of backend statuses onto the error taxonomy.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use obsidian_mcp::config::ApiConfig;
use obsidian_mcp::models::EntryKind;
use obsidian_mcp::{Error, ErrorCode, ObsidianClient, VaultBackend};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "secret-key";

fn client_for(server: &MockServer) -> ObsidianClient {
    ObsidianClient::new(&ApiConfig::for_base_url(&server.uri(), KEY)).unwrap()
}

#[tokio::test]
async fn test_list_vault_root() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vault/"))
        .and(header("authorization", "Bearer secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": ["Daily/", "todo.md"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let entries = client_for(&server).list_files_in_vault().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].path, "Daily");
    assert_eq!(entries[0].kind, EntryKind::Folder);
    assert_eq!(entries[1].kind, EntryKind::File);
}

#[tokio::test]
async fn test_list_directory_prefixes_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vault/Projects/2024/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": ["plan.md"]})))
        .mount(&server)
        .await;

    let entries = client_for(&server)
        .list_files_in_dir("Projects/2024")
        .await
        .unwrap();
    assert_eq!(entries[0].path, "Projects/2024/plan.md");
}

#[tokio::test]
async fn test_get_file_contents_returns_raw_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vault/My%20Notes/idea.md"))
        .respond_with(ResponseTemplate::new(200).set_body_string("# Idea\n"))
        .mount(&server)
        .await;

    let text = client_for(&server)
        .get_file_contents("My Notes/idea.md")
        .await
        .unwrap();
    assert_eq!(text, "# Idea\n");
}

#[tokio::test]
async fn test_simple_search_sends_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search/simple/"))
        .and(query_param("query", "release notes"))
        .and(query_param("contextLength", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "filename": "a.md",
            "score": 0.5,
            "matches": [{"context": "the release notes", "match": {"start": 4, "end": 17}}]
        }])))
        .mount(&server)
        .await;

    let hits = client_for(&server).search("release notes", 25).await.unwrap();
    assert_eq!(hits[0].filename, "a.md");
    assert_eq!(hits[0].matches[0].span.start, 4);
}

#[tokio::test]
async fn test_writes_send_markdown_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vault/log.md"))
        .and(header("content-type", "text/markdown"))
        .and(body_string("- entry\n"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/vault/log.md"))
        .and(body_string("replaced"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.append_content("log.md", "- entry\n").await.unwrap();
    client.update_content("log.md", "replaced").await.unwrap();
}

#[tokio::test]
async fn test_jsonlogic_search_forwards_query() {
    let server = MockServer::start().await;
    let query = json!({"glob": ["*.md", {"var": "path"}]});
    Mock::given(method("POST"))
        .and(path("/search/"))
        .and(header("content-type", "application/vnd.olrapi.jsonlogic+json"))
        .and(body_json(query.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"filename": "a.md", "result": true},
            {"filename": "b.md", "result": true}
        ])))
        .mount(&server)
        .await;

    let hits = client_for(&server).search_json(&query).await.unwrap();
    let names: Vec<_> = hits.iter().map(|h| h.filename.as_str()).collect();
    assert_eq!(names, ["a.md", "b.md"]);
}

#[tokio::test]
async fn test_empty_read_is_no_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vault/empty.md"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_file_contents("empty.md")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoContent));
}

#[tokio::test]
async fn test_error_body_is_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vault/missing.md"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errorCode": 40400,
            "message": "File not found"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_file_contents("missing.md")
        .await
        .unwrap_err();
    match &err {
        Error::Backend {
            status,
            code,
            message,
        } => {
            assert_eq!(*status, 404);
            assert_eq!(*code, Some(40400));
            assert_eq!(message, "File not found");
        },
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn test_status_codes_map_onto_taxonomy() {
    let server = MockServer::start().await;
    for (file, status) in [("a.md", 401), ("b.md", 500), ("c.md", 400)] {
        Mock::given(method("GET"))
            .and(path(format!("/vault/{file}")))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
    }

    let client = client_for(&server);
    let code = |r: obsidian_mcp::Result<String>| r.unwrap_err().code();
    assert_eq!(code(client.get_file_contents("a.md").await), ErrorCode::Unauthorized);
    assert_eq!(code(client.get_file_contents("b.md").await), ErrorCode::InternalError);
    assert_eq!(code(client.get_file_contents("c.md").await), ErrorCode::BadRequest);
}

#[tokio::test]
async fn test_oversized_response_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vault/big.md"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(64)))
        .mount(&server)
        .await;

    let mut config = ApiConfig::for_base_url(&server.uri(), KEY);
    config.max_content_length = 16;
    let client = ObsidianClient::new(&config).unwrap();
    let err = client.get_file_contents("big.md").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InternalError);
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vault/slow.md"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let mut config = ApiConfig::for_base_url(&server.uri(), KEY);
    config.request_timeout = Duration::from_millis(100);
    let client = ObsidianClient::new(&config).unwrap();
    let err = client.get_file_contents("slow.md").await.unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }), "{err}");
}
