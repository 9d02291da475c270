// Integration tests for `InventoryClient` using wiremock.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use logdeck_api::{ContainerSummary, Error, InventoryClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, InventoryClient) {
    let server = MockServer::start().await;
    let transport = TransportConfig::parse(&server.uri(), Duration::from_secs(5)).unwrap();
    let client = InventoryClient::from_reqwest(transport, reqwest::Client::new());
    (server, client)
}

// ── Happy path ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_containers() {
    let (server, client) = setup().await;

    let body = json!([
        { "id": "a1b2c3d4e5f6", "name": "api-gateway" },
        { "id": "0f9e8d7c6b5a", "name": "postgres", "image": "postgres:16" },
    ]);

    Mock::given(method("GET"))
        .and(path("/api/v1/containers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let containers = client.list_containers().await.unwrap();

    assert_eq!(
        containers,
        vec![
            ContainerSummary {
                id: "a1b2c3d4e5f6".into(),
                name: "api-gateway".into(),
            },
            ContainerSummary {
                id: "0f9e8d7c6b5a".into(),
                name: "postgres".into(),
            },
        ]
    );
}

#[tokio::test]
async fn test_list_containers_empty() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/containers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert!(client.list_containers().await.unwrap().is_empty());
}

// ── Error paths ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_server_error_is_transport_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/containers"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client.list_containers().await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn test_not_found() {
    let (_server, client) = setup().await;

    // Nothing mounted: wiremock answers 404.
    let err = client.list_containers().await.unwrap_err();
    assert!(err.is_not_found(), "got {err:?}");
}

#[tokio::test]
async fn test_malformed_body_keeps_raw_text() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/containers"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"containers": []}"#))
        .mount(&server)
        .await;

    match client.list_containers().await.unwrap_err() {
        Error::Deserialization { body, .. } => assert_eq!(body, r#"{"containers": []}"#),
        other => panic!("expected Deserialization, got {other:?}"),
    }
}
