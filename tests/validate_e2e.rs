//! End-to-end validation over a real TCP listener with mocked predictors.

mod common;

use std::time::Duration;

use cashguard::{MockClassifierBackend, MockGenerativeBackend};
use common::JPEG_DATA_URL;
use common::harness::{TestServerConfig, spawn_test_server};
use common::http_client::TestClient;
use serde_json::{Value, json};

#[tokio::test]
async fn test_validate_happy_path() {
    let server = spawn_test_server(TestServerConfig {
        classifier: Some(MockClassifierBackend::with_label("real", Some(0.87))),
        ..TestServerConfig::default()
    })
    .await
    .expect("server starts");
    let client = TestClient::new(server.url());

    let resp = client.validate(JPEG_DATA_URL, None, None).await.unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.status_header, "validated");
    assert_eq!(resp.body["success"], json!(true));
    let result = &resp.body["result"];
    assert_eq!(result["denomination"], json!("$20"));
    assert_eq!(result["validity"], json!("Valid"));
    assert_eq!(result["confidence"], json!(90));
    assert_eq!(result["vertexValidity"], json!("Valid"));
    assert_eq!(result["vertexConfidence"], json!(87));
    assert_eq!(result["modelsDisagree"], json!(false));
}

#[tokio::test]
async fn test_prose_primary_reply_is_recovered() {
    let server = spawn_test_server(TestServerConfig {
        primary_reply: Some(MockGenerativeBackend::with_text(
            "The bill appears valid and well-printed, confidence: 88, denomination: $50. \
             I can see the watermark and the portrait.",
        )),
        ..TestServerConfig::default()
    })
    .await
    .expect("server starts");
    let client = TestClient::new(server.url());

    let resp = client.validate(JPEG_DATA_URL, None, None).await.unwrap();

    assert_eq!(resp.status, 200);
    let result = &resp.body["result"];
    assert_eq!(result["denomination"], json!("$50"));
    assert_eq!(result["confidence"], json!(88));
    assert_eq!(result["validity"], json!("Valid"));
    assert_eq!(result["features"], json!(["Watermark", "Portrait"]));
    assert_eq!(result["printQualityScore"], json!(70));
}

#[tokio::test]
async fn test_raw_base64_is_accepted() {
    let server = spawn_test_server(TestServerConfig::default())
        .await
        .expect("server starts");
    let client = TestClient::new(server.url());

    let resp = client.validate("/9j/4A==", None, None).await.unwrap();

    assert_eq!(resp.status, 200);
}

#[tokio::test]
async fn test_eleventh_call_is_rejected() {
    let server = spawn_test_server(TestServerConfig::default())
        .await
        .expect("server starts");
    let client = TestClient::new(server.url());

    for i in 0..10 {
        let resp = client
            .validate(JPEG_DATA_URL, None, Some("198.51.100.4"))
            .await
            .unwrap();
        assert_eq!(resp.status, 200, "call {i}");
    }

    let resp = client
        .validate(JPEG_DATA_URL, None, Some("198.51.100.4"))
        .await
        .unwrap();
    assert_eq!(resp.status, 429);
    assert_eq!(resp.body["success"], json!(false));

    let other = client
        .validate(JPEG_DATA_URL, None, Some("198.51.100.5"))
        .await
        .unwrap();
    assert_eq!(other.status, 200);
}

#[tokio::test]
async fn test_unconfigured_primary() {
    let server = spawn_test_server(TestServerConfig {
        primary_reply: None,
        ..TestServerConfig::default()
    })
    .await
    .expect("server starts");
    let client = TestClient::new(server.url());

    let resp = client.validate(JPEG_DATA_URL, None, None).await.unwrap();
    assert_eq!(resp.status, 500);
    assert_eq!(resp.body["error"], json!("Server configuration error"));

    let ready = client.get("/ready").await.unwrap();
    assert_eq!(ready.status, 503);

    let health = client.get("/api/health").await.unwrap();
    assert_eq!(health.status, 200);
    assert_eq!(health.body["service"], json!("cashguard"));
}

#[tokio::test]
async fn test_slow_classifier_does_not_block_response() {
    let server = spawn_test_server(TestServerConfig {
        classifier: Some(
            MockClassifierBackend::with_label("fake", Some(0.99))
                .with_delay(Duration::from_secs(5)),
        ),
        upstream_timeout: Duration::from_millis(200),
        ..TestServerConfig::default()
    })
    .await
    .expect("server starts");
    let client = TestClient::new(server.url());

    let resp = client.validate(JPEG_DATA_URL, None, None).await.unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["result"]["validity"], json!("Valid"));
    assert_eq!(resp.body["result"]["vertexValidity"], Value::Null);
}

#[tokio::test]
async fn test_primary_failure_hides_details_in_production() {
    let server = spawn_test_server(TestServerConfig {
        primary_reply: Some(MockGenerativeBackend::failing("API key not valid")),
        ..TestServerConfig::default()
    })
    .await
    .expect("server starts");
    let client = TestClient::new(server.url());

    let resp = client.validate(JPEG_DATA_URL, None, None).await.unwrap();

    assert_eq!(resp.status, 500);
    assert_eq!(resp.body["error"], json!("Failed to validate image"));
    assert!(resp.body.get("details").is_none());
}
