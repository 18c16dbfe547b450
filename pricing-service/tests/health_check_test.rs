mod common;

use common::TestApp;

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn().await;

    let response = app.get(&format!("{}/health", app.address)).await;
    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "pricing-service");
}

#[tokio::test]
async fn readiness_check_works() {
    let app = TestApp::spawn().await;

    let response = app.get(&format!("{}/ready", app.address)).await;
    assert!(response.status().is_success());
}

#[tokio::test]
async fn metrics_endpoint_serves_text() {
    let app = TestApp::spawn().await;

    let response = app.get(&format!("{}/metrics", app.address)).await;
    assert!(response.status().is_success());
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = TestApp::spawn().await;

    let response = app.get(&format!("{}/health", app.address)).await;
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(request_id.starts_with("req_"));
}

#[tokio::test]
async fn metrics_include_http_request_counts() {
    let app = TestApp::spawn().await;

    app.get(&format!("{}/health", app.address)).await;
    let body = app
        .get(&format!("{}/metrics", app.address))
        .await
        .text()
        .await
        .expect("Failed to read metrics");

    assert!(body.contains("http_requests_total"));
    assert!(body.contains("path=\"/health\""));
}
