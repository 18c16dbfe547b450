//! Integration tests for promotion codes and redemption.

mod common;

use common::{id_of, TestApp};
use serde_json::{json, Value};

async fn redeem(app: &TestApp, code: &str) -> reqwest::Response {
    app.post(
        &app.url("/promotions/redeem"),
        &json!({ "code": code, "asOf": "2026-07-01" }),
    )
    .await
}

#[tokio::test]
async fn redemption_stops_at_usage_limit() {
    let app = TestApp::spawn().await;
    app.create(
        "/promotions",
        json!({
            "code": "SUMMER20",
            "type": "percentage",
            "valueEntry": "20",
            "usageLimit": 5
        }),
    )
    .await;

    for expected in 1..=5 {
        let response = redeem(&app, "SUMMER20").await;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.expect("Failed to parse response");
        assert_eq!(body["usageCount"], expected);
    }

    let response = redeem(&app, "SUMMER20").await;
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["violation"]["kind"], "promotion_usage_limit_exceeded");
    assert_eq!(body["violation"]["usageLimit"], 5);
}

#[tokio::test]
async fn codes_are_normalized_and_unique_per_campground() {
    let app = TestApp::spawn().await;
    let promotion = app
        .create(
            "/promotions",
            json!({ "code": "  fall10 ", "type": "flat", "value": "1000" }),
        )
        .await;
    assert_eq!(promotion["code"], "FALL10");
    assert_eq!(promotion["display"], "10.00");

    let response = app
        .post(
            &app.url("/promotions"),
            &json!({ "code": "FALL10", "type": "percentage", "value": "10" }),
        )
        .await;
    assert_eq!(response.status(), 409);

    // another campground may reuse the code
    let other = uuid::Uuid::new_v4();
    let response = app
        .post(
            &app.url_for(other, "/promotions"),
            &json!({ "code": "FALL10", "type": "percentage", "value": "10" }),
        )
        .await;
    assert_eq!(response.status(), 201);

    let response = redeem(&app, "fall10").await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn inactive_and_unknown_codes_are_rejected() {
    let app = TestApp::spawn().await;
    app.create(
        "/promotions",
        json!({
            "code": "PAUSED",
            "type": "percentage",
            "value": "15",
            "isActive": false
        }),
    )
    .await;

    let response = redeem(&app, "PAUSED").await;
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["violation"]["kind"], "promotion_inactive");

    let response = redeem(&app, "MISSING").await;
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["violation"]["kind"], "promotion_unknown");
}

#[tokio::test]
async fn not_yet_valid_code_is_rejected() {
    let app = TestApp::spawn().await;
    app.create(
        "/promotions",
        json!({
            "code": "AUTUMN",
            "type": "percentage",
            "value": "10",
            "validFrom": "2026-09-01",
            "validTo": "2026-11-30"
        }),
    )
    .await;

    let response = redeem(&app, "AUTUMN").await;
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["violation"]["kind"], "promotion_not_yet_valid");
}

#[tokio::test]
async fn update_never_resets_usage_and_redeemed_code_cannot_be_deleted() {
    let app = TestApp::spawn().await;
    let promotion = app
        .create(
            "/promotions",
            json!({ "code": "LOYAL", "type": "percentage", "value": "5" }),
        )
        .await;
    let url = app.url(&format!("/promotions/{}", id_of(&promotion)));

    assert_eq!(redeem(&app, "LOYAL").await.status(), 200);

    let response = app
        .patch(&url, &json!({ "usageCount": 0, "description": "Returning guests" }))
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["usageCount"], 1);
    assert_eq!(body["description"], "Returning guests");

    let response = app.delete(&url).await;
    assert_eq!(response.status(), 409);

    let response = app.patch(&url, &json!({ "isActive": false })).await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn unused_promotion_can_be_deleted() {
    let app = TestApp::spawn().await;
    let promotion = app
        .create(
            "/promotions",
            json!({ "code": "ONEOFF", "type": "flat", "valueEntry": "$5" }),
        )
        .await;
    let url = app.url(&format!("/promotions/{}", id_of(&promotion)));

    assert_eq!(app.delete(&url).await.status(), 204);
    assert_eq!(app.get(&url).await.status(), 404);
}
