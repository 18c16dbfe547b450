//! Integration tests for stay admission: blackouts, stay length, promotions.

mod common;

use common::{id_of, TestApp};
use serde_json::{json, Value};

async fn admit(app: &TestApp, body: Value) -> Value {
    let response = app.post(&app.url("/admissions"), &body).await;
    assert_eq!(response.status(), 200);
    response.json().await.expect("Failed to parse response")
}

fn stay(site_class: &str, arrival: &str, departure: &str, lead_time_days: i64) -> Value {
    json!({
        "siteClassId": site_class,
        "siteId": "A1",
        "arrivalDate": arrival,
        "departureDate": departure,
        "leadTimeDays": lead_time_days,
        "asOf": "2026-06-01"
    })
}

#[tokio::test]
async fn default_limits_admit_short_stay() {
    let app = TestApp::spawn().await;

    let body = admit(&app, stay("TENT", "2026-07-10", "2026-07-13", 30)).await;

    assert_eq!(body["admitted"], true);
    assert_eq!(body["nights"], 3);
    assert_eq!(body["bounds"]["minNights"], 1);
    assert_eq!(body["bounds"]["maxNights"], 28);
    assert!(body["bounds"]["minRuleId"].is_null());
    assert!(body.get("violation").is_none());
    // no base rate configured, so no preview
    assert!(body.get("quote").is_none());
}

#[tokio::test]
async fn scoped_stay_rule_applies_unless_bypassed() {
    let app = TestApp::spawn().await;
    let rule = app
        .create(
            "/stay-rules",
            json!({
                "name": "RV weekly minimum",
                "minNights": 7,
                "maxNights": 21,
                "siteClasses": ["RV"],
                "ignoreDaysBefore": 14
            }),
        )
        .await;

    let rejected = admit(&app, stay("RV", "2026-07-10", "2026-07-13", 20)).await;
    assert_eq!(rejected["admitted"], false);
    assert_eq!(rejected["violation"]["kind"], "stay_too_short");
    assert_eq!(rejected["violation"]["minNights"], 7);
    assert_eq!(rejected["violation"]["ruleId"], rule["id"]);
    assert_eq!(rejected["bounds"]["minNights"], 7);
    assert_eq!(rejected["bounds"]["maxNights"], 21);

    let last_minute = admit(&app, stay("RV", "2026-07-10", "2026-07-13", 5)).await;
    assert_eq!(last_minute["admitted"], true);
    assert_eq!(last_minute["bounds"]["minNights"], 1);

    // other classes are never restricted by the RV rule
    let tent = admit(&app, stay("TENT", "2026-07-10", "2026-07-13", 20)).await;
    assert_eq!(tent["admitted"], true);
}

#[tokio::test]
async fn overlapping_stay_rules_intersect() {
    let app = TestApp::spawn().await;
    app.create(
        "/stay-rules",
        json!({ "name": "Season", "minNights": 2, "maxNights": 14 }),
    )
    .await;
    let holiday = app
        .create(
            "/stay-rules",
            json!({
                "name": "Holiday week",
                "minNights": 3,
                "maxNights": 7,
                "dateRanges": [{ "start": "2026-07-01", "end": "2026-07-07" }]
            }),
        )
        .await;

    let body = admit(&app, stay("RV", "2026-07-03", "2026-07-05", 30)).await;
    assert_eq!(body["admitted"], false);
    assert_eq!(body["violation"]["kind"], "stay_too_short");
    assert_eq!(body["bounds"]["minNights"], 3);
    assert_eq!(body["bounds"]["maxNights"], 7);
    assert_eq!(body["bounds"]["minRuleId"], holiday["id"]);
    assert_eq!(body["bounds"]["stayRuleIds"].as_array().map(Vec::len), Some(2));

    let too_long = admit(&app, stay("RV", "2026-07-01", "2026-07-10", 30)).await;
    assert_eq!(too_long["violation"]["kind"], "stay_too_long");
}

#[tokio::test]
async fn blackout_rejects_before_stay_length() {
    let app = TestApp::spawn().await;
    app.create(
        "/stay-rules",
        json!({ "name": "Long stays only", "minNights": 7, "maxNights": 28 }),
    )
    .await;
    let blackout = app
        .create(
            "/blackouts",
            json!({
                "startDate": "2026-07-12",
                "endDate": "2026-07-12",
                "reason": "maintenance",
                "note": "Water main repair"
            }),
        )
        .await;

    let body = admit(&app, stay("RV", "2026-07-10", "2026-07-13", 30)).await;
    assert_eq!(body["admitted"], false);
    assert_eq!(body["violation"]["kind"], "blackout");
    assert_eq!(body["violation"]["blackoutId"], blackout["id"]);
    assert_eq!(body["violation"]["reason"], "maintenance");
    // bounds are still reported on rejection
    assert_eq!(body["bounds"]["minNights"], 7);
}

#[tokio::test]
async fn site_closure_only_blocks_that_site() {
    let app = TestApp::spawn().await;
    app.create(
        "/blackouts",
        json!({
            "siteId": "B7",
            "startDate": "2026-07-01",
            "endDate": "2026-07-31",
            "reason": "emergency"
        }),
    )
    .await;

    let other_site = admit(&app, stay("RV", "2026-07-10", "2026-07-13", 30)).await;
    assert_eq!(other_site["admitted"], true);

    let mut closed = stay("RV", "2026-07-10", "2026-07-13", 30);
    closed["siteId"] = json!("B7");
    let body = admit(&app, closed).await;
    assert_eq!(body["admitted"], false);
    assert_eq!(body["violation"]["reason"], "emergency");
}

#[tokio::test]
async fn inactive_blackout_does_not_block() {
    let app = TestApp::spawn().await;
    let blackout = app
        .create(
            "/blackouts",
            json!({
                "startDate": "2026-07-01",
                "endDate": "2026-07-31",
                "reason": "seasonal"
            }),
        )
        .await;

    let response = app
        .patch(
            &app.url(&format!("/blackouts/{}", id_of(&blackout))),
            &json!({ "isActive": false }),
        )
        .await;
    assert_eq!(response.status(), 200);

    let body = admit(&app, stay("RV", "2026-07-10", "2026-07-13", 30)).await;
    assert_eq!(body["admitted"], true);
}

#[tokio::test]
async fn unknown_promotion_rejects_admission() {
    let app = TestApp::spawn().await;

    let mut request = stay("RV", "2026-07-10", "2026-07-13", 30);
    request["promotionCode"] = json!("nope");
    let body = admit(&app, request).await;

    assert_eq!(body["admitted"], false);
    assert_eq!(body["violation"]["kind"], "promotion_unknown");
    assert_eq!(body["violation"]["code"], "NOPE");
}

#[tokio::test]
async fn admitted_stay_carries_preview_quote() {
    let app = TestApp::spawn().await;
    app.create(
        "/promotions",
        json!({ "code": "SUMMER20", "type": "percentage", "valueEntry": "20" }),
    )
    .await;

    let mut request = stay("RV", "2026-07-10", "2026-07-13", 30);
    request["baseRateCents"] = json!(4000);
    request["promotionCode"] = json!(" summer20 ");
    let body = admit(&app, request).await;

    assert_eq!(body["admitted"], true);
    assert_eq!(body["quote"]["subtotalCents"], 12000);
    assert_eq!(body["quote"]["discountCents"], 2400);
    assert_eq!(body["quote"]["promotion"]["code"], "SUMMER20");
    assert_eq!(body["quote"]["totalCents"], 9600);

    // previews are not persisted
    let quote_id = body["quote"]["id"].as_str().unwrap_or_default().to_string();
    let response = app.get(&app.url(&format!("/quotes/{}", quote_id))).await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn departure_before_arrival_is_bad_request() {
    let app = TestApp::spawn().await;

    let response = app
        .post(
            &app.url("/admissions"),
            &stay("RV", "2026-07-13", "2026-07-13", 30),
        )
        .await;
    assert_eq!(response.status(), 400);
}
