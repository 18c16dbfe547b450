//! Integration tests for quote issuance.

mod common;

use common::{id_of, TestApp};
use serde_json::{json, Value};

fn quote_request(arrival: &str, departure: &str) -> Value {
    json!({
        "siteClassId": "RV",
        "siteId": "A1",
        "arrivalDate": arrival,
        "departureDate": departure,
        "asOf": "2026-06-01"
    })
}

async fn issue(app: &TestApp, body: Value) -> Value {
    let response = app.post(&app.url("/quotes"), &body).await;
    let status = response.status();
    let json: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(status, 201, "quote failed: {}", json);
    json
}

async fn percent_rule(app: &TestApp, name: &str, value: &str) -> Value {
    app.create(
        "/pricing-rules",
        json!({
            "name": name,
            "type": "demand",
            "adjustmentType": "percent",
            "adjustmentValue": value
        }),
    )
    .await
}

#[tokio::test]
async fn additive_percent_rules_compose_on_base() {
    let app = TestApp::spawn().await;
    let early_bird = percent_rule(&app, "Early Bird", "-0.10").await;
    let occupancy = percent_rule(&app, "Occupancy High", "0.20").await;

    let mut request = quote_request("2026-07-10", "2026-07-12");
    request["baseRateCents"] = json!(4000);
    let quote = issue(&app, request).await;

    assert_eq!(quote["nights"], 2);
    assert_eq!(quote["nightly"][0]["baseCents"], 4000);
    assert_eq!(quote["nightly"][0]["adjustmentCents"], 400);
    assert_eq!(quote["nightly"][0]["rateCents"], 4400);
    assert_eq!(quote["nightly"][0]["capped"], false);
    assert_eq!(
        quote["nightly"][0]["appliedRuleIds"],
        json!([early_bird["id"], occupancy["id"]])
    );
    assert_eq!(quote["subtotalCents"], 8800);
    assert_eq!(quote["averageNightlyCents"], 4400);
    assert_eq!(quote["totalCents"], 8800);
}

#[tokio::test]
async fn entry_and_direction_compile_to_signed_adjustment() {
    let app = TestApp::spawn().await;
    let rule = app
        .create(
            "/pricing-rules",
            json!({
                "name": "Midweek",
                "type": "season",
                "adjustmentType": "flat",
                "adjustmentEntry": "5.00",
                "direction": "discount"
            }),
        )
        .await;
    let stored: f64 = rule["adjustmentValue"]
        .as_str()
        .and_then(|v| v.parse().ok())
        .expect("adjustmentValue is a decimal string");
    assert_eq!(stored, -500.0);
    assert_eq!(rule["display"], "5.00");
    assert_eq!(rule["direction"], "discount");

    let mut request = quote_request("2026-07-10", "2026-07-11");
    request["baseRateCents"] = json!(4000);
    let quote = issue(&app, request).await;
    assert_eq!(quote["nightly"][0]["rateCents"], 3500);
}

#[tokio::test]
async fn max_rate_cap_bounds_nightly_rate() {
    let app = TestApp::spawn().await;
    app.create(
        "/pricing-rules",
        json!({
            "name": "Peak",
            "type": "demand",
            "adjustmentType": "percent",
            "adjustmentValue": "0.20",
            "maxRateCapCents": 4200
        }),
    )
    .await;

    let mut request = quote_request("2026-07-10", "2026-07-11");
    request["baseRateCents"] = json!(4000);
    let quote = issue(&app, request).await;

    assert_eq!(quote["nightly"][0]["rateCents"], 4200);
    assert_eq!(quote["nightly"][0]["capped"], true);
}

#[tokio::test]
async fn taxes_apply_after_promotion_discount() {
    let app = TestApp::spawn().await;
    app.create(
        "/tax-rules",
        json!({ "name": "Lodging tax", "type": "percentage", "rateEntry": "10" }),
    )
    .await;
    app.create(
        "/tax-rules",
        json!({ "name": "Resort fee", "type": "flat", "rateEntry": "2.50" }),
    )
    .await;
    app.create(
        "/promotions",
        json!({ "code": "SUMMER20", "type": "percentage", "valueEntry": "20" }),
    )
    .await;

    let mut request = quote_request("2026-07-10", "2026-07-12");
    request["baseRateCents"] = json!(4400);
    request["promotionCode"] = json!("summer20");
    let quote = issue(&app, request).await;

    assert_eq!(quote["subtotalCents"], 8800);
    assert_eq!(quote["discountCents"], 1760);
    assert_eq!(quote["taxes"].as_array().map(Vec::len), Some(2));
    assert_eq!(quote["taxTotalCents"], 704 + 250);
    assert_eq!(quote["totalCents"], 7040 + 954);
}

#[tokio::test]
async fn signed_waiver_exempts_long_stays() {
    let app = TestApp::spawn().await;
    app.create(
        "/tax-rules",
        json!({ "name": "Lodging tax", "type": "percentage", "rate": "10" }),
    )
    .await;
    let exemption = app
        .create(
            "/tax-rules",
            json!({
                "name": "Long-term resident",
                "type": "exemption",
                "minNights": 30,
                "requiresWaiver": true,
                "waiverText": "I am a permanent resident"
            }),
        )
        .await;

    let mut request = quote_request("2026-07-01", "2026-08-01");
    request["baseRateCents"] = json!(1000);
    let unsigned = issue(&app, request.clone()).await;
    assert_eq!(unsigned["taxTotalCents"], 3100);

    request["taxWaiverSigned"] = json!(true);
    let signed = issue(&app, request).await;
    assert_eq!(signed["taxTotalCents"], 0);
    assert_eq!(signed["taxExemptionRuleId"], exemption["id"]);
}

#[tokio::test]
async fn seasonal_rate_supplies_base() {
    let app = TestApp::spawn().await;
    app.create(
        "/seasonal-rates",
        json!({
            "name": "Summer",
            "rateType": "nightly",
            "amountEntry": "45.00",
            "dateRanges": [{ "start": "2026-06-01", "end": "2026-08-31" }]
        }),
    )
    .await;

    let quote = issue(&app, quote_request("2026-07-10", "2026-07-12")).await;
    assert_eq!(quote["subtotalCents"], 9000);

    // no rate covers September and no explicit base was given
    let response = app
        .post(&app.url("/quotes"), &quote_request("2026-09-10", "2026-09-12"))
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn issued_quote_is_a_stable_snapshot() {
    let app = TestApp::spawn().await;
    let rule = percent_rule(&app, "Occupancy High", "0.20").await;

    let mut request = quote_request("2026-07-10", "2026-07-11");
    request["baseRateCents"] = json!(4000);
    let quote = issue(&app, request).await;

    let response = app
        .patch(
            &app.url(&format!("/pricing-rules/{}", id_of(&rule))),
            &json!({ "adjustmentValue": "0.50" }),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .get(&app.url(&format!("/quotes/{}", id_of(&quote))))
        .await;
    assert_eq!(response.status(), 200);
    let stored: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(stored["totalCents"], 4800);
}

#[tokio::test]
async fn rule_used_by_quote_cannot_be_deleted() {
    let app = TestApp::spawn().await;
    let used = percent_rule(&app, "Occupancy High", "0.20").await;
    let unused = app
        .create(
            "/pricing-rules",
            json!({
                "name": "Winter",
                "type": "season",
                "adjustmentType": "percent",
                "adjustmentValue": "-0.30",
                "startDate": "2026-12-01",
                "endDate": "2027-02-28"
            }),
        )
        .await;

    let mut request = quote_request("2026-07-10", "2026-07-11");
    request["baseRateCents"] = json!(4000);
    issue(&app, request).await;

    let response = app
        .delete(&app.url(&format!("/pricing-rules/{}", id_of(&used))))
        .await;
    assert_eq!(response.status(), 409);

    let response = app
        .delete(&app.url(&format!("/pricing-rules/{}", id_of(&unused))))
        .await;
    assert_eq!(response.status(), 204);

    // deactivating is the way to retire a used rule
    let response = app
        .patch(
            &app.url(&format!("/pricing-rules/{}", id_of(&used))),
            &json!({ "active": false }),
        )
        .await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn expired_promotion_rejects_quote() {
    let app = TestApp::spawn().await;
    app.create(
        "/promotions",
        json!({
            "code": "SPRING",
            "type": "flat",
            "valueEntry": "10.00",
            "validTo": "2026-05-31"
        }),
    )
    .await;

    let mut request = quote_request("2026-07-10", "2026-07-11");
    request["baseRateCents"] = json!(4000);
    request["promotionCode"] = json!("SPRING");
    let response = app.post(&app.url("/quotes"), &request).await;

    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["violation"]["kind"], "promotion_expired");
    assert_eq!(body["violation"]["validTo"], "2026-05-31");
}

#[tokio::test]
async fn quotes_are_scoped_to_their_campground() {
    let app = TestApp::spawn().await;
    let mut request = quote_request("2026-07-10", "2026-07-11");
    request["baseRateCents"] = json!(4000);
    let quote = issue(&app, request).await;

    let other = uuid::Uuid::new_v4();
    let response = app
        .get(&app.url_for(other, &format!("/quotes/{}", id_of(&quote))))
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn out_of_range_amounts_are_rejected_on_write() {
    let app = TestApp::spawn().await;

    let response = app
        .post(
            &app.url("/pricing-rules"),
            &json!({
                "name": "Runaway",
                "type": "demand",
                "adjustmentType": "percent",
                "adjustmentValue": "79228162514264337593543950335"
            }),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = app
        .post(
            &app.url("/tax-rules"),
            &json!({ "name": "Runaway tax", "type": "percentage", "rate": "79228162514264337593543950335" }),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = app
        .post(
            &app.url("/seasonal-rates"),
            &json!({
                "name": "Runaway season",
                "rateType": "nightly",
                "amountEntry": "79228162514264337593543950335",
                "dateRanges": [{ "start": "2026-06-01", "end": "2026-08-31" }]
            }),
        )
        .await;
    assert_eq!(response.status(), 400);

    // nothing was stored, so quoting still works
    let mut request = quote_request("2026-07-10", "2026-07-11");
    request["baseRateCents"] = json!(4000);
    let quote = issue(&app, request).await;
    assert_eq!(quote["totalCents"], 4000);
}

#[tokio::test]
async fn oversized_base_rate_is_rejected() {
    let app = TestApp::spawn().await;
    let mut request = quote_request("2026-07-10", "2026-07-13");
    request["baseRateCents"] = json!(4_611_686_018_427_387_904_i64);

    let response = app.post(&app.url("/quotes"), &request).await;
    assert_eq!(response.status(), 422);
}

#[tokio::test]
async fn clamping_cap_rule_counts_as_used() {
    let app = TestApp::spawn().await;
    let surge = percent_rule(&app, "Surge", "0.40").await;
    let cap = app
        .create(
            "/pricing-rules",
            json!({
                "name": "Cap",
                "type": "demand",
                "adjustmentType": "percent",
                "adjustmentValue": "0",
                "maxRateCapCents": 6000
            }),
        )
        .await;

    let mut request = quote_request("2026-07-10", "2026-07-11");
    request["baseRateCents"] = json!(5000);
    let quote = issue(&app, request).await;
    assert_eq!(quote["nightly"][0]["rateCents"], 6000);
    assert_eq!(quote["nightly"][0]["appliedRuleIds"], json!([surge["id"]]));
    assert_eq!(quote["nightly"][0]["capRuleIds"], json!([cap["id"]]));

    let response = app
        .delete(&app.url(&format!("/pricing-rules/{}", id_of(&cap))))
        .await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn stays_beyond_the_quote_ceiling_are_rejected() {
    let app = TestApp::spawn().await;
    let mut request = quote_request("2000-01-01", "2400-01-01");
    request["baseRateCents"] = json!(4000);

    let response = app.post(&app.url("/quotes"), &request).await;
    assert_eq!(response.status(), 400);

    // a full year is still quotable
    let mut request = quote_request("2026-01-01", "2027-01-01");
    request["baseRateCents"] = json!(4000);
    let quote = issue(&app, request).await;
    assert_eq!(quote["nights"], 365);
}
