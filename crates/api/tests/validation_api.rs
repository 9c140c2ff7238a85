//! HTTP-level tests for request validation, rate limiting and degraded
//! schema handling.
//!
//! Every request here is answered before a query is issued, so the app runs
//! over a lazy pool that never connects.

mod common;

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use common::{body_json, build_test_app, build_test_app_with, get, lazy_pool, post_json, test_config};
use moodbase_db::SchemaCapabilities;
use serde_json::json;
use tower::ServiceExt;

fn app() -> Router {
    build_test_app(lazy_pool())
}

fn unprovisioned_app() -> Router {
    build_test_app_with(lazy_pool(), SchemaCapabilities::none(), test_config())
}

async fn assert_error(response: Response, status: StatusCode, code: &str) {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], code, "unexpected body: {json}");
}

fn valid_submission() -> serde_json::Value {
    json!({
        "offeringId": 42,
        "overall": 4,
        "access": "5",
        "treatment": 4,
        "helpful": 3,
        "effectiveness": 5,
        "comment": "great"
    })
}

/// Submit `body` from socket peer `peer`, optionally with an
/// `X-Forwarded-For` header.
async fn submit_as(app: Router, peer: &str, forwarded: Option<&str>, body: serde_json::Value) -> Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/ratings/submit")
        .header("content-type", "application/json");
    if let Some(forwarded) = forwarded {
        builder = builder.header("x-forwarded-for", forwarded);
    }
    let mut request = builder.body(Body::from(body.to_string())).unwrap();
    let addr: SocketAddr = format!("{peer}:40000").parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    app.oneshot(request).await.unwrap()
}

async fn post_from(app: Router, peer: &str, body: serde_json::Value) -> Response {
    submit_as(app, peer, None, body).await
}

// ---------------------------------------------------------------------------
// Offering ids
// ---------------------------------------------------------------------------

#[tokio::test]
async fn non_numeric_offering_id_is_rejected() {
    let response = get(app(), "/api/ratings/user/abc").await;
    assert_error(response, StatusCode::BAD_REQUEST, "INVALID_OFFERING_ID").await;

    let response = get(app(), "/api/ratings/platform/0").await;
    assert_error(response, StatusCode::BAD_REQUEST, "INVALID_OFFERING_ID").await;
}

#[tokio::test]
async fn summary_requires_offering_ids() {
    let response = get(app(), "/api/ratings/summary").await;
    assert_error(response, StatusCode::BAD_REQUEST, "MISSING_OFFERING_IDS").await;

    let response = get(app(), "/api/ratings/summary?offeringIds=1,x,3").await;
    assert_error(response, StatusCode::BAD_REQUEST, "INVALID_OFFERING_IDS").await;
}

#[tokio::test]
async fn summary_rejects_more_than_fifty_ids() {
    let ids: Vec<String> = (1..=60).map(|i| i.to_string()).collect();
    let uri = format!("/api/ratings/summary?offeringIds={}", ids.join(","));

    let response = get(app(), &uri).await;
    assert_error(response, StatusCode::BAD_REQUEST, "TOO_MANY_OFFERING_IDS").await;
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submission_without_scores_is_rejected() {
    let response = post_json(app(), "/api/ratings/submit", json!({ "offeringId": 42 })).await;
    assert_error(response, StatusCode::BAD_REQUEST, "MISSING_REQUIRED_FIELDS").await;
}

#[tokio::test]
async fn submission_with_out_of_range_score_is_rejected() {
    let mut body = valid_submission();
    body["helpful"] = json!(5.5);

    let response = post_json(app(), "/api/ratings/submit", body).await;
    assert_error(response, StatusCode::BAD_REQUEST, "INVALID_RATING_VALUE").await;
}

#[tokio::test]
async fn submission_with_malformed_user_id_is_rejected() {
    let mut body = valid_submission();
    body["userId"] = json!("not-a-uuid");

    let response = post_json(app(), "/api/ratings/submit", body).await;
    assert_error(response, StatusCode::BAD_REQUEST, "INVALID_USER_ID").await;
}

#[tokio::test]
async fn submission_with_long_comment_is_rejected() {
    let mut body = valid_submission();
    body["comment"] = json!("x".repeat(1001));

    let response = post_json(app(), "/api/ratings/submit", body).await;
    assert_error(response, StatusCode::BAD_REQUEST, "COMMENT_TOO_LONG").await;
}

#[tokio::test]
async fn malformed_json_body_is_rejected() {
    let response = app()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/ratings/submit")
                .header("content-type", "application/json")
                .body(Body::from("{\"offeringId\": "))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_error(response, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;
}

// ---------------------------------------------------------------------------
// Moderation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pending_limit_above_maximum_is_rejected() {
    let response = get(app(), "/api/admin/ratings/pending?limit=500").await;
    assert_error(response, StatusCode::BAD_REQUEST, "LIMIT_TOO_HIGH").await;

    let response = get(app(), "/api/admin/ratings/pending?offset=-1").await;
    assert_error(response, StatusCode::BAD_REQUEST, "INVALID_PAGINATION").await;
}

#[tokio::test]
async fn review_requires_staging_id_and_decision() {
    let response = post_json(app(), "/api/admin/ratings/review", json!({ "stagingId": 5 })).await;
    assert_error(response, StatusCode::BAD_REQUEST, "MISSING_REQUIRED_FIELDS").await;

    let response = post_json(
        app(),
        "/api/admin/ratings/review",
        json!({ "stagingId": "abc", "approved": true }),
    )
    .await;
    assert_error(response, StatusCode::BAD_REQUEST, "INVALID_STAGING_ID").await;
}

#[tokio::test]
async fn rejection_without_reason_is_rejected() {
    let response = post_json(
        app(),
        "/api/admin/ratings/review",
        json!({ "stagingId": 5, "approved": false, "rejectionReason": "  " }),
    )
    .await;
    assert_error(response, StatusCode::BAD_REQUEST, "MISSING_REJECTION_REASON").await;
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fourth_submission_in_window_is_rate_limited() {
    let app = app();

    for _ in 0..3 {
        let response = post_from(app.clone(), "198.51.100.9", json!({})).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = post_from(app.clone(), "198.51.100.9", json!({})).await;
    assert_error(response, StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED").await;

    // Other clients keep their own quota.
    let response = post_from(app.clone(), "198.51.100.10", json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Reads are not bound by the submission limit.
    let response = get(app, "/api/ratings/user/abc").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn forwarded_header_does_not_reset_submission_quota() {
    let app = app();

    for i in 0..3 {
        let forwarded = format!("203.0.113.{i}");
        let response = submit_as(app.clone(), "192.0.2.4", Some(&forwarded), json!({})).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = submit_as(app, "192.0.2.4", Some("203.0.113.99"), json!({})).await;
    assert_error(response, StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED").await;
}

#[tokio::test]
async fn trusted_forwarded_header_keys_each_client() {
    let mut config = test_config();
    config.rate_limits.trust_forwarded_for = true;
    let app = build_test_app_with(lazy_pool(), SchemaCapabilities::all(), config);

    for _ in 0..3 {
        let response = submit_as(app.clone(), "10.0.0.2", Some("203.0.113.5"), json!({})).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = submit_as(app.clone(), "10.0.0.2", Some("203.0.113.5"), json!({})).await;
    assert_error(response, StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED").await;

    // Same proxy, different client.
    let response = submit_as(app, "10.0.0.2", Some("203.0.113.6"), json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ratings_limit_applies_to_every_endpoint() {
    let mut config = test_config();
    config.rate_limits.ratings_per_minute = 2;
    let app = build_test_app_with(lazy_pool(), SchemaCapabilities::all(), config);

    assert_eq!(get(app.clone(), "/api/ratings/user/abc").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        get(app.clone(), "/api/admin/ratings/pending?limit=500").await.status(),
        StatusCode::BAD_REQUEST
    );

    let response = get(app, "/api/ratings/summary").await;
    assert_error(response, StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED").await;
}

// ---------------------------------------------------------------------------
// Relations not provisioned
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_ratings_tables_read_as_not_found() {
    let response = get(unprovisioned_app(), "/api/ratings/user/42").await;
    assert_error(response, StatusCode::NOT_FOUND, "RATINGS_NOT_FOUND").await;

    let response = get(unprovisioned_app(), "/api/ratings/platform/42").await;
    assert_error(response, StatusCode::NOT_FOUND, "RATINGS_NOT_FOUND").await;
}

#[tokio::test]
async fn missing_staging_table_yields_empty_queue() {
    let response = get(unprovisioned_app(), "/api/admin/ratings/pending").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"], json!([]));
    assert_eq!(json["count"], 0);
    assert_eq!(json["pagination"], json!({ "limit": 50, "offset": 0 }));
}

#[tokio::test]
async fn missing_tables_yield_empty_summary() {
    let response = get(unprovisioned_app(), "/api/ratings/summary?offeringIds=1,2").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"], json!({}));
    assert_eq!(json["count"], 0);
}

#[tokio::test]
async fn submission_without_staging_table_is_an_internal_error() {
    let response = post_json(unprovisioned_app(), "/api/ratings/submit", valid_submission()).await;
    assert_error(response, StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR").await;
}
