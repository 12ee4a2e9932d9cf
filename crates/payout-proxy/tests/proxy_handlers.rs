//! Proxy handler tests, driven in-process with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Local, NaiveDate};
use payout_core::{DateWindow, RawTransaction, Token};
use payout_proxy::{create_router, ProxyConfig, ProxyState, COMMISSIONS_ROUTE};
use payout_upstream::{
    BoxFuture, MockStatementSource, StatementSource, UpstreamResult, DEFAULT_FAILURE_MESSAGE,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn rows(value: Value) -> Vec<RawTransaction> {
    serde_json::from_value(value).unwrap()
}

fn router_with(source: Arc<dyn StatementSource>, config: ProxyConfig) -> Router {
    create_router(ProxyState::new(source, config)).unwrap()
}

fn router(source: Arc<MockStatementSource>) -> Router {
    router_with(source, ProxyConfig::default())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = router(Arc::new(MockStatementSource::new()));
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");
    assert_eq!(body["message"], "Deriv Broker Commissions API");
    assert!(chrono::DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_missing_token_is_400() {
    let source = Arc::new(MockStatementSource::new());
    let app = router(source.clone());

    let (status, body) = send(app, post_json(COMMISSIONS_ROUTE, json!({"date_from": "2024-01-01"}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"success": false, "error": "Missing required field", "details": "API token is required"})
    );
    assert!(source.calls().is_empty());
}

#[tokio::test]
async fn test_blank_token_is_400() {
    let source = Arc::new(MockStatementSource::new());
    let (status, body) = send(router(source.clone()), post_json(COMMISSIONS_ROUTE, json!({"token": "  "}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required field");
    assert!(source.calls().is_empty());
}

#[tokio::test]
async fn test_wrong_date_separator_is_400() {
    let source = Arc::new(MockStatementSource::new());
    let app = router(source.clone());

    let (status, body) = send(
        app,
        post_json(COMMISSIONS_ROUTE, json!({"token": "t", "date_from": "2024/01/01"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid date format");
    assert_eq!(body["details"], "Use YYYY-MM-DD format for dates");
    assert!(source.calls().is_empty());
}

#[tokio::test]
async fn test_impossible_date_is_400() {
    let (status, body) = send(
        router(Arc::new(MockStatementSource::new())),
        post_json(COMMISSIONS_ROUTE, json!({"token": "t", "date_to": "2024-02-30"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid date format");
}

#[tokio::test]
async fn test_reversed_range_is_400() {
    let (status, body) = send(
        router(Arc::new(MockStatementSource::new())),
        post_json(
            COMMISSIONS_ROUTE,
            json!({"token": "t", "date_from": "2024-02-01", "date_to": "2024-01-01"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid date range");
}

#[tokio::test]
async fn test_commissions_success_envelope() {
    let source = Arc::new(MockStatementSource::with_rows(rows(json!([
        {"action_type": "commission", "amount": "-5.50", "transaction_time": 1704067200, "transaction_id": "A1"},
        {"action_type": "transfer", "amount": "100", "transaction_time": 1704067200, "transaction_id": "B2"}
    ]))));
    let app = router(source.clone());

    let (status, body) = send(
        app,
        post_json(
            COMMISSIONS_ROUTE,
            json!({"token": "secret-token", "date_from": "2024-01-01", "date_to": "2024-01-31"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let data = &body["data"];
    let commissions = data["commissions"].as_array().unwrap();
    assert_eq!(commissions.len(), 1);
    assert_eq!(commissions[0]["amount"].as_f64(), Some(5.5));
    assert_eq!(commissions[0]["description"], "commission");
    assert_eq!(commissions[0]["currency"], "USD");
    assert_eq!(commissions[0]["reference"], "A1");
    assert_eq!(commissions[0]["date"], "2024-01-01T00:00:00Z");
    assert_eq!(data["summary"]["total"].as_f64(), Some(5.5));
    assert_eq!(data["summary"]["count"], 1);
    assert_eq!(
        data["summary"]["date_range"],
        json!({"start": "2024-01-01", "end": "2024-01-31"})
    );

    let calls = source.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "secret-token");
    assert_eq!(
        calls[0].1,
        DateWindow::new(date("2024-01-01"), date("2024-01-31")).unwrap()
    );
}

#[tokio::test]
async fn test_missing_dates_default_to_last_30_days() {
    let source = Arc::new(MockStatementSource::new());
    let today = Local::now().date_naive();

    let (status, body) = send(router(source.clone()), post_json(COMMISSIONS_ROUTE, json!({"token": "t"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["commissions"], json!([]));
    assert_eq!(body["data"]["summary"]["count"], 0);
    assert_eq!(body["data"]["summary"]["total"].as_f64(), Some(0.0));
    assert_eq!(source.calls()[0].1, DateWindow::default_for(today));
}

#[tokio::test]
async fn test_alias_route() {
    let source = Arc::new(MockStatementSource::new());
    let (status, body) = send(router(source), post_json("/commissions", json!({"token": "t"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_upstream_failure_propagates_status_and_message() {
    let source = Arc::new(MockStatementSource::new());
    source.set_api_error(
        401,
        "The token is invalid.",
        Some(json!({"error": {"code": "InvalidToken", "message": "The token is invalid."}})),
    );

    let (status, body) = send(router(source), post_json(COMMISSIONS_ROUTE, json!({"token": "t"}))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "The token is invalid.");
    assert_eq!(body["details"]["error"]["code"], "InvalidToken");
}

#[tokio::test]
async fn test_unreachable_upstream_is_500_default_message() {
    let source = Arc::new(MockStatementSource::new());
    source.set_transport_error("connection refused");

    let (status, body) = send(router(source), post_json(COMMISSIONS_ROUTE, json!({"token": "t"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"success": false, "error": DEFAULT_FAILURE_MESSAGE, "details": null})
    );
}

#[tokio::test]
async fn test_malformed_commission_row_is_json_failure() {
    let source = Arc::new(MockStatementSource::with_rows(rows(json!([
        {"action_type": "commission", "amount": "abc", "transaction_time": 1704067200, "transaction_id": "Z9"}
    ]))));

    let (status, body) = send(router(source), post_json(COMMISSIONS_ROUTE, json!({"token": "t"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("Z9"));
}

#[tokio::test]
async fn test_commission_total_overflow_is_json_failure() {
    let source = Arc::new(MockStatementSource::with_rows(rows(json!([
        {"action_type": "commission", "amount": "79228162514264337593543950335", "transaction_time": 1704067200, "transaction_id": 1},
        {"action_type": "commission", "amount": "79228162514264337593543950335", "transaction_time": 1704067200, "transaction_id": 2}
    ]))));

    let (status, body) = send(router(source), post_json(COMMISSIONS_ROUTE, json!({"token": "t"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("out of range"));
}

#[tokio::test]
async fn test_odd_non_commission_rows_are_dropped() {
    let source = Arc::new(MockStatementSource::with_rows(rows(json!([
        {"action_type": "transfer", "amount": "10", "transaction_time": 1704067200.5, "transaction_id": -4},
        {"action_type": null, "amount": {"value": 1}, "transaction_time": 1704067200},
        {"action_type": "commission", "amount": "-5.50", "transaction_time": 1704067200, "transaction_id": "A1"}
    ]))));

    let (status, body) = send(router(source), post_json(COMMISSIONS_ROUTE, json!({"token": "t"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["summary"]["count"], 1);
    assert_eq!(body["data"]["commissions"][0]["reference"], "A1");
}

#[tokio::test]
async fn test_malformed_body_is_400_envelope() {
    let request = Request::builder()
        .method(Method::POST)
        .uri(COMMISSIONS_ROUTE)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(router(Arc::new(MockStatementSource::new())), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid request body");
}

/// A source that panics, to exercise the panic catcher.
struct PanickingSource;

fn explode() -> UpstreamResult<Vec<RawTransaction>> {
    panic!("statement source exploded")
}

impl StatementSource for PanickingSource {
    fn fetch_statement<'a>(
        &'a self,
        _token: &'a Token,
        _window: DateWindow,
    ) -> BoxFuture<'a, UpstreamResult<Vec<RawTransaction>>> {
        Box::pin(async { explode() })
    }
}

#[tokio::test]
async fn test_panic_is_caught_without_details() {
    let app = router_with(Arc::new(PanickingSource), ProxyConfig::default());

    let (status, body) = send(app, post_json(COMMISSIONS_ROUTE, json!({"token": "t"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"success": false, "error": "Internal server error", "details": null})
    );
}

#[tokio::test]
async fn test_panic_details_in_development() {
    let config = ProxyConfig {
        expose_error_details: true,
        ..ProxyConfig::default()
    };
    let app = router_with(Arc::new(PanickingSource), config);

    let (status, body) = send(app, post_json(COMMISSIONS_ROUTE, json!({"token": "t"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["details"], "statement source exploded");
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = router(Arc::new(MockStatementSource::new()));
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri(COMMISSIONS_ROUTE)
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert!(response.status().is_success());
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );
    let methods = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(methods.contains("POST"));
}

#[tokio::test]
async fn test_invalid_origin_rejected_at_startup() {
    let config = ProxyConfig {
        allowed_origin: "http://bad\norigin".to_string(),
        ..ProxyConfig::default()
    };
    let result = create_router(ProxyState::new(Arc::new(MockStatementSource::new()), config));
    assert!(result.is_err());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let source = Arc::new(MockStatementSource::new());
    let _ = send(router(source.clone()), post_json(COMMISSIONS_ROUTE, json!({"token": "t"}))).await;

    let response = router(source)
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("payout_proxy_requests_total"));
    assert!(text.contains("payout_session_outcome_total"));
}
