//! Integration tests for the HTTP API.
//!
//! Drives the full router over an in-memory SQLite ledger and a scripted
//! rate provider.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use wallet_hex::{LedgerService, RateCache, RateService, inbound::HttpServer};
use wallet_repo::{Persistence, SqliteStore};
use wallet_types::{RateError, RateProvider, RateSnapshot};

/// Replays scripted outcomes, then keeps failing with 503.
struct ScriptedProvider {
    outcomes: Mutex<VecDeque<Result<RateSnapshot, RateError>>>,
}

#[async_trait]
impl RateProvider for ScriptedProvider {
    async fn fetch_rates(&self) -> Result<RateSnapshot, RateError> {
        self.outcomes.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(RateError::Upstream {
                status: Some(503),
                message: "Rate provider returned 503 Service Unavailable".into(),
            })
        })
    }
}

fn rates() -> RateSnapshot {
    RateSnapshot::new(
        60_000,
        62_000,
        60_050,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    )
}

/// Helper to build a router. `ttl` of zero makes every request refresh.
async fn create_app(outcomes: Vec<Result<RateSnapshot, RateError>>, ttl: Duration) -> Router {
    let provider = ScriptedProvider {
        outcomes: Mutex::new(outcomes.into()),
    };
    let store = SqliteStore::new("sqlite::memory:").await.unwrap();
    let ledger = LedgerService::load(Persistence::LocalOnly(store)).await;
    let rates = RateService::new(provider, RateCache::new(), ttl);

    HttpServer::new(rates, ledger).router()
}

fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Helper to send a request and decode the JSON body (Null when empty).
async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let app = create_app(vec![], Duration::from_secs(60)).await;

    let (status, body) = send(&app, request(Method::GET, "/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_rates_cold_failure_passes_status_through() {
    let app = create_app(
        vec![Err(RateError::Upstream {
            status: Some(429),
            message: "Rate provider returned 429 Too Many Requests".into(),
        })],
        Duration::from_secs(60),
    )
    .await;

    let (status, body) = send(&app, request(Method::GET, "/api/rates", None)).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body,
        json!({"message": "Rate provider returned 429 Too Many Requests"})
    );
}

#[tokio::test]
async fn test_rates_cold_config_error_is_500() {
    let app = create_app(
        vec![Err(RateError::Config("NAVASAN_API_KEY is not set".into()))],
        Duration::from_secs(60),
    )
    .await;

    let (status, body) = send(&app, request(Method::GET, "/api/rates", None)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"].as_str().unwrap().contains("NAVASAN_API_KEY"));
}

#[tokio::test]
async fn test_rates_warm_failure_serves_stale() {
    let app = create_app(vec![Ok(rates())], Duration::ZERO).await;

    let (status, fresh) = send(&app, request(Method::GET, "/api/rates", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fresh["localPerUsd"], 60_000);
    assert!(fresh.get("stale").is_none());
    assert!(fresh.get("error").is_none());

    let (status, stale) = send(&app, request(Method::GET, "/api/rates", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(stale["localPerUsd"], 60_000);
    assert_eq!(stale["asOf"], fresh["asOf"]);
    assert_eq!(stale["stale"], true);
    assert_eq!(
        stale["error"],
        "Rate provider returned 503 Service Unavailable"
    );
}

#[tokio::test]
async fn test_holdings_endpoints() {
    let app = create_app(vec![], Duration::from_secs(60)).await;

    let (status, body) = send(
        &app,
        request(Method::PUT, "/api/holdings/usd", Some(json!({"value": 12.5}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["USD"], 12.5);

    let (status, body) = send(
        &app,
        request(Method::PUT, "/api/holdings/GBP", Some(json!({"value": 1}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let (_, body) = send(
        &app,
        request(Method::PUT, "/api/holdings", Some(json!({"IRT": 5000, "EUR": -2}))),
    )
    .await;
    assert_eq!(body, json!({"IRT": 5000.0, "USD": 0.0, "EUR": 0.0, "USDT": 0.0}));

    let (_, body) = send(&app, request(Method::DELETE, "/api/holdings", None)).await;
    assert_eq!(body["IRT"], 0.0);
}

#[tokio::test]
async fn test_expense_lifecycle() {
    let app = create_app(vec![Ok(rates())], Duration::from_secs(60)).await;

    let (status, expense) = send(
        &app,
        request(
            Method::POST,
            "/api/expenses",
            Some(json!({"amount": 2, "currency": "USD", "category": "Food"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(expense["localValue"], 120_000.0);
    let id = expense["id"].as_str().unwrap().to_string();

    let uri = format!("/api/expenses/{id}");
    let (status, _) = send(&app, request(Method::DELETE, &uri, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&app, request(Method::DELETE, &uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].is_string());

    let (status, restored) =
        send(&app, request(Method::POST, "/api/expenses/restore", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(restored["id"], id.as_str());

    let (status, _) = send(&app, request(Method::POST, "/api/expenses/restore", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = send(&app, request(Method::GET, "/api/expenses", None)).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, request(Method::DELETE, "/api/expenses", None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, list) = send(&app, request(Method::GET, "/api/expenses", None)).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_foreign_expense_without_rates_reports_rate_failure() {
    let app = create_app(vec![], Duration::from_secs(60)).await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/expenses",
            Some(json!({"amount": 1, "currency": "EUR"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = create_app(vec![], Duration::from_secs(60)).await;
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/expenses")
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_summary_and_backup() {
    let app = create_app(vec![Ok(rates())], Duration::from_secs(60)).await;
    send(
        &app,
        request(Method::PUT, "/api/holdings/USD", Some(json!({"value": 10}))),
    )
    .await;
    send(
        &app,
        request(
            Method::POST,
            "/api/expenses",
            Some(json!({"amount": 100000, "note": "rent"})),
        ),
    )
    .await;

    let (status, summary) = send(&app, request(Method::GET, "/api/summary", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["grossAssets"], 600_000.0);
    assert_eq!(summary["totalExpenses"], 100_000.0);
    assert_eq!(summary["remaining"], 500_000.0);
    assert_eq!(summary["degraded"], false);

    let (_, backup) = send(&app, request(Method::GET, "/api/backup", None)).await;
    assert_eq!(backup["version"], 1);

    let other = create_app(vec![], Duration::from_secs(60)).await;
    let (status, report) = send(&other, request(Method::POST, "/api/backup", Some(backup))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report, json!({"holdingsReplaced": true, "expensesImported": 1}));

    let (_, holdings) = send(&other, request(Method::GET, "/api/holdings", None)).await;
    assert_eq!(holdings["USD"], 10.0);
}
