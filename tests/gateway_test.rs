//! Gateway tests against the real backend on an ephemeral port.

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use stock_researcher::api::{
    RateLimitDetector, SearchFailure, SearchOutcome, StockApi, StockGateway,
};
use stock_researcher::error::GatewayError;
use stock_researcher::server::router;
use stock_researcher::store::StockStore;

async fn spawn_backend() -> StockGateway {
    spawn_router(router(StockStore::with_mock_data())).await
}

async fn spawn_router(app: Router) -> StockGateway {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StockGateway::new(
        &format!("http://{}/api/", addr),
        Duration::from_secs(5),
        RateLimitDetector::default(),
    )
    .unwrap()
}

/// Upstream that fails in the ways a quota-limited data provider does.
fn failing_upstream() -> Router {
    async fn search(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
        match params.get("symbol").map(String::as_str) {
            Some("QUOTA") => (
                StatusCode::FORBIDDEN,
                Json(json!({ "message": "You have exceeded your request allocation" })),
            )
                .into_response(),
            Some("BUSY") => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "message": "Slow down" })),
            )
                .into_response(),
            _ => StatusCode::BAD_GATEWAY.into_response(),
        }
    }

    async fn enhanced() -> impl IntoResponse {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Polygon down" })),
        )
    }

    Router::new()
        .route("/api/search", get(search))
        .route("/api/technical/enhanced/:symbol", get(enhanced))
}

/// A base URL nothing listens on.
async fn closed_port() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api", addr)
}

#[tokio::test]
async fn test_list_stocks() {
    let gateway = spawn_backend().await;
    let stocks = gateway.list_stocks().await.unwrap();
    assert_eq!(stocks.len(), 3);
    assert_eq!(stocks[0].symbol, "AAPL");
}

#[tokio::test]
async fn test_get_details_normalizes() {
    let gateway = spawn_backend().await;
    let detail = gateway.get_details("AAPL", false).await.unwrap();
    assert_eq!(detail.current_price, 175.34);
    assert_eq!(detail.reliable_sources.len(), 3);
    assert!(detail.high_52_week.is_some());
    assert!(detail.latest_news.is_empty());
}

#[tokio::test]
async fn test_get_details_not_found() {
    let gateway = spawn_backend().await;
    let err = gateway.get_details("ZZZZ", false).await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::NotFound("Stock with symbol ZZZZ not found".to_string())
    );
}

#[tokio::test]
async fn test_get_details_with_defaults() {
    let gateway = spawn_backend().await;
    let detail = gateway.get_details("TSLA", true).await.unwrap();
    assert_eq!(detail.name, "TSLA");
    assert_eq!(detail.data_source.as_deref(), Some("Default Data"));
    assert!(detail.summary.contains("Data source: Default Data"));
}

#[tokio::test]
async fn test_search_found() {
    let gateway = spawn_backend().await;
    match gateway.search("MSFT").await.unwrap() {
        SearchOutcome::Found(results) => {
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].name, "Microsoft Corporation");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_search_not_found_is_data() {
    let gateway = spawn_backend().await;
    match gateway.search("ZZZZ").await.unwrap() {
        SearchOutcome::Failed(failure) => {
            assert_eq!(failure.error, "No stocks found matching ZZZZ");
            assert!(!failure.retry_with_defaults);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_unimplemented_analysis_is_status_error() {
    let gateway = spawn_backend().await;
    let err = gateway.technical_analysis("AAPL").await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::Status {
            error: "Failed to fetch technical data".to_string(),
            status: 404,
        }
    );
}

#[tokio::test]
async fn test_network_error() {
    let base = closed_port().await;
    let gateway =
        StockGateway::new(&base, Duration::from_secs(2), RateLimitDetector::default()).unwrap();

    match gateway.search("AAPL").await.unwrap() {
        SearchOutcome::Failed(failure) => {
            assert_eq!(failure.error, "Network error. Please check connection.");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    assert!(matches!(
        gateway.list_stocks().await,
        Err(GatewayError::Network(_))
    ));

    let err = gateway.ai_analysis("AAPL").await.unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_search_quota_message_offers_defaults() {
    let gateway = spawn_router(failing_upstream()).await;
    assert_eq!(
        gateway.search("QUOTA").await.unwrap(),
        SearchOutcome::Failed(SearchFailure {
            error: "You have exceeded your request allocation".to_string(),
            retry_with_defaults: true,
        })
    );
}

#[tokio::test]
async fn test_search_too_many_requests_offers_defaults() {
    let gateway = spawn_router(failing_upstream()).await;
    assert_eq!(
        gateway.search("BUSY").await.unwrap(),
        SearchOutcome::Failed(SearchFailure {
            error: "Slow down".to_string(),
            retry_with_defaults: true,
        })
    );
}

#[tokio::test]
async fn test_search_bad_gateway_without_body() {
    let gateway = spawn_router(failing_upstream()).await;
    assert_eq!(
        gateway.search("AAPL").await.unwrap(),
        SearchOutcome::Failed(SearchFailure {
            error: "An API error occurred".to_string(),
            retry_with_defaults: false,
        })
    );
}

#[tokio::test]
async fn test_enhanced_metrics_prefers_body_error() {
    let gateway = spawn_router(failing_upstream()).await;
    let err = gateway.enhanced_metrics("AAPL", 180).await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::Status {
            error: "Polygon down".to_string(),
            status: 503,
        }
    );
}
