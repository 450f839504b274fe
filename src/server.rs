//! REST backend serving the stock table.

use crate::error::ApiError;
use crate::models::{StockDetail, StockSummary};
use crate::store::StockStore;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<StockStore>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    #[serde(default)]
    pub use_defaults: bool,
}

/// Build the router over a store.
pub fn router(store: StockStore) -> Router {
    let state = AppState {
        store: Arc::new(store),
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/stocks", get(list_stocks))
        .route("/api/stocks/:symbol", get(stock_detail))
        .route("/api/search", get(search))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(store: StockStore, addr: SocketAddr) -> anyhow::Result<()> {
    let stocks = store.len();
    let app = router(store);

    info!("Registering routes:");
    info!("  GET /api/stocks");
    info!("  GET /api/stocks/:symbol");
    info!("  GET /api/search?symbol=");
    info!("  GET /health");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, stocks, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "stocks": state.store.len() }))
}

/// GET /api/stocks
async fn list_stocks(State(state): State<AppState>) -> Json<Vec<StockSummary>> {
    Json(state.store.summaries())
}

/// GET /api/stocks/:symbol
async fn stock_detail(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<DetailQuery>,
) -> Result<Json<StockDetail>, ApiError> {
    let symbol = symbol.to_uppercase();
    match state.store.get(&symbol) {
        Some(detail) => Ok(Json(detail.clone())),
        None if query.use_defaults => {
            debug!(%symbol, "serving default detail");
            Ok(Json(StockStore::default_detail(&symbol)))
        }
        None => Err(ApiError::NotFound(format!(
            "Stock with symbol {} not found",
            symbol
        ))),
    }
}

/// GET /api/search?symbol=
async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<StockSummary>, ApiError> {
    let symbol = query
        .symbol
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("Symbol query parameter is required".to_string()))?;

    state
        .store
        .get(&symbol)
        .map(|detail| Json(detail.to_summary()))
        .ok_or_else(|| ApiError::NotFound(format!("No stocks found matching {}", symbol)))
}
