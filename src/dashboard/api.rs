//! Dashboard HTTP API
//!
//! Read-only endpoints over the shared engine. Every handler takes the read
//! lock once, so a response is one consistent snapshot.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};

use super::types::*;
use crate::persistence::TradeRecord;
use crate::scanner::SharedEngine;

const DEFAULT_TRADES_LIMIT: usize = 20;
const MAX_TRADES_LIMIT: usize = 500;

/// Create the API router with all endpoints
pub fn create_router(engine: SharedEngine) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/trades", get(get_trades))
        .route("/api/health", get(get_health))
        .with_state(engine)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

// ─────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────

/// GET /api/status - Position, mood, thresholds and results
async fn get_status(State(engine): State<SharedEngine>) -> impl IntoResponse {
    let engine = engine.read().await;
    let results = ResultsResponse::from_trades(&engine.trade_log().tail(MAX_TRADES_LIMIT));
    Json(ApiResponse::success(StatusResponse {
        engine: engine.status(),
        results,
    }))
}

#[derive(Debug, Deserialize)]
struct TradesQuery {
    limit: Option<usize>,
}

/// GET /api/trades?limit=N - Most recent closed trades, oldest first
async fn get_trades(
    Query(query): Query<TradesQuery>,
    State(engine): State<SharedEngine>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_TRADES_LIMIT);
    if limit == 0 || limit > MAX_TRADES_LIMIT {
        return Json(ApiResponse::<Vec<TradeRecord>>::error(format!(
            "limit must be between 1 and {}",
            MAX_TRADES_LIMIT
        )));
    }
    let trades = engine.read().await.trade_log().tail(limit);
    Json(ApiResponse::success(trades))
}

/// GET /api/health
async fn get_health(State(engine): State<SharedEngine>) -> impl IntoResponse {
    let engine = engine.read().await;
    Json(ApiResponse::success(HealthResponse {
        status: "ok".to_string(),
        has_position: engine.has_position(),
        trades_logged: engine.trade_log().total(),
        server_time: chrono::Utc::now().timestamp_millis(),
    }))
}
