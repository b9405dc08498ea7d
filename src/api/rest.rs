// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. The dashboard is a local viewer with
// no accounts, so there is no authentication layer.
//
// CORS is configured permissively so a page served from another origin
// (e.g. a dev server) can reach the API.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::api::command::TransitionRequest;
use crate::app_state::AppState;
use crate::binance::rate_limit::RateLimitSnapshot;
use crate::types::{ChartType, Indicator, SymbolInfo, Timeframe, SYMBOLS};

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/catalog", get(catalog))
        .route("/api/v1/session", get(get_session).post(post_session))
        .route("/api/v1/view", get(view))
        // ── WebSocket (handled in the ws module but mounted here) ───
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    view_version: u64,
    server_time: i64,
    disposed: bool,
    ticker_timers: usize,
    book_timers: usize,
    feed: Option<FeedTarget>,
    rate_limit: RateLimitSnapshot,
}

#[derive(Serialize)]
struct FeedTarget {
    symbol: String,
    interval: String,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (ticker_timers, book_timers) = state.active_timers();
    let resp = HealthResponse {
        status: "ok",
        uptime_secs: state.uptime_secs(),
        view_version: state.view.version(),
        server_time: chrono::Utc::now().timestamp_millis(),
        disposed: state.is_disposed(),
        ticker_timers,
        book_timers,
        feed: state
            .feed_target()
            .map(|(symbol, interval)| FeedTarget { symbol, interval }),
        rate_limit: state.rate_limit(),
    };
    Json(resp)
}

// =============================================================================
// Catalog — the fixed choices the page offers
// =============================================================================

#[derive(Serialize)]
struct TimeframeEntry {
    label: &'static str,
    value: &'static str,
    interval: &'static str,
    duration_ms: i64,
}

#[derive(Serialize)]
struct CatalogResponse {
    symbols: &'static [SymbolInfo],
    timeframes: Vec<TimeframeEntry>,
    chart_types: [ChartType; 6],
    overlays: [Indicator; 4],
    subcharts: [Indicator; 4],
}

fn build_catalog() -> CatalogResponse {
    CatalogResponse {
        symbols: SYMBOLS,
        timeframes: Timeframe::ALL
            .iter()
            .map(|tf| TimeframeEntry {
                label: tf.label(),
                value: tf.value(),
                interval: tf.interval(),
                duration_ms: tf.duration_ms(),
            })
            .collect(),
        chart_types: ChartType::ALL,
        overlays: Indicator::OVERLAYS,
        subcharts: Indicator::SUBCHARTS,
    }
}

async fn catalog() -> impl IntoResponse {
    Json(build_catalog())
}

// =============================================================================
// Session
// =============================================================================

async fn get_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.session())
}

async fn post_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TransitionRequest>,
) -> impl IntoResponse {
    let transition = match body.into_transition() {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "session command rejected");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    let update = state.apply(transition);
    if update.changed {
        info!(
            symbol = %update.session.symbol.code,
            interval = %update.session.timeframe,
            "session updated via REST"
        );
    }
    Json(update).into_response()
}

// =============================================================================
// View snapshot
// =============================================================================

async fn view(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.view.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lists_every_choice() {
        let json = serde_json::to_value(build_catalog()).unwrap();
        assert_eq!(json["symbols"].as_array().unwrap().len(), 7);
        assert_eq!(json["symbols"][0]["code"], "BTCUSDT");
        assert_eq!(json["timeframes"].as_array().unwrap().len(), 8);
        assert_eq!(json["timeframes"][0]["interval"], "1m");
        assert_eq!(json["chart_types"][0], "candle_solid");
        assert_eq!(json["overlays"][2], "BOLL");
        assert_eq!(json["subcharts"][3], "KDJ");
    }
}
