//! `/stocks/*` route family (spec §6): dual-provider quotes/charts plus the
//! thin fundamentals wrappers, dispatched by path segment.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::error::GatewayError;
use crate::state::AppState;

use super::{render_error, validation};

/// Symbols shown on the landing page when no specific list is requested.
const DEFAULT_SYMBOLS: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "AMZN", "NVDA", "META", "TSLA", "JPM", "V", "WMT",
];

pub async fn top_stocks(State(state): State<AppState>) -> Response {
    let symbols: Vec<String> = DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect();
    let assets = state.stock.batch(&symbols).await;
    Json(assets).into_response()
}

pub async fn search(State(state): State<AppState>, Query(params): Query<HashMap<String, String>>) -> Response {
    let query = match params.get("q").map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some(q) => q,
        None => {
            return render_error(
                &state,
                GatewayError::validation("missing query", json!({ "field": "q" })),
            )
        }
    };
    let results = state.stock.search(query).await;
    Json(results).into_response()
}

pub async fn batch(State(state): State<AppState>, Query(params): Query<HashMap<String, String>>) -> Response {
    let raw = match params.get("symbols") {
        Some(v) => v,
        None => {
            return render_error(
                &state,
                GatewayError::validation("missing symbols", json!({ "field": "symbols" })),
            )
        }
    };
    let symbols = match validation::symbol_list(raw, 50) {
        Ok(symbols) => symbols,
        Err(err) => return render_error(&state, err),
    };
    let assets = state.stock.batch(&symbols).await;
    Json(assets).into_response()
}

pub async fn status(State(state): State<AppState>) -> Response {
    Json(json!({
        "primaryConfigured": state.stock.primary_configured(),
        "fallbackConfigured": state.stock.fallback_configured(),
        "anyConfigured": state.stock.any_configured(),
        "fundamentalsConfigured": state.fundamentals.is_configured(),
    }))
    .into_response()
}

pub async fn movers(State(state): State<AppState>, Path(kind): Path<String>) -> Response {
    if !["gainers", "losers", "actives"].contains(&kind.as_str()) {
        return render_error(
            &state,
            GatewayError::validation("invalid movers kind", json!({ "field": "kind", "value": kind })),
        );
    }
    fundamentals_response(&state, state.fundamentals.movers(&kind).await.map(|v| json!(v))).await
}

pub async fn sectors(State(state): State<AppState>) -> Response {
    fundamentals_response(&state, state.fundamentals.sectors().await).await
}

pub async fn general_news(State(state): State<AppState>) -> Response {
    fundamentals_response(&state, state.fundamentals.general_news().await).await
}

pub async fn calendar(State(state): State<AppState>, Path(kind): Path<String>) -> Response {
    if !["earnings", "dividends", "ipos", "splits"].contains(&kind.as_str()) {
        return render_error(
            &state,
            GatewayError::validation("invalid calendar kind", json!({ "field": "kind", "value": kind })),
        );
    }
    fundamentals_response(&state, state.fundamentals.calendar(&kind).await).await
}

pub async fn detail(State(state): State<AppState>, Path(symbol): Path<String>) -> Response {
    if !state.stock.any_configured() {
        return render_error(&state, GatewayError::NotConfigured { upstream: "stock" });
    }
    match state.stock.quote(&symbol).await {
        Some(asset) => Json(asset).into_response(),
        // Configured but no provider produced a quote: spec §6 lists only
        // 404 (not 503) as the non-2xx outcome for this route, distinct
        // from the not-configured case already handled above.
        None => render_error(&state, GatewayError::NotFound),
    }
}

pub async fn chart(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let timeframe = params.get("timeframe").map(String::as_str).unwrap_or("1D");
    let timeframe = match validation::timeframe(timeframe) {
        Ok(t) => t,
        Err(err) => return render_error(&state, err),
    };
    if !state.stock.primary_configured() {
        return render_error(&state, GatewayError::NotConfigured { upstream: "stock-primary" });
    }
    match state.stock.chart(&symbol, &timeframe).await {
        Some(points) => Json(points).into_response(),
        // spec §6 lists 400/404 for this route, not 503.
        None => render_error(&state, GatewayError::NotFound),
    }
}

pub async fn fundamentals_section(
    State(state): State<AppState>,
    Path((symbol, section)): Path<(String, String)>,
) -> Response {
    let fetched = match section.as_str() {
        "profile" => state.fundamentals.profile(&symbol).await,
        "news" => state.fundamentals.news(&symbol).await,
        "earnings" => state.fundamentals.earnings(&symbol).await,
        "grades" => state.fundamentals.grades(&symbol).await,
        "consensus" => state.fundamentals.grade_consensus(&symbol).await,
        "price-target" | "price-targets" => state.fundamentals.price_target(&symbol).await,
        "estimates" => state.fundamentals.estimates(&symbol).await,
        "income" => state.fundamentals.income(&symbol).await,
        "balance-sheet" => state.fundamentals.balance_sheet(&symbol).await,
        "cash-flow" => state.fundamentals.cash_flow(&symbol).await,
        "metrics" => state.fundamentals.metrics(&symbol).await,
        "institutions" => state.fundamentals.institutions(&symbol).await,
        _ => {
            return render_error(
                &state,
                GatewayError::validation("invalid fundamentals section", json!({ "field": "section", "value": section })),
            )
        }
    };
    fundamentals_response(&state, fetched).await
}

async fn fundamentals_response(state: &AppState, fetched: Option<serde_json::Value>) -> Response {
    if !state.fundamentals.is_configured() {
        return render_error(state, GatewayError::NotConfigured { upstream: "fundamentals" });
    }
    match fetched {
        Some(value) => Json(value).into_response(),
        None => render_error(
            state,
            GatewayError::Upstream {
                upstream: "fundamentals",
                message: "fetch failed".to_string(),
            },
        ),
    }
}
