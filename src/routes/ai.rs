//! `/ai/*` route family (spec §6): natural-language search parsing, stock
//! summarization, market overview, and LLM status.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;

use crate::adapters::llm_adapter::SummaryOutcome;
use crate::error::GatewayError;
use crate::state::AppState;

use super::render_error;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    query: String,
}

pub async fn search(State(state): State<AppState>, Json(body): Json<SearchRequest>) -> Response {
    let query = body.query.trim();
    if query.is_empty() {
        return render_error(
            &state,
            GatewayError::validation("missing query", json!({ "field": "query" })),
        );
    }
    let filters = state.llm.parse_search_query(query).await;
    Json(filters).into_response()
}

pub async fn summary(State(state): State<AppState>, Path(symbol): Path<String>) -> Response {
    if !state.llm_client.is_configured() {
        return render_error(&state, GatewayError::NotConfigured { upstream: "llm" });
    }
    match state.llm.summarize_stock(&symbol).await {
        SummaryOutcome::Ready(summary) => Json(summary).into_response(),
        SummaryOutcome::SymbolNotFound => render_error(&state, GatewayError::NotFound),
        SummaryOutcome::GenerationFailed => render_error(
            &state,
            GatewayError::Upstream {
                upstream: "llm",
                message: format!("summary generation failed for {symbol}"),
            },
        ),
    }
}

pub async fn market(State(state): State<AppState>) -> Response {
    if !state.llm_client.is_configured() {
        return render_error(&state, GatewayError::NotConfigured { upstream: "llm" });
    }
    match state.llm.market_overview().await {
        Some(overview) => Json(overview).into_response(),
        None => render_error(
            &state,
            GatewayError::Upstream {
                upstream: "llm",
                message: "market overview generation failed".to_string(),
            },
        ),
    }
}

pub async fn status(State(state): State<AppState>) -> Response {
    Json(json!({
        "configured": state.llm_client.is_configured(),
        "requestsRemaining": state.llm_client.requests_remaining(),
    }))
    .into_response()
}
