//! `/stats` route (spec §6): aggregate counters across both supported
//! chains plus process uptime.

use axum::extract::State;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::state::AppState;

pub async fn stats(State(state): State<AppState>) -> Response {
    let (eth, btc) = tokio::join!(state.ethereum.network_stats(), state.bitcoin.network_stats());

    let total_blocks = eth.block_height + btc.block_height;
    let total_transactions = ((eth.tps * 86_400.0) + (btc.tps * 86_400.0)).round() as u64;
    let uptime = state.started_at.elapsed().as_secs();

    Json(json!({
        "totalBlocks": total_blocks,
        "totalTransactions": total_transactions,
        "networksSupported": ["ethereum", "bitcoin"],
        "uptime": uptime,
    }))
    .into_response()
}
