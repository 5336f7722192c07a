//! `/prices` route family (spec §6): CoinGecko-backed top coins and batch
//! lookup by id.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json, Response};

use crate::error::GatewayError;
use crate::state::AppState;

use super::{render_error, validation};

pub async fn top_coins(State(state): State<AppState>) -> Response {
    match state.crypto.top_coins().await {
        Some(quotes) => Json(quotes).into_response(),
        // spec §6 lists plain 500 for this route, unlike the 503
        // "service unavailable" shape used elsewhere.
        None => render_error(
            &state,
            GatewayError::Internal(anyhow::anyhow!("top coins fetch failed")),
        ),
    }
}

pub async fn batch(State(state): State<AppState>, Query(params): Query<HashMap<String, String>>) -> Response {
    let raw = match params.get("ids") {
        Some(v) => v,
        None => {
            return render_error(
                &state,
                GatewayError::validation("missing ids", serde_json::json!({ "field": "ids" })),
            )
        }
    };
    let ids = match validation::coin_id_list(raw, 50) {
        Ok(ids) => ids,
        Err(err) => return render_error(&state, err),
    };

    let Some(all) = state.crypto.top_coins().await else {
        return render_error(
            &state,
            GatewayError::Internal(anyhow::anyhow!("batch fetch failed")),
        );
    };
    let matched: Vec<_> = all.into_iter().filter(|q| ids.contains(&q.id)).collect();
    Json(matched).into_response()
}
