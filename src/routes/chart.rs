//! `/chart/:coin_id/:range` route (spec §6).

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json, Response};

use crate::error::GatewayError;
use crate::state::AppState;

use super::{render_error, validation};

pub async fn coin_chart(State(state): State<AppState>, Path((coin_id, range)): Path<(String, String)>) -> Response {
    let coin_id = match validation::coin_id(&coin_id) {
        Ok(id) => id,
        Err(err) => return render_error(&state, err),
    };
    let range = match validation::chart_range(&range) {
        Ok(r) => r,
        Err(err) => return render_error(&state, err),
    };

    match state.crypto.chart(&coin_id, &range).await {
        Some(points) => Json(points).into_response(),
        None => render_error(&state, GatewayError::NotFound),
    }
}
