//! `/network`, `/blocks`, `/block`, `/tx`, `/address` route family (spec §6):
//! dispatches to the Ethereum or Bitcoin adapter directly by path segment,
//! or through the cross-chain explorer when the chain isn't named in the
//! path.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json, Response};

use crate::error::GatewayError;
use crate::state::AppState;

use super::{render_error, validation};

pub async fn network_stats(State(state): State<AppState>, Path(chain): Path<String>) -> Response {
    let chain = match validation::chain(&chain) {
        Ok(c) => c,
        Err(err) => return render_error(&state, err),
    };
    let stats = if chain == "ethereum" {
        state.ethereum.network_stats().await
    } else {
        state.bitcoin.network_stats().await
    };
    Json(stats).into_response()
}

pub async fn list_blocks(
    State(state): State<AppState>,
    Path((chain, limit, page)): Path<(String, String, String)>,
) -> Response {
    let chain = match validation::chain(&chain) {
        Ok(c) => c,
        Err(err) => return render_error(&state, err),
    };
    let limit = match validation::limit(&limit) {
        Ok(v) => v,
        Err(err) => return render_error(&state, err),
    };
    let page = match validation::page(&page) {
        Ok(v) => v,
        Err(err) => return render_error(&state, err),
    };

    let blocks = if chain == "ethereum" {
        state.ethereum.list_blocks(limit, page).await
    } else {
        state.bitcoin.list_blocks(limit, page).await
    };
    Json(blocks).into_response()
}

pub async fn get_block(State(state): State<AppState>, Path((chain, number)): Path<(String, String)>) -> Response {
    let chain = match validation::chain(&chain) {
        Ok(c) => c,
        Err(err) => return render_error(&state, err),
    };
    let number = match validation::block_number(&number) {
        Ok(n) => n,
        Err(err) => return render_error(&state, err),
    };

    let block = if chain == "ethereum" {
        state.ethereum.get_block(&number).await
    } else {
        state.bitcoin.get_block(&number).await
    };
    match block {
        Some(block) => Json(block).into_response(),
        None => render_error(&state, GatewayError::NotFound),
    }
}

pub async fn get_block_transactions(
    State(state): State<AppState>,
    Path((chain, number)): Path<(String, String)>,
) -> Response {
    let chain = match validation::chain(&chain) {
        Ok(c) => c,
        Err(err) => return render_error(&state, err),
    };
    let number = match validation::block_number(&number) {
        Ok(n) => n,
        Err(err) => return render_error(&state, err),
    };

    let txs = if chain == "ethereum" {
        state.ethereum.get_block_transactions(&number).await
    } else {
        state.bitcoin.get_block_transactions(&number).await
    };
    Json(txs).into_response()
}

pub async fn transaction(State(state): State<AppState>, Path(hash): Path<String>) -> Response {
    let hash = match validation::tx_hash(&hash) {
        Ok(h) => h,
        Err(err) => return render_error(&state, err),
    };
    match state.explorer.transaction(&hash).await {
        Some(tx) => Json(tx).into_response(),
        None => render_error(&state, GatewayError::NotFound),
    }
}

pub async fn address(State(state): State<AppState>, Path(address): Path<String>) -> Response {
    let address = match validation::address(&address) {
        Ok(a) => a,
        Err(err) => return render_error(&state, err),
    };
    match state.explorer.address(&address).await {
        Some(info) => Json(info).into_response(),
        None => render_error(&state, GatewayError::NotFound),
    }
}

pub async fn address_transactions(State(state): State<AppState>, Path(address): Path<String>) -> Response {
    let address = match validation::address(&address) {
        Ok(a) => a,
        Err(err) => return render_error(&state, err),
    };
    match state.explorer.address_transactions(&address).await {
        Some(txs) => Json(txs).into_response(),
        None => render_error(&state, GatewayError::NotFound),
    }
}
