//! `/health` route (spec §4.7, §6): concurrently probes every upstream via
//! a `safe_fetch`-style best-effort request, reporting per-service
//! `{status, responseTime}` plus an aggregate. 200 iff every configured
//! upstream probe succeeds, else 503 so a load balancer can react.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use futures_util::future::join_all;
use serde_json::json;

use crate::state::AppState;

struct Probe {
    name: &'static str,
    url: Option<String>,
}

/// An unconfigured upstream isn't probed at all and doesn't count against
/// aggregate health — there's nothing wrong with it, it's just not in use.
async fn run_probe(state: &AppState, probe: Probe) -> (&'static str, serde_json::Value, bool) {
    let Some(url) = probe.url else {
        return (
            probe.name,
            json!({ "status": "ok", "responseTime": 0, "configured": false }),
            true,
        );
    };
    let started = Instant::now();
    let ok = state.fetcher.probe(&url, 5_000).await.is_ok();
    let response_time = started.elapsed().as_millis() as u64;
    (
        probe.name,
        json!({ "status": if ok { "ok" } else { "error" }, "responseTime": response_time }),
        ok,
    )
}

pub async fn health(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let probes = vec![
        Probe {
            name: "crypto",
            url: Some("https://api.coingecko.com/api/v3/ping".to_string()),
        },
        Probe {
            name: "ethereum",
            url: state.config.etherscan_api_key.as_ref().map(|key| {
                format!("https://api.etherscan.io/api?module=proxy&action=eth_blockNumber&apikey={key}")
            }),
        },
        Probe {
            name: "bitcoin",
            url: Some("https://api.blockcypher.com/v1/btc/main".to_string()),
        },
        Probe {
            name: "stock",
            url: state
                .config
                .stock_primary_api_key
                .as_ref()
                .map(|key| format!("https://finnhub.io/api/v1/quote?symbol=AAPL&token={key}")),
        },
        Probe {
            name: "fundamentals",
            url: state
                .config
                .fundamentals_api_key
                .as_ref()
                .map(|key| format!("https://financialmodelingprep.com/api/v3/quote/AAPL?apikey={key}")),
        },
        Probe {
            name: "llm",
            url: state
                .config
                .llm_api_key
                .as_ref()
                .map(|key| format!("https://generativelanguage.googleapis.com/v1beta/models?key={key}")),
        },
    ];

    let results = join_all(probes.into_iter().map(|p| run_probe(&state, p))).await;

    let all_ok = results.iter().all(|(_, _, ok)| *ok);
    let services: serde_json::Map<String, serde_json::Value> =
        results.into_iter().map(|(name, body, _)| (name.to_string(), body)).collect();

    let body = json!({
        "status": if all_ok { "ok" } else { "degraded" },
        "timestamp": Utc::now().to_rfc3339(),
        "uptime": state.started_at.elapsed().as_secs(),
        "responseTime": started.elapsed().as_millis() as u64,
        "services": services,
        "cache": state.cache.stats(),
        "environment": if state.config.environment.is_production() { "production" } else { "development" },
    });

    let status = if all_ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(body)).into_response()
}
