//! Route Dispatcher (spec §4.7, §6): validates parameters before any
//! adapter call, composes adapters according to each route's fallback
//! policy, and shapes the HTTP response.

pub mod ai;
pub mod blockchain;
pub mod chart;
pub mod health;
pub mod prices;
pub mod stats;
pub mod stocks;
mod validation;

use axum::body::Body;
use axum::http::{HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::error::{ErrorRenderMode, GatewayError};
use crate::state::AppState;

/// Common headers required on every `/api/*` response (spec §6). Wired as an
/// `axum::middleware::from_fn` layer ahead of the router rather than applied
/// per-handler, so no route can forget them.
pub async fn apply_standard_headers(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "Cache-Control",
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    response
}

/// Renders a `GatewayError` using the environment's render mode, the way
/// every handler in this module does instead of relying on the default
/// (always-production) `IntoResponse` impl.
pub fn render_error(state: &AppState, err: GatewayError) -> axum::response::Response {
    let mode = ErrorRenderMode {
        is_production: state.config.environment.is_production(),
    };
    err.into_response_with_mode(&mode)
}

pub fn not_found() -> axum::response::Response {
    (StatusCode::NOT_FOUND, "not found").into_response()
}

/// Builds the CORS layer from the configured allowlist. Spec §6 requires
/// an explicit origin allowlist with credentials enabled — replacing the
/// teacher's blanket `CorsLayer::permissive()`, which cannot carry
/// credentials and accepts any origin.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/prices", get(prices::top_coins))
        .route("/prices/batch", get(prices::batch))
        .route("/chart/:coin_id/:range", get(chart::coin_chart))
        .route("/network/:chain", get(blockchain::network_stats))
        .route("/blocks/:chain/:limit/:page", get(blockchain::list_blocks))
        .route("/block/:chain/:number", get(blockchain::get_block))
        .route(
            "/block/:chain/:number/transactions",
            get(blockchain::get_block_transactions),
        )
        .route("/tx/:hash", get(blockchain::transaction))
        .route("/address/:address", get(blockchain::address))
        .route(
            "/address/:address/transactions",
            get(blockchain::address_transactions),
        )
        .route("/stocks", get(stocks::top_stocks))
        .route("/stocks/search", get(stocks::search))
        .route("/stocks/batch", get(stocks::batch))
        .route("/stocks/status", get(stocks::status))
        .route("/stocks/movers/:kind", get(stocks::movers))
        .route("/stocks/sectors", get(stocks::sectors))
        .route("/stocks/news", get(stocks::general_news))
        .route("/stocks/calendar/:kind", get(stocks::calendar))
        .route("/stocks/:symbol", get(stocks::detail))
        .route("/stocks/:symbol/chart", get(stocks::chart))
        .route("/stocks/:symbol/:section", get(stocks::fundamentals_section))
        .route("/ai/search", post(ai::search))
        .route("/ai/summary/:symbol", get(ai::summary))
        .route("/ai/market", get(ai::market))
        .route("/ai/status", get(ai::status))
        .route("/stats", get(stats::stats))
        .route("/health", get(health::health))
}
