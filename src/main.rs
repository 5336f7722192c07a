//! Gateway entrypoint: load configuration, build `AppState`, mount the
//! `/api` router behind CORS/body-limit/rate-limit/logging layers, and
//! serve. Mirrors the teacher's `main.rs` shape (env + tracing init, then
//! router composition, then bind + `axum::serve`) with this gateway's own
//! state and routes in place of the arbitrage bot's.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tickerhub_gateway::config::Config;
use tickerhub_gateway::middleware::rate_limit::{RateLimitConfig, RateLimitLayer};
use tickerhub_gateway::routes;
use tickerhub_gateway::state::AppState;

/// Request bodies beyond this are rejected before any handler runs (spec §5
/// "Resource caps"). Only `/ai/search` accepts a body at all, but the limit
/// applies uniformly the way the teacher applies its layers across the
/// whole router rather than per-route.
const MAX_BODY_BYTES: usize = 10 * 1024;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tickerhub_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env();
    let port = config.port;
    let environment = config.environment;
    let cors_origins = config.cors_allowed_origins.clone();
    let inbound_limit = config.inbound_rate_limit_per_minute;

    info!(?environment, port, "tickerhub-gateway starting up");

    let state = AppState::new(config);

    let inbound_limiter = RateLimitLayer::new(
        RateLimitConfig {
            max_requests: inbound_limit,
            window: Duration::from_secs(60),
        },
        state.clock.clone(),
    );

    let app = Router::new()
        .nest("/api", routes::api_router())
        .with_state(state)
        .layer(axum::middleware::from_fn_with_state(
            inbound_limiter,
            tickerhub_gateway::middleware::rate_limit::rate_limit_middleware,
        ))
        .layer(axum::middleware::from_fn(
            tickerhub_gateway::middleware::logging::request_logging,
        ))
        .layer(axum::middleware::from_fn(routes::apply_standard_headers))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(routes::cors_layer(&cors_origins))
        .into_make_service_with_connect_info::<SocketAddr>();

    let addr = format!("0.0.0.0:{port}");
    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
