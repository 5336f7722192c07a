//! Application state: one instance of every shared primitive and adapter,
//! built once at startup and cloned (cheaply, via `Arc`) into every request
//! handler — the teacher's `AppState` shape in `main.rs`, generalized to
//! the adapters this gateway needs instead of the arbitrage bot's.

use std::sync::Arc;

use crate::adapters::blockchain_btc::BitcoinAdapter;
use crate::adapters::blockchain_eth::EthereumAdapter;
use crate::adapters::crypto::CryptoAdapter;
use crate::adapters::explorer::ExplorerAdapter;
use crate::adapters::fundamentals::FundamentalsAdapter;
use crate::adapters::llm_adapter::LlmAdapter;
use crate::adapters::stock::StockAdapter;
use crate::breaker::BreakerRegistry;
use crate::cache::TtlCache;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::http_client::Fetcher;
use crate::llm::LlmClient;
use crate::rate_limiter::FixedWindowLimiter;

/// The *inbound* per-IP limiter (spec §5) is a separate component, kept in
/// its own `middleware::rate_limit::RateLimitLayer` and wired directly as an
/// `axum::middleware::from_fn` layer ahead of the router instead of living
/// here — only the LLM-path limiter (§4.4) is part of request-handler state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
    pub cache: TtlCache,
    pub breakers: Arc<BreakerRegistry>,

    pub fetcher: Arc<Fetcher>,
    pub crypto: Arc<CryptoAdapter>,
    pub ethereum: Arc<EthereumAdapter>,
    pub bitcoin: Arc<BitcoinAdapter>,
    pub explorer: Arc<ExplorerAdapter>,
    pub stock: Arc<StockAdapter>,
    pub fundamentals: Arc<FundamentalsAdapter>,
    pub llm: Arc<LlmAdapter>,
    pub llm_client: Arc<LlmClient>,

    pub started_at: std::time::Instant,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache = TtlCache::new(clock.clone());
        let breakers = Arc::new(BreakerRegistry::new(clock.clone()));
        let fetcher = Arc::new(Fetcher::new(config.allowlist.clone(), config.environment));

        let llm_limiter = Arc::new(FixedWindowLimiter::new(
            config.llm_rate_limit_per_window,
            config.llm_rate_window,
            clock.clone(),
        ));

        let crypto = Arc::new(CryptoAdapter::new(
            fetcher.clone(),
            cache.clone(),
            breakers.get("crypto-prices"),
            &config,
        ));
        let ethereum = Arc::new(EthereumAdapter::new(
            fetcher.clone(),
            cache.clone(),
            breakers.get("blockchain-ethereum"),
            &config,
        ));
        let bitcoin = Arc::new(BitcoinAdapter::new(
            fetcher.clone(),
            cache.clone(),
            breakers.get("blockchain-bitcoin"),
            &config,
        ));
        let explorer = Arc::new(ExplorerAdapter::new(ethereum.clone(), bitcoin.clone()));
        let fundamentals = Arc::new(FundamentalsAdapter::new(
            fetcher.clone(),
            cache.clone(),
            breakers.get("fundamentals"),
            &config,
        ));
        let stock = Arc::new(StockAdapter::new(
            fetcher.clone(),
            cache.clone(),
            breakers.get("stock-primary"),
            breakers.get("stock-fallback"),
            fundamentals.clone(),
            &config,
        ));
        let llm_client = Arc::new(LlmClient::new(
            config.llm_api_key.clone(),
            fetcher.clone(),
            cache.clone(),
            llm_limiter,
            breakers.get("llm"),
        ));
        let llm = Arc::new(LlmAdapter::new(llm_client.clone(), stock.clone(), fundamentals.clone()));

        Self {
            config: Arc::new(config),
            clock,
            cache,
            breakers,
            fetcher,
            crypto,
            ethereum,
            bitcoin,
            explorer,
            stock,
            fundamentals,
            llm,
            llm_client,
            started_at: std::time::Instant::now(),
        }
    }
}
