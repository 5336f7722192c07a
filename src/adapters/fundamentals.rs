//! Fundamentals adapter (spec §4.6): thin, uniformly-shaped wrappers around
//! an FMP-style upstream. Every operation follows the same
//! configured→cache→fetch→cache flow; only the path and TTL tier differ.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::breaker::CircuitBreaker;
use crate::cache::TtlCache;
use crate::cache_keys::fundamentals as keys;
use crate::config::Config;
use crate::dto::Mover;
use crate::http_client::Fetcher;

const MOVERS_TTL: Duration = Duration::from_secs(5 * 60);
const NEWS_SECTORS_TTL: Duration = Duration::from_secs(10 * 60);
const PROFILE_CALENDAR_TTL: Duration = Duration::from_secs(15 * 60);
const ANALYST_TTL: Duration = Duration::from_secs(30 * 60);
const FINANCIALS_TTL: Duration = Duration::from_secs(60 * 60);
const FETCH_TIMEOUT_MS: u64 = 10_000;

/// Spec §4.6 P/E validity rule: finite, non-zero, bounded magnitude.
pub fn validate_pe(pe: f64) -> Option<f64> {
    if pe.is_finite() && pe != 0.0 && pe.abs() < 10_000.0 {
        Some(pe)
    } else {
        None
    }
}

pub struct FundamentalsAdapter {
    fetcher: Arc<Fetcher>,
    cache: TtlCache,
    breaker: Arc<CircuitBreaker>,
    api_key: Option<String>,
    api_base: String,
}

impl FundamentalsAdapter {
    pub fn new(fetcher: Arc<Fetcher>, cache: TtlCache, breaker: Arc<CircuitBreaker>, config: &Config) -> Self {
        Self {
            fetcher,
            cache,
            breaker,
            api_key: config.fundamentals_api_key.clone(),
            api_base: "https://financialmodelingprep.com/api/v3".to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Bypasses `Config` for adapters (e.g. `stock`) whose own tests need a
    /// `FundamentalsAdapter` to wire in without building a full `Config`.
    #[cfg(test)]
    pub fn test_instance(
        fetcher: Arc<Fetcher>,
        cache: TtlCache,
        breaker: Arc<CircuitBreaker>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            fetcher,
            cache,
            breaker,
            api_key,
            api_base: "https://financialmodelingprep.com/api/v3".to_string(),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, cache_key: String, ttl: Duration, path: &str) -> Option<T> {
        if !self.is_configured() {
            return None;
        }
        if let Some(cached) = self.cache.get_typed::<T>(&cache_key, ttl) {
            return Some(cached);
        }

        let api_key = self.api_key.clone().unwrap();
        let separator = if path.contains('?') { '&' } else { '?' };
        let url = format!("{}{path}{separator}apikey={api_key}", self.api_base);
        let fetcher = self.fetcher.clone();
        let result = self
            .breaker
            .execute(|| async move { fetcher.fetch_json::<T>(&url, FETCH_TIMEOUT_MS).await })
            .await;

        match result {
            Ok(value) => {
                self.cache.set(&cache_key, &value);
                Some(value)
            }
            Err(err) => {
                warn!(error = %err, path, "fundamentals fetch failed");
                None
            }
        }
    }

    pub async fn profile(&self, symbol: &str) -> Option<Value> {
        self.fetch(keys::profile(symbol), PROFILE_CALENDAR_TTL, &format!("/profile/{symbol}"))
            .await
    }

    /// Pulls the P/E ratio out of the FMP profile payload (a single-element
    /// array with a `pe` field) and runs it through [`validate_pe`].
    pub async fn pe(&self, symbol: &str) -> Option<f64> {
        let profile = self.profile(symbol).await?;
        let raw = profile.get(0)?.get("pe")?.as_f64()?;
        validate_pe(raw)
    }

    pub async fn news(&self, symbol: &str) -> Option<Value> {
        self.fetch(
            keys::news(symbol),
            NEWS_SECTORS_TTL,
            &format!("/stock_news?tickers={symbol}&limit=20"),
        )
        .await
    }

    pub async fn earnings(&self, symbol: &str) -> Option<Value> {
        self.fetch(keys::earnings(symbol), ANALYST_TTL, &format!("/earnings-surprises/{symbol}"))
            .await
    }

    pub async fn grades(&self, symbol: &str) -> Option<Value> {
        self.fetch(keys::grades(symbol), ANALYST_TTL, &format!("/grade/{symbol}"))
            .await
    }

    pub async fn grade_consensus(&self, symbol: &str) -> Option<Value> {
        self.fetch(
            keys::grade_consensus(symbol),
            ANALYST_TTL,
            &format!("/grade-consensus?symbol={symbol}"),
        )
        .await
    }

    pub async fn price_target(&self, symbol: &str) -> Option<Value> {
        self.fetch(
            keys::price_target(symbol),
            ANALYST_TTL,
            &format!("/price-target-consensus?symbol={symbol}"),
        )
        .await
    }

    pub async fn estimates(&self, symbol: &str) -> Option<Value> {
        self.fetch(
            keys::estimates(symbol),
            ANALYST_TTL,
            &format!("/analyst-estimates/{symbol}"),
        )
        .await
    }

    pub async fn income(&self, symbol: &str) -> Option<Value> {
        self.fetch(keys::income(symbol), FINANCIALS_TTL, &format!("/income-statement/{symbol}"))
            .await
    }

    pub async fn balance_sheet(&self, symbol: &str) -> Option<Value> {
        self.fetch(
            keys::balance_sheet(symbol),
            FINANCIALS_TTL,
            &format!("/balance-sheet-statement/{symbol}"),
        )
        .await
    }

    pub async fn cash_flow(&self, symbol: &str) -> Option<Value> {
        self.fetch(
            keys::cash_flow(symbol),
            FINANCIALS_TTL,
            &format!("/cash-flow-statement/{symbol}"),
        )
        .await
    }

    pub async fn metrics(&self, symbol: &str) -> Option<Value> {
        self.fetch(keys::metrics(symbol), FINANCIALS_TTL, &format!("/key-metrics/{symbol}"))
            .await
    }

    pub async fn institutions(&self, symbol: &str) -> Option<Value> {
        self.fetch(
            keys::institutions(symbol),
            ANALYST_TTL,
            &format!("/institutional-holder/{symbol}"),
        )
        .await
    }

    pub async fn movers(&self, kind: &str) -> Option<Vec<Mover>> {
        let path = match kind {
            "gainers" => "/stock_market/gainers",
            "losers" => "/stock_market/losers",
            "actives" => "/stock_market/actives",
            _ => return None,
        };
        self.fetch(keys::movers(kind), MOVERS_TTL, path).await
    }

    pub async fn sectors(&self) -> Option<Value> {
        self.fetch(keys::sectors(), NEWS_SECTORS_TTL, "/sector-performance").await
    }

    pub async fn general_news(&self) -> Option<Value> {
        self.fetch(keys::general_news(), NEWS_SECTORS_TTL, "/stock_news?limit=50").await
    }

    pub async fn calendar(&self, kind: &str) -> Option<Value> {
        let path = match kind {
            "earnings" => "/earning_calendar",
            "dividends" => "/stock_dividend_calendar",
            "ipos" => "/ipo_calendar",
            "splits" => "/stock_split_calendar",
            _ => return None,
        };
        self.fetch(keys::calendar(kind), PROFILE_CALENDAR_TTL, path).await
    }
}
