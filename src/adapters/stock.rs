//! Dual-provider stock adapter (spec §4.6). Primary provider serves the
//! live quote and chart; the fallback provider is consulted only for
//! profile fields (market cap, sector) when the primary succeeds, or for
//! the entire quote when the primary fails outright.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tracing::warn;

use crate::adapters::fundamentals::FundamentalsAdapter;
use crate::breaker::CircuitBreaker;
use crate::cache::TtlCache;
use crate::cache_keys::stock as keys;
use crate::config::Config;
use crate::dto::{ChartPoint, SearchResult, StockAsset};
use crate::error::GatewayError;
use crate::http_client::Fetcher;

const QUOTE_TTL: Duration = Duration::from_secs(60);
const CHART_TTL: Duration = Duration::from_secs(5 * 60);
const PROFILE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const STALE_EXTENDED_HORIZON: Duration = Duration::from_secs(5 * 60);
const FETCH_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Deserialize)]
struct FinnhubQuote {
    c: f64,
    d: f64,
    dp: f64,
    h: f64,
    l: f64,
    o: f64,
    pc: f64,
}

#[derive(Debug, Deserialize)]
struct FinnhubCandle {
    c: Vec<f64>,
    h: Vec<f64>,
    l: Vec<f64>,
    o: Vec<f64>,
    v: Vec<f64>,
    t: Vec<i64>,
    s: String,
}

#[derive(Debug, Deserialize)]
struct FinnhubSearchResult {
    result: Vec<FinnhubSearchItem>,
}

#[derive(Debug, Deserialize)]
struct FinnhubSearchItem {
    symbol: String,
    description: String,
    #[serde(rename = "type")]
    _kind: String,
}

#[derive(Debug, Deserialize)]
struct TwelveDataProfile {
    exchange: Option<String>,
    sector: Option<String>,
    #[serde(default)]
    market_cap: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwelveDataTimeSeries {
    values: Option<Vec<TwelveDataBar>>,
    status: String,
}

#[derive(Debug, Deserialize)]
struct TwelveDataBar {
    datetime: String,
    open: Option<String>,
    high: Option<String>,
    low: Option<String>,
    close: String,
    volume: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwelveDataQuote {
    close: String,
    change: String,
    percent_change: String,
    volume: Option<String>,
    high: Option<String>,
    low: Option<String>,
    previous_close: Option<String>,
    open: Option<String>,
    exchange: Option<String>,
    currency: Option<String>,
}

fn parsed(value: &Option<String>) -> Option<f64> {
    value.as_ref().and_then(|s| s.parse().ok())
}

/// Maps a client-facing timeframe to (Finnhub resolution, point count,
/// TwelveData resolution code) per spec §4.6.
fn timeframe_params(timeframe: &str) -> Option<(&'static str, usize, &'static str)> {
    match timeframe {
        "1D" => Some(("5", 78, "5min")),
        "7D" => Some(("60", 50, "1h")),
        "30D" => Some(("D", 30, "1day")),
        "1Y" => Some(("D", 252, "1day")),
        _ => None,
    }
}

pub struct StockAdapter {
    fetcher: Arc<Fetcher>,
    cache: TtlCache,
    primary_breaker: Arc<CircuitBreaker>,
    fallback_breaker: Arc<CircuitBreaker>,
    primary_key: Option<String>,
    fallback_key: Option<String>,
    fundamentals: Arc<FundamentalsAdapter>,
}

impl StockAdapter {
    pub fn new(
        fetcher: Arc<Fetcher>,
        cache: TtlCache,
        primary_breaker: Arc<CircuitBreaker>,
        fallback_breaker: Arc<CircuitBreaker>,
        fundamentals: Arc<FundamentalsAdapter>,
        config: &Config,
    ) -> Self {
        Self {
            fetcher,
            cache,
            primary_breaker,
            fallback_breaker,
            primary_key: config.stock_primary_api_key.clone(),
            fallback_key: config.stock_fallback_api_key.clone(),
            fundamentals,
        }
    }

    pub fn primary_configured(&self) -> bool {
        self.primary_key.is_some()
    }

    pub fn fallback_configured(&self) -> bool {
        self.fallback_key.is_some()
    }

    pub fn any_configured(&self) -> bool {
        self.primary_configured() || self.fallback_configured()
    }

    async fn fetch_primary_quote(&self, symbol: &str) -> Result<StockAsset, GatewayError> {
        let key = self
            .primary_key
            .clone()
            .ok_or(GatewayError::NotConfigured { upstream: "stock-primary" })?;
        let url = format!("https://finnhub.io/api/v1/quote?symbol={symbol}&token={key}");
        let fetcher = self.fetcher.clone();
        self.primary_breaker
            .execute(|| async move {
                let q: FinnhubQuote = fetcher.fetch_json(&url, FETCH_TIMEOUT_MS).await?;
                Ok(StockAsset {
                    id: symbol_to_id(symbol),
                    asset_type: "stock".to_string(),
                    symbol: symbol.to_string(),
                    name: symbol.to_string(),
                    price: q.c,
                    change: q.d,
                    change_percent: q.dp,
                    volume: None,
                    high_24h: Some(q.h),
                    low_24h: Some(q.l),
                    exchange: None,
                    currency: Some("USD".to_string()),
                    market_cap: None,
                    pe: None,
                    sector: None,
                    previous_close: Some(q.pc),
                    open: Some(q.o),
                    last_updated: Utc::now().timestamp_millis(),
                })
            })
            .await
    }

    async fn fetch_fallback_profile(&self, symbol: &str) -> Result<(Option<f64>, Option<String>), GatewayError> {
        let key = self
            .fallback_key
            .clone()
            .ok_or(GatewayError::NotConfigured { upstream: "stock-fallback" })?;
        let url = format!("https://api.twelvedata.com/profile?symbol={symbol}&apikey={key}");
        let fetcher = self.fetcher.clone();
        self.fallback_breaker
            .execute(|| async move {
                let profile: TwelveDataProfile = fetcher.fetch_json(&url, FETCH_TIMEOUT_MS).await?;
                Ok((parsed(&profile.market_cap), profile.sector))
            })
            .await
    }

    async fn fetch_fallback_quote(&self, symbol: &str) -> Result<StockAsset, GatewayError> {
        let key = self
            .fallback_key
            .clone()
            .ok_or(GatewayError::NotConfigured { upstream: "stock-fallback" })?;
        let url = format!("https://api.twelvedata.com/quote?symbol={symbol}&apikey={key}");
        let fetcher = self.fetcher.clone();
        self.fallback_breaker
            .execute(|| async move {
                let q: TwelveDataQuote = fetcher.fetch_json(&url, FETCH_TIMEOUT_MS).await?;
                Ok(StockAsset {
                    id: symbol_to_id(symbol),
                    asset_type: "stock".to_string(),
                    symbol: symbol.to_string(),
                    name: symbol.to_string(),
                    price: q.close.parse().unwrap_or(0.0),
                    change: q.change.parse().unwrap_or(0.0),
                    change_percent: q.percent_change.parse().unwrap_or(0.0),
                    volume: parsed(&q.volume),
                    high_24h: parsed(&q.high),
                    low_24h: parsed(&q.low),
                    exchange: q.exchange,
                    currency: q.currency,
                    market_cap: None,
                    pe: None,
                    sector: None,
                    previous_close: parsed(&q.previous_close),
                    open: parsed(&q.open),
                    last_updated: Utc::now().timestamp_millis(),
                })
            })
            .await
    }

    /// Implements spec §4.6's fallback-merge policy (a)-(f) exactly.
    pub async fn quote(&self, symbol: &str) -> Option<StockAsset> {
        let symbol = symbol.to_uppercase();
        let key = keys::quote(&symbol);

        // (a) cache hit
        if let Some(cached) = self.cache.get_typed::<StockAsset>(&key, QUOTE_TTL) {
            return Some(cached);
        }

        if self.primary_configured() {
            // (b) primary
            match self.fetch_primary_quote(&symbol).await {
                Ok(mut asset) => {
                    // (c) fallback just for profile fields, merged in
                    if self.fallback_configured() {
                        if let Ok((market_cap, sector)) = self.fetch_fallback_profile(&symbol).await {
                            let pe = self.fundamentals.pe(&symbol).await;
                            asset.merge_profile(market_cap, sector, pe);
                        }
                    }
                    self.cache.set(&key, &asset);
                    return Some(asset);
                }
                Err(err) => {
                    warn!(error = %err, symbol, "stock primary quote failed, trying fallback");
                }
            }
        }

        // (d) primary failed or not configured: attempt entire fallback
        if self.fallback_configured() {
            if let Ok(mut asset) = self.fetch_fallback_quote(&symbol).await {
                if let Some(pe) = self.fundamentals.pe(&symbol).await {
                    asset.pe = Some(pe);
                }
                self.cache.set(&key, &asset);
                return Some(asset);
            }
        }

        // (e) stale cache at an extended horizon
        if let Some(stale) = self
            .cache
            .get_typed::<StockAsset>(&key, QUOTE_TTL + STALE_EXTENDED_HORIZON)
        {
            return Some(stale);
        }

        // (f) nothing left
        None
    }

    pub async fn batch(&self, symbols: &[String]) -> Vec<StockAsset> {
        let mut results = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            if let Some(asset) = self.quote(symbol).await {
                results.push(asset);
            }
        }
        results
    }

    /// Same (b)/(d) shape as `quote()`: primary candle series, falling back
    /// to TwelveData's time series only when primary is unconfigured or
    /// fails. Profile-merge steps (c)/(e)/(f) don't apply to chart data.
    pub async fn chart(&self, symbol: &str, timeframe: &str) -> Option<Vec<ChartPoint>> {
        let symbol = symbol.to_uppercase();
        let (resolution, count, td_resolution) = timeframe_params(timeframe)?;

        let cache_key = keys::chart(&symbol, timeframe);
        if let Some(cached) = self.cache.get_typed::<Vec<ChartPoint>>(&cache_key, CHART_TTL) {
            return Some(cached);
        }

        if self.primary_configured() {
            match self.fetch_primary_chart(&symbol, resolution).await {
                Ok(points) => {
                    self.cache.set(&cache_key, &points);
                    return Some(points);
                }
                Err(err) => {
                    warn!(error = %err, symbol, "stock primary chart failed, trying fallback");
                }
            }
        }

        if self.fallback_configured() {
            if let Ok(points) = self.fetch_fallback_chart(&symbol, td_resolution, count).await {
                self.cache.set(&cache_key, &points);
                return Some(points);
            }
        }

        None
    }

    async fn fetch_primary_chart(&self, symbol: &str, resolution: &str) -> Result<Vec<ChartPoint>, GatewayError> {
        let key = self
            .primary_key
            .clone()
            .ok_or(GatewayError::NotConfigured { upstream: "stock-primary" })?;
        let to = Utc::now().timestamp();
        let from = to - 365 * 86_400;
        let url = format!(
            "https://finnhub.io/api/v1/stock/candle?symbol={symbol}&resolution={resolution}&from={from}&to={to}&token={key}"
        );
        let fetcher = self.fetcher.clone();
        self.primary_breaker
            .execute(|| async move {
                let candle: FinnhubCandle = fetcher.fetch_json(&url, FETCH_TIMEOUT_MS).await?;
                if candle.s != "ok" {
                    return Err(GatewayError::Upstream {
                        upstream: "stock-primary",
                        message: format!("candle status {}", candle.s),
                    });
                }
                let mut points: Vec<ChartPoint> = candle
                    .t
                    .into_iter()
                    .zip(candle.c)
                    .enumerate()
                    .map(|(i, (ts, close))| ChartPoint {
                        timestamp: ts * 1000,
                        price: close,
                        open: candle.o.get(i).copied(),
                        high: candle.h.get(i).copied(),
                        low: candle.l.get(i).copied(),
                        close: Some(close),
                        volume: candle.v.get(i).copied(),
                    })
                    .collect();
                points.sort_by_key(|p| p.timestamp);
                Ok(points)
            })
            .await
    }

    async fn fetch_fallback_chart(
        &self,
        symbol: &str,
        td_resolution: &str,
        count: usize,
    ) -> Result<Vec<ChartPoint>, GatewayError> {
        let key = self
            .fallback_key
            .clone()
            .ok_or(GatewayError::NotConfigured { upstream: "stock-fallback" })?;
        let url = format!(
            "https://api.twelvedata.com/time_series?symbol={symbol}&interval={td_resolution}&outputsize={count}&apikey={key}"
        );
        let fetcher = self.fetcher.clone();
        self.fallback_breaker
            .execute(|| async move {
                let series: TwelveDataTimeSeries = fetcher.fetch_json(&url, FETCH_TIMEOUT_MS).await?;
                if series.status != "ok" {
                    return Err(GatewayError::Upstream {
                        upstream: "stock-fallback",
                        message: format!("time_series status {}", series.status),
                    });
                }
                let bars = series.values.unwrap_or_default();
                let mut points: Vec<ChartPoint> = bars
                    .into_iter()
                    .filter_map(|bar| {
                        let timestamp = parse_td_datetime(&bar.datetime)?;
                        let close: f64 = bar.close.parse().ok()?;
                        Some(ChartPoint {
                            timestamp,
                            price: close,
                            open: parsed(&bar.open),
                            high: parsed(&bar.high),
                            low: parsed(&bar.low),
                            close: Some(close),
                            volume: parsed(&bar.volume),
                        })
                    })
                    .collect();
                points.sort_by_key(|p| p.timestamp);
                Ok(points)
            })
            .await
    }

    pub async fn search(&self, query: &str) -> Vec<SearchResult> {
        let cache_key = keys::search(query);
        if let Some(cached) = self.cache.get_typed::<Vec<SearchResult>>(&cache_key, PROFILE_TTL) {
            return cached;
        }
        let Some(key) = self.primary_key.clone() else {
            return Vec::new();
        };
        let url = format!("https://finnhub.io/api/v1/search?q={query}&token={key}");
        let fetcher = self.fetcher.clone();
        let result = self
            .primary_breaker
            .execute(|| async move {
                fetcher.fetch_json::<FinnhubSearchResult>(&url, FETCH_TIMEOUT_MS).await
            })
            .await;

        match result {
            Ok(response) => {
                let results: Vec<SearchResult> = response
                    .result
                    .into_iter()
                    .map(|item| SearchResult {
                        id: symbol_to_id(&item.symbol),
                        symbol: item.symbol,
                        name: item.description,
                        exchange: None,
                    })
                    .collect();
                self.cache.set(&cache_key, &results);
                results
            }
            Err(err) => {
                warn!(error = %err, query, "stock search failed");
                Vec::new()
            }
        }
    }
}

fn symbol_to_id(symbol: &str) -> String {
    symbol.to_lowercase()
}

/// TwelveData timestamps are naive UTC, either `"%Y-%m-%d %H:%M:%S"`
/// (intraday) or `"%Y-%m-%d"` (daily).
fn parse_td_datetime(raw: &str) -> Option<i64> {
    use chrono::NaiveDateTime;

    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp_millis());
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use crate::config::{Allowlist, Environment};

    fn adapter(primary: Option<&str>, fallback: Option<&str>) -> StockAdapter {
        let clock: Arc<dyn crate::clock::Clock> = Arc::new(TestClock::new());
        let cache = TtlCache::new(clock.clone());
        let fetcher = Arc::new(Fetcher::new(
            Allowlist {
                hosts: vec![
                    "finnhub.io".to_string(),
                    "api.twelvedata.com".to_string(),
                    "financialmodelingprep.com".to_string(),
                ],
            },
            Environment::Development,
        ));
        let primary_breaker = Arc::new(CircuitBreaker::new(
            "stock-primary",
            3,
            2,
            Duration::from_secs(90),
            clock.clone(),
        ));
        let fallback_breaker = Arc::new(CircuitBreaker::new(
            "stock-fallback",
            3,
            2,
            Duration::from_secs(90),
            clock.clone(),
        ));
        let fundamentals_breaker = Arc::new(CircuitBreaker::new(
            "fundamentals",
            3,
            2,
            Duration::from_secs(90),
            clock,
        ));
        let fundamentals = Arc::new(FundamentalsAdapter::test_instance(
            fetcher.clone(),
            cache.clone(),
            fundamentals_breaker,
            None,
        ));
        StockAdapter {
            fetcher,
            cache,
            primary_breaker,
            fallback_breaker,
            primary_key: primary.map(str::to_string),
            fallback_key: fallback.map(str::to_string),
            fundamentals,
        }
    }

    #[test]
    fn timeframe_mapping_matches_spec_table() {
        assert_eq!(timeframe_params("1D"), Some(("5", 78, "5min")));
        assert_eq!(timeframe_params("1Y"), Some(("D", 252, "1day")));
        assert_eq!(timeframe_params("bogus"), None);
    }

    #[tokio::test]
    async fn no_providers_configured_returns_none() {
        let adapter = adapter(None, None);
        assert!(adapter.quote("AAPL").await.is_none());
    }

    #[tokio::test]
    async fn cache_hit_returns_without_any_provider_configured() {
        let adapter = adapter(None, None);
        let seeded = StockAsset {
            id: "aapl".to_string(),
            asset_type: "stock".to_string(),
            symbol: "AAPL".to_string(),
            name: "AAPL".to_string(),
            price: 190.0,
            change: 1.0,
            change_percent: 0.5,
            volume: None,
            high_24h: None,
            low_24h: None,
            exchange: None,
            currency: None,
            market_cap: None,
            pe: None,
            sector: None,
            previous_close: None,
            open: None,
            last_updated: 0,
        };
        adapter.cache.set(&keys::quote("AAPL"), &seeded);
        let result = adapter.quote("aapl").await.unwrap();
        assert_eq!(result.price, 190.0);
    }

    #[test]
    fn merge_profile_only_overwrites_present_fields() {
        let mut asset = StockAsset {
            id: "aapl".to_string(),
            asset_type: "stock".to_string(),
            symbol: "AAPL".to_string(),
            name: "AAPL".to_string(),
            price: 190.0,
            change: 1.0,
            change_percent: 0.5,
            volume: None,
            high_24h: None,
            low_24h: None,
            exchange: None,
            currency: None,
            market_cap: None,
            pe: None,
            sector: None,
            previous_close: None,
            open: None,
            last_updated: 0,
        };
        asset.merge_profile(Some(2_800_000_000_000.0), Some("Technology".to_string()), Some(31.2));
        assert_eq!(asset.market_cap, Some(2_800_000_000_000.0));
        assert_eq!(asset.sector.as_deref(), Some("Technology"));
        assert_eq!(asset.pe, Some(31.2));
        assert_eq!(asset.price, 190.0);
    }

    #[test]
    fn timeframe_mapping_carries_twelvedata_resolution_for_fallback_chart() {
        let (_resolution, count, td_resolution) = timeframe_params("1D").unwrap();
        assert_eq!(td_resolution, "5min");
        assert_eq!(count, 78);
    }

    #[tokio::test]
    async fn chart_with_no_providers_configured_returns_none() {
        let adapter = adapter(None, None);
        assert!(adapter.chart("AAPL", "1D").await.is_none());
    }
}
