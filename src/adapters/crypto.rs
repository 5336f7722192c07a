//! Crypto prices adapter (spec §4.6: CoinGecko-shaped upstream).

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use crate::breaker::CircuitBreaker;
use crate::cache::TtlCache;
use crate::cache_keys::crypto as keys;
use crate::config::Config;
use crate::dto::{ChartPoint, PriceQuote};
use crate::http_client::Fetcher;

const QUOTE_TTL: Duration = Duration::from_secs(60);
const CHART_TTL: Duration = Duration::from_secs(5 * 60);
const FETCH_TIMEOUT_MS: u64 = 10_000;

static COIN_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").unwrap());

pub fn is_valid_coin_id(id: &str) -> bool {
    COIN_ID_RE.is_match(id)
}

pub fn range_to_days(range: &str) -> Option<u32> {
    match range {
        "1D" => Some(1),
        "7D" => Some(7),
        "30D" => Some(30),
        "90D" => Some(90),
        "1Y" => Some(365),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct CoinRecord {
    id: String,
    symbol: String,
    name: String,
    image: Option<String>,
    current_price: f64,
    #[serde(default)]
    price_change_24h: f64,
    #[serde(default)]
    price_change_percentage_24h: f64,
    market_cap: Option<f64>,
    total_volume: Option<f64>,
    high_24h: Option<f64>,
    low_24h: Option<f64>,
    sparkline_in_7d: Option<SparklineIn7d>,
}

#[derive(Debug, Deserialize)]
struct SparklineIn7d {
    price: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    prices: Vec<(i64, f64)>,
}

fn normalize_coin(record: CoinRecord) -> PriceQuote {
    PriceQuote {
        id: record.id,
        symbol: record.symbol,
        name: record.name,
        image: record.image,
        price: record.current_price,
        change_24h: record.price_change_24h,
        change_percent_24h: record.price_change_percentage_24h,
        market_cap: record.market_cap,
        volume_24h: record.total_volume,
        high_24h: record.high_24h,
        low_24h: record.low_24h,
        sparkline: record.sparkline_in_7d.map(|s| {
            s.price
                .into_iter()
                .enumerate()
                .filter(|(i, _)| i % 4 == 0)
                .map(|(_, v)| v)
                .collect()
        }),
    }
}

pub struct CryptoAdapter {
    fetcher: Arc<Fetcher>,
    cache: TtlCache,
    breaker: Arc<CircuitBreaker>,
    api_base: String,
}

impl CryptoAdapter {
    pub fn new(fetcher: Arc<Fetcher>, cache: TtlCache, breaker: Arc<CircuitBreaker>, config: &Config) -> Self {
        Self {
            fetcher,
            cache,
            breaker,
            api_base: config
                .base_url_overrides
                .crypto
                .clone()
                .unwrap_or_else(|| "https://api.coingecko.com/api/v3".to_string()),
        }
    }

    pub fn is_configured(&self) -> bool {
        // CoinGecko's public market-data endpoints require no credential.
        true
    }

    pub async fn top_coins(&self) -> Option<Vec<PriceQuote>> {
        let key = keys::top_coins();
        if let Some(cached) = self.cache.get_typed::<Vec<PriceQuote>>(&key, QUOTE_TTL) {
            return Some(cached);
        }

        let url = format!(
            "{}/coins/markets?vs_currency=usd&order=market_cap_desc&per_page=50&page=1&sparkline=true&price_change_percentage=24h",
            self.api_base
        );
        let fetcher = self.fetcher.clone();
        let result = self
            .breaker
            .execute(|| async move {
                fetcher
                    .fetch_json::<Vec<CoinRecord>>(&url, FETCH_TIMEOUT_MS)
                    .await
            })
            .await;

        match result {
            Ok(records) => {
                let quotes: Vec<PriceQuote> = records.into_iter().map(normalize_coin).collect();
                self.cache.set(&key, &quotes);
                Some(quotes)
            }
            Err(err) => {
                warn!(error = %err, "crypto top_coins fetch failed");
                None
            }
        }
    }

    pub async fn chart(&self, coin_id: &str, range: &str) -> Option<Vec<ChartPoint>> {
        if !is_valid_coin_id(coin_id) {
            return None;
        }
        let days = range_to_days(range)?;

        let key = keys::chart(coin_id, range);
        if let Some(cached) = self.cache.get_typed::<Vec<ChartPoint>>(&key, CHART_TTL) {
            return Some(cached);
        }

        let url = format!(
            "{}/coins/{coin_id}/market_chart?vs_currency=usd&days={days}",
            self.api_base
        );
        let fetcher = self.fetcher.clone();
        let result = self
            .breaker
            .execute(|| async move {
                fetcher
                    .fetch_json::<MarketChartResponse>(&url, FETCH_TIMEOUT_MS)
                    .await
            })
            .await;

        match result {
            Ok(response) => {
                let points: Vec<ChartPoint> = response
                    .prices
                    .into_iter()
                    .map(|(ts_ms, price)| ChartPoint {
                        timestamp: ts_ms / 1000,
                        price,
                        open: None,
                        high: None,
                        low: None,
                        close: None,
                        volume: None,
                    })
                    .collect();
                let downsampled = super::downsample_to_at_most_100(points);
                self.cache.set(&key, &downsampled);
                Some(downsampled)
            }
            Err(err) => {
                warn!(error = %err, coin_id, "crypto chart fetch failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use crate::config::{Allowlist, Environment};

    fn adapter(server: &mockito::ServerGuard) -> CryptoAdapter {
        let clock: Arc<dyn crate::clock::Clock> = Arc::new(TestClock::new());
        let cache = TtlCache::new(clock.clone());
        let host = server.host_with_port().split(':').next().unwrap().to_string();
        let fetcher = Arc::new(Fetcher::new(
            Allowlist { hosts: vec![host] },
            Environment::Development,
        ));
        let breaker = Arc::new(CircuitBreaker::new(
            "crypto-prices",
            4,
            2,
            Duration::from_secs(60),
            clock,
        ));
        CryptoAdapter {
            fetcher,
            cache,
            breaker,
            api_base: server.url(),
        }
    }

    #[test]
    fn coin_id_validation() {
        assert!(is_valid_coin_id("bitcoin"));
        assert!(is_valid_coin_id("usd-coin"));
        assert!(!is_valid_coin_id("Bitcoin"));
        assert!(!is_valid_coin_id("bitcoin!"));
    }

    #[test]
    fn range_conversion() {
        assert_eq!(range_to_days("1D"), Some(1));
        assert_eq!(range_to_days("1Y"), Some(365));
        assert_eq!(range_to_days("bogus"), None);
    }

    #[tokio::test]
    async fn top_coins_cache_hit_makes_zero_outbound_calls() {
        let server = mockito::Server::new_async().await;
        let adapter = adapter(&server);
        let seeded = vec![PriceQuote {
            id: "bitcoin".to_string(),
            symbol: "btc".to_string(),
            name: "Bitcoin".to_string(),
            image: None,
            price: 43250.0,
            change_24h: 100.0,
            change_percent_24h: 1.0,
            market_cap: Some(1.0),
            volume_24h: Some(1.0),
            high_24h: Some(1.0),
            low_24h: Some(1.0),
            sparkline: None,
        }];
        adapter.cache.set(&keys::top_coins(), &seeded);
        let result = adapter.top_coins().await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].price, 43250.0);
    }

    #[tokio::test]
    async fn chart_downsamples_400_points_from_upstream() {
        let mut server = mockito::Server::new_async().await;
        let prices: Vec<(i64, f64)> = (0..400).map(|i| (i * 60_000, i as f64)).collect();
        let body = serde_json::json!({ "prices": prices });
        let _m = server
            .mock("GET", mockito::Matcher::Regex(r"^/coins/bitcoin/market_chart.*".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let adapter = adapter(&server);
        let points = adapter.chart("bitcoin", "1D").await.unwrap();
        assert!(points.len() >= 50 && points.len() <= 100);
        assert!(points.iter().all(|p| p.timestamp < 1_000_000_000_000));
        assert!(points.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[tokio::test]
    async fn invalid_coin_id_short_circuits_without_fetch() {
        let server = mockito::Server::new_async().await;
        let adapter = adapter(&server);
        assert!(adapter.chart("Bitcoin!!", "1D").await.is_none());
    }
}
