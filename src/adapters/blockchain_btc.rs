//! Bitcoin blockchain adapter (spec §4.6). Mirrors the Ethereum adapter's
//! shape; BlockCypher-shaped upstream instead of Etherscan's JSON-RPC, no
//! gas price, constant 10-minute block time and constant TPS of 5 (Bitcoin
//! throughput doesn't fluctuate block-to-block the way a gas market does).

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::adapters::mock;
use crate::breaker::CircuitBreaker;
use crate::cache::TtlCache;
use crate::cache_keys::blockchain as keys;
use crate::config::Config;
use crate::dto::{AddressInfo, Block, NetworkStats, Transaction, TransactionStatus};
use crate::http_client::Fetcher;

const STATS_TTL: Duration = Duration::from_secs(60);
const BLOCKS_TTL: Duration = Duration::from_secs(30);
const FETCH_TIMEOUT_MS: u64 = 10_000;
const BLOCK_TIME_SECS: f64 = 600.0;
const TPS: f64 = 5.0;
const MAX_BLOCKS_PER_REQUEST: u32 = 10;

#[derive(Debug, Deserialize)]
struct ChainInfo {
    height: u64,
}

#[derive(Debug, Deserialize)]
struct RpcBlock {
    height: u64,
    hash: String,
    time: String,
    n_tx: u64,
    #[serde(default)]
    pool_name: Option<String>,
    size: u64,
    prev_block: String,
    txids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RpcTransaction {
    hash: String,
    #[serde(default)]
    block_height: Option<i64>,
    confirmed: Option<String>,
    inputs: Vec<RpcTxEndpoint>,
    outputs: Vec<RpcTxEndpoint>,
    fees: u64,
    confirmations: u64,
}

#[derive(Debug, Deserialize)]
struct RpcTxEndpoint {
    #[serde(default)]
    addresses: Vec<String>,
    value: u64,
}

#[derive(Debug, Deserialize)]
struct RpcAddress {
    final_balance: u64,
    n_tx: u64,
}

#[derive(Debug, Deserialize)]
struct RpcAddressFull {
    #[serde(default)]
    txs: Vec<RpcTransaction>,
}

fn satoshis_to_btc(sats: u64) -> String {
    format!("{:.8}", sats as f64 / 100_000_000.0)
}

fn parse_unix_timestamp(time: &str) -> i64 {
    chrono::DateTime::parse_from_rfc3339(time)
        .map(|dt| dt.timestamp())
        .unwrap_or(0)
}

fn normalize_block(raw: RpcBlock) -> Block {
    Block {
        number: raw.height,
        hash: raw.hash,
        timestamp: parse_unix_timestamp(&raw.time),
        transaction_count: raw.n_tx,
        miner: raw.pool_name.unwrap_or_else(|| "Unknown".to_string()),
        size: raw.size,
        gas_used: None,
        gas_limit: None,
        parent_hash: raw.prev_block,
        reward: "6.25".to_string(),
        chain: "bitcoin".to_string(),
    }
}

fn normalize_transaction(raw: RpcTransaction) -> Transaction {
    let from = raw
        .inputs
        .first()
        .and_then(|i| i.addresses.first())
        .cloned()
        .unwrap_or_else(|| "See Details".to_string());
    let to = raw
        .outputs
        .first()
        .and_then(|o| o.addresses.first())
        .cloned()
        .unwrap_or_else(|| "See Details".to_string());
    let value: u64 = raw.outputs.iter().map(|o| o.value).sum();

    Transaction {
        hash: raw.hash,
        block_number: raw.block_height.filter(|h| *h >= 0).map(|h| h as u64),
        timestamp: raw.confirmed.as_deref().map(parse_unix_timestamp).unwrap_or(0),
        from,
        to,
        value: satoshis_to_btc(value),
        fee: satoshis_to_btc(raw.fees),
        gas: None,
        status: TransactionStatus::Confirmed,
        confirmations: raw.confirmations,
        input: None,
        chain: "bitcoin".to_string(),
    }
}

pub struct BitcoinAdapter {
    fetcher: Arc<Fetcher>,
    cache: TtlCache,
    breaker: Arc<CircuitBreaker>,
    api_key: Option<String>,
    api_base: String,
}

impl BitcoinAdapter {
    pub fn new(fetcher: Arc<Fetcher>, cache: TtlCache, breaker: Arc<CircuitBreaker>, config: &Config) -> Self {
        Self {
            fetcher,
            cache,
            breaker,
            api_key: config.blockcypher_api_key.clone(),
            api_base: config
                .base_url_overrides
                .blockcypher
                .clone()
                .unwrap_or_else(|| "https://api.blockcypher.com/v1/btc/main".to_string()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn token_suffix(&self) -> String {
        self.api_key
            .as_ref()
            .map(|k| format!("?token={k}"))
            .unwrap_or_default()
    }

    pub async fn network_stats(&self) -> NetworkStats {
        let key = keys::network_stats("bitcoin");
        if let Some(cached) = self.cache.get_typed::<NetworkStats>(&key, STATS_TTL) {
            return cached;
        }
        if !self.is_configured() {
            return mock::bitcoin_network_stats();
        }

        let url = format!("{}{}", self.api_base, self.token_suffix());
        let fetcher = self.fetcher.clone();
        let result = self
            .breaker
            .execute(|| async move { fetcher.fetch_json::<ChainInfo>(&url, FETCH_TIMEOUT_MS).await })
            .await;

        match result {
            Ok(info) => {
                let stats = NetworkStats {
                    chain: "bitcoin".to_string(),
                    block_height: info.height,
                    tps: TPS,
                    avg_block_time: BLOCK_TIME_SECS,
                    hash_rate: None,
                    gas_price: None,
                };
                self.cache.set(&key, &stats);
                stats
            }
            Err(err) => {
                warn!(error = %err, "bitcoin network_stats fetch failed, using fallback");
                mock::bitcoin_network_stats()
            }
        }
    }

    pub async fn list_blocks(&self, limit: u32, page: u32) -> Vec<Block> {
        let key = keys::blocks("bitcoin", limit, page);
        if let Some(cached) = self.cache.get_typed::<Vec<Block>>(&key, BLOCKS_TTL) {
            return cached;
        }
        if !self.is_configured() {
            return mock::bitcoin_blocks(limit.min(MAX_BLOCKS_PER_REQUEST), page);
        }

        let capped_limit = limit.min(MAX_BLOCKS_PER_REQUEST);
        let latest = self.latest_height().await.unwrap_or(0);
        let start = latest.saturating_sub(((page.saturating_sub(1)) * capped_limit) as u64);

        let mut blocks = Vec::new();
        for i in 0..capped_limit {
            let number = start.saturating_sub(i as u64);
            if let Some(block) = self.get_block(&number.to_string()).await {
                blocks.push(block);
            }
        }

        if blocks.is_empty() {
            return mock::bitcoin_blocks(capped_limit, page);
        }
        self.cache.set(&key, &blocks);
        blocks
    }

    async fn latest_height(&self) -> Option<u64> {
        let url = format!("{}{}", self.api_base, self.token_suffix());
        let fetcher = self.fetcher.clone();
        self.breaker
            .execute(|| async move { fetcher.fetch_json::<ChainInfo>(&url, FETCH_TIMEOUT_MS).await })
            .await
            .ok()
            .map(|info| info.height)
    }

    pub async fn get_block(&self, number: &str) -> Option<Block> {
        let key = keys::block("bitcoin", number);
        if let Some(cached) = self.cache.get_typed::<Block>(&key, BLOCKS_TTL) {
            return Some(cached);
        }
        if !self.is_configured() {
            return Some(mock::bitcoin_block(number.parse().unwrap_or(0)));
        }

        let separator = if self.token_suffix().is_empty() { "?" } else { "&" };
        let url = format!("{}/{number}{}{separator}txstart=0&limit=1", self.api_base, self.token_suffix());
        let fetcher = self.fetcher.clone();
        let result = self
            .breaker
            .execute(|| async move { fetcher.fetch_json::<RpcBlock>(&url, FETCH_TIMEOUT_MS).await })
            .await;

        match result {
            Ok(raw) => {
                let block = normalize_block(raw);
                self.cache.set(&key, &block);
                Some(block)
            }
            Err(err) => {
                warn!(error = %err, number, "bitcoin get_block failed");
                None
            }
        }
    }

    pub async fn get_block_transactions(&self, number: &str) -> Vec<Transaction> {
        let key = keys::block_transactions("bitcoin", number);
        if let Some(cached) = self.cache.get_typed::<Vec<Transaction>>(&key, BLOCKS_TTL) {
            return cached;
        }
        if !self.is_configured() {
            return mock::bitcoin_block_transactions(number.parse().unwrap_or(0));
        }

        let raw_block = match self.fetch_raw_block(number).await {
            Some(b) => b,
            None => return Vec::new(),
        };

        let mut txs = Vec::new();
        for txid in raw_block.txids.into_iter().take(20) {
            if let Some(tx) = self.transaction(&txid).await {
                txs.push(tx);
            }
        }
        self.cache.set(&key, &txs);
        txs
    }

    async fn fetch_raw_block(&self, number: &str) -> Option<RpcBlock> {
        let url = format!(
            "{}/{number}{}",
            self.api_base,
            self.token_suffix()
        );
        let fetcher = self.fetcher.clone();
        self.breaker
            .execute(|| async move { fetcher.fetch_json::<RpcBlock>(&url, FETCH_TIMEOUT_MS).await })
            .await
            .ok()
    }

    /// Spec Open Question #1 (from/to derivation for Bitcoin transactions,
    /// which have no single sender/recipient): resolved by taking the
    /// first input address as `from` and the first output address as `to`,
    /// falling back to "See Details" when BlockCypher omits an address
    /// (common for coinbase transactions). Recorded in the design ledger.
    pub async fn transaction(&self, hash: &str) -> Option<Transaction> {
        let key = keys::transaction("bitcoin", hash);
        if let Some(cached) = self.cache.get_typed::<Transaction>(&key, BLOCKS_TTL) {
            return Some(cached);
        }

        let url = format!("{}/txs/{hash}{}", self.api_base, self.token_suffix());
        let fetcher = self.fetcher.clone();
        let result = self
            .breaker
            .execute(|| async move { fetcher.fetch_json::<RpcTransaction>(&url, FETCH_TIMEOUT_MS).await })
            .await;

        match result {
            Ok(raw) => {
                let tx = normalize_transaction(raw);
                self.cache.set(&key, &tx);
                Some(tx)
            }
            Err(err) => {
                warn!(error = %err, hash, "bitcoin transaction fetch failed");
                None
            }
        }
    }

    pub async fn address(&self, addr: &str) -> AddressInfo {
        let key = keys::address("bitcoin", addr);
        if let Some(cached) = self.cache.get_typed::<AddressInfo>(&key, BLOCKS_TTL) {
            return cached;
        }
        if !self.is_configured() {
            return mock::bitcoin_address(addr);
        }

        let url = format!("{}/addrs/{addr}/balance{}", self.api_base, self.token_suffix());
        let fetcher = self.fetcher.clone();
        let result = self
            .breaker
            .execute(|| async move { fetcher.fetch_json::<RpcAddress>(&url, FETCH_TIMEOUT_MS).await })
            .await;

        match result {
            Ok(raw) => {
                let info = AddressInfo {
                    address: addr.to_string(),
                    balance: satoshis_to_btc(raw.final_balance),
                    transaction_count: raw.n_tx,
                    chain: "bitcoin".to_string(),
                    first_seen: None,
                    last_activity: None,
                };
                self.cache.set(&key, &info);
                info
            }
            Err(err) => {
                warn!(error = %err, addr, "bitcoin address fetch failed");
                mock::bitcoin_address(addr)
            }
        }
    }

    pub async fn address_transactions(&self, addr: &str) -> Vec<Transaction> {
        let key = keys::address_transactions("bitcoin", addr);
        if let Some(cached) = self.cache.get_typed::<Vec<Transaction>>(&key, BLOCKS_TTL) {
            return cached;
        }
        if !self.is_configured() {
            return Vec::new();
        }

        let url = format!(
            "{}/addrs/{addr}/full{}",
            self.api_base,
            self.token_suffix()
        );
        let fetcher = self.fetcher.clone();
        let result = self
            .breaker
            .execute(|| async move { fetcher.fetch_json::<RpcAddressFull>(&url, FETCH_TIMEOUT_MS).await })
            .await;

        match result {
            Ok(raw) => {
                let txs: Vec<Transaction> = raw.txs.into_iter().map(normalize_transaction).collect();
                self.cache.set(&key, &txs);
                txs
            }
            Err(err) => {
                warn!(error = %err, addr, "bitcoin address_transactions failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn satoshi_conversion_keeps_eight_decimals() {
        assert_eq!(satoshis_to_btc(100_000_000), "1.00000000");
        assert_eq!(satoshis_to_btc(50_000), "0.00050000");
    }

    #[test]
    fn transaction_from_to_fall_back_to_see_details_when_addresses_missing() {
        let raw = RpcTransaction {
            hash: "abc".to_string(),
            block_height: Some(820_000),
            confirmed: Some("2023-11-14T22:13:20Z".to_string()),
            inputs: vec![RpcTxEndpoint { addresses: vec![], value: 0 }],
            outputs: vec![RpcTxEndpoint { addresses: vec![], value: 500_000 }],
            fees: 1_000,
            confirmations: 6,
        };
        let tx = normalize_transaction(raw);
        assert_eq!(tx.from, "See Details");
        assert_eq!(tx.to, "See Details");
        assert_eq!(tx.value, "0.00500000");
    }

    #[test]
    fn transaction_uses_first_input_and_output_address_when_present() {
        let raw = RpcTransaction {
            hash: "abc".to_string(),
            block_height: Some(820_000),
            confirmed: Some("2023-11-14T22:13:20Z".to_string()),
            inputs: vec![RpcTxEndpoint {
                addresses: vec!["1Sender".to_string()],
                value: 500_000,
            }],
            outputs: vec![RpcTxEndpoint {
                addresses: vec!["1Receiver".to_string()],
                value: 499_000,
            }],
            fees: 1_000,
            confirmations: 6,
        };
        let tx = normalize_transaction(raw);
        assert_eq!(tx.from, "1Sender");
        assert_eq!(tx.to, "1Receiver");
    }
}
