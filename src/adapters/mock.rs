//! Fallback fixture provider (design note §9).
//!
//! Kept as its own module, selected only when a real adapter has no
//! credential configured or its upstream call fails outright, so that a
//! degraded response never interleaves with a real adapter's normal
//! control flow — the real adapters call into here explicitly at their
//! error edges, this module never calls back into them.
//!
//! Every value returned here is a deterministic function of its input: the
//! same block number always derives the same hash, the same coin id always
//! derives the same quote. There is no `rand`/`Instant::now` anywhere in
//! this file, matching the "seeded epoch" fallback the gateway needs to
//! stay reproducible under test.

use crate::dto::{
    AddressInfo, Block, ChartPoint, GasPrice, NetworkStats, PriceQuote, Transaction,
    TransactionStatus,
};

const ETH_SEEDED_HEIGHT: u64 = 18_900_000;
const ETH_SEEDED_TIMESTAMP: i64 = 1_700_000_000;
const ETH_BLOCK_TIME_SECS: i64 = 12;

const BTC_SEEDED_HEIGHT: u64 = 820_000;
const BTC_SEEDED_TIMESTAMP: i64 = 1_700_000_000;
const BTC_BLOCK_TIME_SECS: i64 = 600;

/// FNV-1a over a seed, expanded into a 64-hex-character string so fallback
/// hashes look plausible without ever touching any entropy source.
fn deterministic_hex(seed: u64, len: usize) -> String {
    let mut hash: u64 = 0xcbf29ce484222325 ^ seed;
    let mut out = String::with_capacity(len);
    while out.len() < len {
        hash ^= hash >> 33;
        hash = hash.wrapping_mul(0xff51afd7ed558ccd);
        hash ^= hash >> 33;
        out.push_str(&format!("{:016x}", hash));
    }
    out.truncate(len);
    out
}

fn deterministic_address(seed: u64) -> String {
    format!("0x{}", deterministic_hex(seed, 40))
}

pub fn ethereum_network_stats() -> NetworkStats {
    NetworkStats {
        chain: "ethereum".to_string(),
        block_height: ETH_SEEDED_HEIGHT,
        tps: 14.2,
        avg_block_time: 12.1,
        hash_rate: None,
        gas_price: Some(GasPrice {
            low: 18.0,
            average: 25.0,
            high: 40.0,
            unit: "gwei".to_string(),
        }),
    }
}

fn ethereum_block_at(number: u64) -> Block {
    let offset = ETH_SEEDED_HEIGHT.saturating_sub(number);
    Block {
        number,
        hash: format!("0x{}", deterministic_hex(number, 64)),
        timestamp: ETH_SEEDED_TIMESTAMP - (offset as i64) * ETH_BLOCK_TIME_SECS,
        transaction_count: 80 + (number % 140),
        miner: deterministic_address(number.wrapping_mul(7)),
        size: 45_000 + (number % 20_000),
        gas_used: Some(9_000_000 + (number % 4_000_000)),
        gas_limit: Some(30_000_000),
        parent_hash: format!("0x{}", deterministic_hex(number.saturating_sub(1), 64)),
        reward: "2.0".to_string(),
        chain: "ethereum".to_string(),
    }
}

pub fn ethereum_block(number: u64) -> Block {
    ethereum_block_at(number)
}

pub fn ethereum_blocks(limit: u32, page: u32) -> Vec<Block> {
    let start = ETH_SEEDED_HEIGHT.saturating_sub(((page.saturating_sub(1)) * limit) as u64);
    (0..limit)
        .map(|i| ethereum_block_at(start.saturating_sub(i as u64)))
        .collect()
}

pub fn ethereum_block_transactions(number: u64) -> Vec<Transaction> {
    (0..12)
        .map(|i| {
            let seed = number.wrapping_mul(1000).wrapping_add(i);
            Transaction {
                hash: format!("0x{}", deterministic_hex(seed, 64)),
                block_number: Some(number),
                timestamp: ethereum_block_at(number).timestamp,
                from: deterministic_address(seed),
                to: deterministic_address(seed.wrapping_add(1)),
                value: format!("{}", (seed % 500) as f64 / 100.0),
                fee: "0.0021".to_string(),
                gas: Some(21_000 + (seed % 50_000)),
                status: TransactionStatus::Confirmed,
                confirmations: 12,
                input: None,
                chain: "ethereum".to_string(),
            }
        })
        .collect()
}

pub fn bitcoin_network_stats() -> NetworkStats {
    NetworkStats {
        chain: "bitcoin".to_string(),
        block_height: BTC_SEEDED_HEIGHT,
        tps: 5.0,
        avg_block_time: 600.0,
        hash_rate: Some("480 EH/s".to_string()),
        gas_price: None,
    }
}

fn bitcoin_block_at(number: u64) -> Block {
    let offset = BTC_SEEDED_HEIGHT.saturating_sub(number);
    Block {
        number,
        hash: format!("0{}", deterministic_hex(number, 63)),
        timestamp: BTC_SEEDED_TIMESTAMP - (offset as i64) * BTC_BLOCK_TIME_SECS,
        transaction_count: 1_800 + (number % 1_500),
        miner: format!("Pool-{}", number % 7),
        size: 1_300_000 + (number % 400_000),
        gas_used: None,
        gas_limit: None,
        parent_hash: format!("0{}", deterministic_hex(number.saturating_sub(1), 63)),
        reward: "6.25".to_string(),
        chain: "bitcoin".to_string(),
    }
}

pub fn bitcoin_block(number: u64) -> Block {
    bitcoin_block_at(number)
}

pub fn bitcoin_blocks(limit: u32, page: u32) -> Vec<Block> {
    let start = BTC_SEEDED_HEIGHT.saturating_sub(((page.saturating_sub(1)) * limit) as u64);
    (0..limit)
        .map(|i| bitcoin_block_at(start.saturating_sub(i as u64)))
        .collect()
}

pub fn bitcoin_block_transactions(number: u64) -> Vec<Transaction> {
    (0..8)
        .map(|i| {
            let seed = number.wrapping_mul(1000).wrapping_add(i);
            Transaction {
                hash: deterministic_hex(seed, 64),
                block_number: Some(number),
                timestamp: bitcoin_block_at(number).timestamp,
                from: "See Details".to_string(),
                to: "See Details".to_string(),
                value: format!("{}", (seed % 200) as f64 / 1000.0),
                fee: "0.00012".to_string(),
                gas: None,
                status: TransactionStatus::Confirmed,
                confirmations: 6,
                input: None,
                chain: "bitcoin".to_string(),
            }
        })
        .collect()
}

pub fn bitcoin_address(address: &str) -> AddressInfo {
    let seed = address.len() as u64;
    AddressInfo {
        address: address.to_string(),
        balance: format!("{}", (seed % 10) as f64 / 10.0),
        transaction_count: seed % 40,
        chain: "bitcoin".to_string(),
        first_seen: Some(BTC_SEEDED_TIMESTAMP - 86_400 * 400),
        last_activity: Some(BTC_SEEDED_TIMESTAMP),
    }
}

pub fn ethereum_address(address: &str) -> AddressInfo {
    let seed = address.len() as u64;
    AddressInfo {
        address: address.to_string(),
        balance: format!("{}", (seed % 50) as f64 / 10.0),
        transaction_count: seed % 200,
        chain: "ethereum".to_string(),
        first_seen: Some(ETH_SEEDED_TIMESTAMP - 86_400 * 400),
        last_activity: Some(ETH_SEEDED_TIMESTAMP),
    }
}

pub fn crypto_top_coins() -> Vec<PriceQuote> {
    vec![
        PriceQuote {
            id: "bitcoin".to_string(),
            symbol: "btc".to_string(),
            name: "Bitcoin".to_string(),
            image: None,
            price: 43_000.0,
            change_24h: 320.0,
            change_percent_24h: 0.75,
            market_cap: Some(840_000_000_000.0),
            volume_24h: Some(22_000_000_000.0),
            high_24h: Some(43_500.0),
            low_24h: Some(42_200.0),
            sparkline: None,
        },
        PriceQuote {
            id: "ethereum".to_string(),
            symbol: "eth".to_string(),
            name: "Ethereum".to_string(),
            image: None,
            price: 2_300.0,
            change_24h: -15.0,
            change_percent_24h: -0.65,
            market_cap: Some(280_000_000_000.0),
            volume_24h: Some(11_000_000_000.0),
            high_24h: Some(2_340.0),
            low_24h: Some(2_270.0),
            sparkline: None,
        },
    ]
}

pub fn crypto_chart(days: u32) -> Vec<ChartPoint> {
    let points = (days * 24).max(24).min(400);
    (0..points)
        .map(|i| ChartPoint {
            timestamp: ETH_SEEDED_TIMESTAMP + (i as i64) * 3600,
            price: 43_000.0 + (i as f64 * 1.3).sin() * 500.0,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_hex_is_stable_for_same_seed() {
        assert_eq!(deterministic_hex(42, 64), deterministic_hex(42, 64));
        assert_ne!(deterministic_hex(42, 64), deterministic_hex(43, 64));
        assert_eq!(deterministic_hex(42, 64).len(), 64);
    }

    #[test]
    fn ethereum_block_fallback_is_reproducible() {
        let a = ethereum_block(18_899_000);
        let b = ethereum_block(18_899_000);
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.chain, "ethereum");
    }

    #[test]
    fn bitcoin_block_fallback_uses_ten_minute_spacing() {
        let a = bitcoin_block(820_000);
        let b = bitcoin_block(819_999);
        assert_eq!(a.timestamp - b.timestamp, 600);
        assert_eq!(a.reward, "6.25");
    }

    #[test]
    fn ethereum_blocks_page_respects_pagination_math() {
        let page1 = ethereum_blocks(10, 1);
        let page2 = ethereum_blocks(10, 2);
        assert_eq!(page1.len(), 10);
        assert_eq!(page1[9].number - page2[0].number, 1);
    }
}
