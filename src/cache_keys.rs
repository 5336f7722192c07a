//! Per-domain cache key constructors (design note §9: "cache keys as
//! strings" re-architected as auditable functions instead of ad hoc
//! concatenation). Naming convention: `<domain>:<primary>:<sub>`.

pub mod crypto {
    pub fn top_coins() -> String {
        "crypto:prices:top".to_string()
    }

    pub fn chart(coin_id: &str, range: &str) -> String {
        format!("crypto:chart:{coin_id}:{range}")
    }
}

pub mod blockchain {
    pub fn network_stats(chain: &str) -> String {
        format!("chain:{chain}:network-stats")
    }

    pub fn blocks(chain: &str, limit: u32, page: u32) -> String {
        format!("chain:{chain}:blocks:{limit}:{page}")
    }

    pub fn block(chain: &str, number: &str) -> String {
        format!("chain:{chain}:block:{number}")
    }

    pub fn block_transactions(chain: &str, number: &str) -> String {
        format!("chain:{chain}:block-txs:{number}")
    }

    pub fn transaction(chain: &str, hash: &str) -> String {
        format!("chain:{chain}:tx:{hash}")
    }

    pub fn address(chain: &str, addr: &str) -> String {
        format!("chain:{chain}:address:{addr}")
    }

    pub fn address_transactions(chain: &str, addr: &str) -> String {
        format!("chain:{chain}:address-txs:{addr}")
    }
}

pub mod stock {
    pub fn quote(symbol: &str) -> String {
        format!("stock:quote:{symbol}")
    }

    pub fn batch(symbols: &[String]) -> String {
        format!("stock:batch:{}", symbols.join(","))
    }

    pub fn chart(symbol: &str, timeframe: &str) -> String {
        format!("stock:chart:{symbol}:{timeframe}")
    }

    pub fn profile(symbol: &str) -> String {
        format!("fmp:profile:{symbol}")
    }

    pub fn search(query: &str) -> String {
        format!("stock:search:{}", query.to_lowercase())
    }
}

pub mod fundamentals {
    pub fn news(symbol: &str) -> String {
        format!("fmp:news:{symbol}")
    }

    pub fn earnings(symbol: &str) -> String {
        format!("fmp:earnings:{symbol}")
    }

    pub fn grades(symbol: &str) -> String {
        format!("fmp:grades:{symbol}")
    }

    pub fn grade_consensus(symbol: &str) -> String {
        format!("fmp:grade-consensus:{symbol}")
    }

    pub fn price_target(symbol: &str) -> String {
        format!("fmp:price-target:{symbol}")
    }

    pub fn estimates(symbol: &str) -> String {
        format!("fmp:estimates:{symbol}")
    }

    pub fn income(symbol: &str) -> String {
        format!("fmp:income:{symbol}")
    }

    pub fn balance_sheet(symbol: &str) -> String {
        format!("fmp:balance-sheet:{symbol}")
    }

    pub fn cash_flow(symbol: &str) -> String {
        format!("fmp:cash-flow:{symbol}")
    }

    pub fn metrics(symbol: &str) -> String {
        format!("fmp:metrics:{symbol}")
    }

    pub fn institutions(symbol: &str) -> String {
        format!("fmp:institutions:{symbol}")
    }

    pub fn movers(kind: &str) -> String {
        format!("fmp:movers:{kind}")
    }

    pub fn sectors() -> String {
        "fmp:sectors".to_string()
    }

    pub fn general_news() -> String {
        "fmp:news:general".to_string()
    }

    pub fn calendar(kind: &str) -> String {
        format!("fmp:calendar:{kind}")
    }
}

pub mod ai {
    pub fn search_query(text: &str) -> String {
        format!("ai:search:{:x}", simple_hash(text))
    }

    pub fn summary(symbol: &str) -> String {
        format!("ai:summary:{symbol}")
    }

    pub fn market_overview() -> String {
        "ai:market-overview".to_string()
    }

    /// FNV-1a; only used to keep free-text cache keys short and stable.
    fn simple_hash(s: &str) -> u64 {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in s.as_bytes() {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_key_shapes() {
        assert_eq!(stock::profile("AAPL"), "fmp:profile:AAPL");
        assert_eq!(crypto::chart("bitcoin", "1D"), "crypto:chart:bitcoin:1D");
        assert_eq!(ai::summary("AAPL"), "ai:summary:AAPL");
    }

    #[test]
    fn search_query_key_is_deterministic() {
        assert_eq!(ai::search_query("tech stocks"), ai::search_query("tech stocks"));
        assert_ne!(ai::search_query("tech stocks"), ai::search_query("bank stocks"));
    }
}
