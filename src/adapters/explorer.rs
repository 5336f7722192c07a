//! Cross-chain explorer adapter (spec §4.6): dispatches a raw address or
//! transaction hash to the right chain adapter by shape alone, since the
//! client doesn't (and shouldn't have to) say which chain it means.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::adapters::blockchain_btc::BitcoinAdapter;
use crate::adapters::blockchain_eth::EthereumAdapter;
use crate::dto::{AddressInfo, Transaction};

static ETH_ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").unwrap());
static BTC_ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([13][a-km-zA-HJ-NP-Z1-9]{25,34}|bc1[a-z0-9]{39,59})$").unwrap());
static TX_HASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(0x)?[a-fA-F0-9]{64}$").unwrap());

/// Format-only checks, split out from chain detection so the route layer
/// can reject a malformed hash/address with 400 before ever reaching an
/// adapter (spec §6: `/tx/:hash` and `/address/:address` both list 400
/// alongside 404 — malformed input is a validation error, not a miss).
pub fn is_valid_tx_hash(hash: &str) -> bool {
    TX_HASH_RE.is_match(hash)
}

pub fn is_valid_address(address: &str) -> bool {
    ETH_ADDRESS_RE.is_match(address) || BTC_ADDRESS_RE.is_match(address)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain {
    Ethereum,
    Bitcoin,
}

/// 0x-prefixed hashes/addresses are Ethereum; anything else recognizable is
/// Bitcoin (spec §4.6 chain auto-detection rule).
pub fn detect_tx_chain(hash: &str) -> Option<Chain> {
    if !TX_HASH_RE.is_match(hash) {
        return None;
    }
    if hash.starts_with("0x") {
        Some(Chain::Ethereum)
    } else {
        Some(Chain::Bitcoin)
    }
}

pub fn detect_address_chain(address: &str) -> Option<Chain> {
    if ETH_ADDRESS_RE.is_match(address) {
        Some(Chain::Ethereum)
    } else if BTC_ADDRESS_RE.is_match(address) {
        Some(Chain::Bitcoin)
    } else {
        None
    }
}

pub struct ExplorerAdapter {
    ethereum: Arc<EthereumAdapter>,
    bitcoin: Arc<BitcoinAdapter>,
}

impl ExplorerAdapter {
    pub fn new(ethereum: Arc<EthereumAdapter>, bitcoin: Arc<BitcoinAdapter>) -> Self {
        Self { ethereum, bitcoin }
    }

    pub async fn transaction(&self, hash: &str) -> Option<Transaction> {
        match detect_tx_chain(hash)? {
            Chain::Ethereum => self.ethereum.transaction(hash).await,
            Chain::Bitcoin => self.bitcoin.transaction(hash).await,
        }
    }

    pub async fn address(&self, addr: &str) -> Option<AddressInfo> {
        match detect_address_chain(addr)? {
            Chain::Ethereum => Some(self.ethereum.address(addr).await),
            Chain::Bitcoin => Some(self.bitcoin.address(addr).await),
        }
    }

    pub async fn address_transactions(&self, addr: &str) -> Option<Vec<Transaction>> {
        match detect_address_chain(addr)? {
            Chain::Ethereum => Some(self.ethereum.address_transactions(addr).await),
            Chain::Bitcoin => Some(self.bitcoin.address_transactions(addr).await),
        }
    }
}
