//! Normalized, client-facing DTOs (spec §3). Every field here is stable
//! regardless of which upstream produced it; adapters own the mapping from
//! upstream-specific shapes into these.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceQuote {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: Option<String>,
    pub price: f64,
    pub change_24h: f64,
    pub change_percent_24h: f64,
    pub market_cap: Option<f64>,
    pub volume_24h: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub sparkline: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockAsset {
    pub id: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub exchange: Option<String>,
    pub currency: Option<String>,
    pub market_cap: Option<f64>,
    pub pe: Option<f64>,
    pub sector: Option<String>,
    pub previous_close: Option<f64>,
    pub open: Option<f64>,
    pub last_updated: i64,
}

impl StockAsset {
    pub fn merge_profile(&mut self, market_cap: Option<f64>, sector: Option<String>, pe: Option<f64>) {
        if market_cap.is_some() {
            self.market_cap = market_cap;
        }
        if sector.is_some() {
            self.sector = sector;
        }
        if pe.is_some() {
            self.pe = pe;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartPoint {
    pub timestamp: i64,
    pub price: f64,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GasPrice {
    pub low: f64,
    pub average: f64,
    pub high: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkStats {
    pub chain: String,
    pub block_height: u64,
    pub tps: f64,
    pub avg_block_time: f64,
    pub hash_rate: Option<String>,
    pub gas_price: Option<GasPrice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Block {
    pub number: u64,
    pub hash: String,
    pub timestamp: i64,
    pub transaction_count: u64,
    pub miner: String,
    pub size: u64,
    pub gas_used: Option<u64>,
    pub gas_limit: Option<u64>,
    pub parent_hash: String,
    pub reward: String,
    pub chain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub hash: String,
    pub block_number: Option<u64>,
    pub timestamp: i64,
    pub from: String,
    pub to: String,
    pub value: String,
    pub fee: String,
    pub gas: Option<u64>,
    pub status: TransactionStatus,
    pub confirmations: u64,
    pub input: Option<String>,
    pub chain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddressInfo {
    pub address: String,
    pub balance: String,
    pub transaction_count: u64,
    pub chain: String,
    pub first_seen: Option<i64>,
    pub last_activity: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Stock,
    Crypto,
    Both,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Technology,
    Healthcare,
    Financials,
    Energy,
    Industrials,
    ConsumerDiscretionary,
    ConsumerStaples,
    Utilities,
    RealEstate,
    Materials,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDirection {
    Up,
    Down,
    Any,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchAction {
    Search,
    Compare,
}

/// `#[serde(default)]` at the container level: LLM output routinely omits
/// fields (spec §4.5/§9, scenario S5), so any field missing from the parsed
/// JSON falls back to `SearchFilters::default()` instead of failing to parse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchFilters {
    #[serde(rename = "type")]
    pub search_type: SearchType,
    pub sector: Option<Sector>,
    pub price_range: Option<PriceRange>,
    pub change_direction: ChangeDirection,
    pub symbols: Vec<String>,
    pub keywords: Vec<String>,
    pub action: SearchAction,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            search_type: SearchType::Both,
            sector: None,
            price_range: None,
            change_direction: ChangeDirection::Any,
            symbols: Vec::new(),
            keywords: Vec::new(),
            action: SearchAction::Search,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SentimentLabel {
    VeryBearish,
    Bearish,
    Neutral,
    Bullish,
    VeryBullish,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sentiment {
    pub score: u8,
    pub label: SentimentLabel,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KeyPoints {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub neutral: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockSummary {
    pub symbol: String,
    pub sentiment: Sentiment,
    pub summary: String,
    pub key_points: KeyPoints,
    pub catalysts: Vec<String>,
    pub risks: Vec<String>,
    pub generated_at: String,
    pub data_source: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MarketSentiment {
    RiskOn,
    RiskOff,
    Mixed,
    Neutral,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SectorsToWatch {
    pub bullish: Vec<String>,
    pub bearish: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketOverview {
    pub sentiment: MarketSentiment,
    pub summary: String,
    pub top_themes: Vec<String>,
    pub sectors_to_watch: SectorsToWatch,
    pub outlook: String,
    pub generated_at: String,
}

/// Added beyond spec §3's named DTOs because §6's route table requires
/// these two shapes and they are adapter-owned the same way.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mover {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub exchange: Option<String>,
}
