//! LLM-backed natural-language adapter (spec §4.6): search-query parsing,
//! stock summarization, and market overview. Every operation degrades
//! gracefully — `parse_search_query` always returns a usable result even
//! with no LLM configured, by falling back to a keyword scanner.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::adapters::fundamentals::FundamentalsAdapter;
use crate::adapters::stock::StockAdapter;
use crate::cache_keys::ai as keys;
use crate::dto::{
    ChangeDirection, KeyPoints, MarketOverview, MarketSentiment, SearchAction, SearchFilters,
    SearchType, Sector, Sentiment, SentimentLabel, SectorsToWatch, StockSummary,
};
use crate::llm::LlmClient;

static COMMON_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["A", "I", "THE", "AND", "OR", "FOR", "TO", "IN", "ON", "UP", "DOWN", "VS"]
        .into_iter()
        .collect()
});

const SECTOR_NAMES: &[(&str, Sector)] = &[
    ("technology", Sector::Technology),
    ("healthcare", Sector::Healthcare),
    ("financials", Sector::Financials),
    ("financial", Sector::Financials),
    ("energy", Sector::Energy),
    ("industrials", Sector::Industrials),
    ("consumer discretionary", Sector::ConsumerDiscretionary),
    ("consumer staples", Sector::ConsumerStaples),
    ("utilities", Sector::Utilities),
    ("real estate", Sector::RealEstate),
    ("materials", Sector::Materials),
];

/// Scans free text for sector names, direction words, and short uppercase
/// tokens that look like ticker symbols — used whenever the LLM path is
/// unavailable or fails (spec §4.6).
fn keyword_fallback_parse(text: &str) -> SearchFilters {
    let lower = text.to_lowercase();
    let sector = SECTOR_NAMES
        .iter()
        .find(|(name, _)| lower.contains(name))
        .map(|(_, sector)| *sector);

    let change_direction = if lower.split_whitespace().any(|w| w == "up") {
        ChangeDirection::Up
    } else if lower.split_whitespace().any(|w| w == "down") {
        ChangeDirection::Down
    } else {
        ChangeDirection::Any
    };

    let symbols: Vec<String> = text
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_ascii_alphanumeric()))
        .filter(|w| {
            !w.is_empty()
                && w.len() <= 5
                && w.chars().all(|c| c.is_ascii_uppercase())
                && !COMMON_WORDS.contains(w)
        })
        .map(str::to_string)
        .collect();

    let keywords: Vec<String> = text
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_ascii_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();

    SearchFilters {
        search_type: if symbols.is_empty() { SearchType::Both } else { SearchType::Stock },
        sector,
        price_range: None,
        change_direction,
        symbols,
        keywords,
        action: SearchAction::Search,
    }
}

/// Normalizes potentially-invalid LLM output into a well-formed
/// `SearchFilters`: invalid enum values fall back to defaults, symbols are
/// upper-cased.
fn normalize_filters(mut filters: SearchFilters) -> SearchFilters {
    filters.symbols = filters.symbols.into_iter().map(|s| s.to_uppercase()).collect();
    filters
}

#[derive(Debug, Deserialize)]
struct RawStockSummary {
    #[serde(default)]
    sentiment_score: Option<u8>,
    #[serde(default)]
    sentiment_label: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    key_points: Option<KeyPoints>,
    #[serde(default)]
    catalysts: Option<Vec<String>>,
    #[serde(default)]
    risks: Option<Vec<String>>,
}

fn parse_sentiment_label(raw: &str) -> SentimentLabel {
    match raw {
        "very-bearish" => SentimentLabel::VeryBearish,
        "bearish" => SentimentLabel::Bearish,
        "bullish" => SentimentLabel::Bullish,
        "very-bullish" => SentimentLabel::VeryBullish,
        _ => SentimentLabel::Neutral,
    }
}

#[derive(Debug, Deserialize)]
struct RawMarketOverview {
    #[serde(default)]
    sentiment: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    top_themes: Option<Vec<String>>,
    #[serde(default)]
    sectors_to_watch: Option<SectorsToWatch>,
    #[serde(default)]
    outlook: Option<String>,
}

fn parse_market_sentiment(raw: &str) -> MarketSentiment {
    match raw {
        "risk-on" => MarketSentiment::RiskOn,
        "risk-off" => MarketSentiment::RiskOff,
        "mixed" => MarketSentiment::Mixed,
        _ => MarketSentiment::Neutral,
    }
}

/// Outcome of `summarize_stock`: the dispatcher maps `SymbolNotFound` to 404
/// and `GenerationFailed` to 503 (spec §6 lists both as non-2xx for
/// `/ai/summary/:symbol`).
pub enum SummaryOutcome {
    Ready(StockSummary),
    SymbolNotFound,
    GenerationFailed,
}

pub struct LlmAdapter {
    llm: Arc<LlmClient>,
    stock: Arc<StockAdapter>,
    fundamentals: Arc<FundamentalsAdapter>,
}

impl LlmAdapter {
    pub fn new(llm: Arc<LlmClient>, stock: Arc<StockAdapter>, fundamentals: Arc<FundamentalsAdapter>) -> Self {
        Self { llm, stock, fundamentals }
    }

    pub async fn parse_search_query(&self, text: &str) -> SearchFilters {
        if self.llm.is_configured() {
            let prompt = format!(
                "Parse this natural-language stock/crypto search query into a JSON object with \
                 fields type, sector, priceRange, changeDirection, symbols, keywords, action: {text}"
            );
            if let Some(filters) = self
                .llm
                .generate_json::<SearchFilters>(&prompt, Some(&keys::search_query(text)))
                .await
            {
                return normalize_filters(filters);
            }
        }
        keyword_fallback_parse(text)
    }

    /// Fans out to the stock quote plus four fundamentals endpoints in
    /// parallel (spec §4.5's "five-source fan-out"); any subset may come
    /// back `None` and the prompt is built from whatever arrived.
    ///
    /// Distinguishes "symbol doesn't exist" from "generation failed" so the
    /// dispatcher can pick 404 vs 503 (spec §6 lists both for this route).
    pub async fn summarize_stock(&self, symbol: &str) -> SummaryOutcome {
        if !self.llm.is_configured() {
            return SummaryOutcome::GenerationFailed;
        }
        let symbol = symbol.to_uppercase();

        let (quote, news, grades, price_target, estimates) = tokio::join!(
            self.stock.quote(&symbol),
            self.fundamentals.news(&symbol),
            self.fundamentals.grades(&symbol),
            self.fundamentals.price_target(&symbol),
            self.fundamentals.estimates(&symbol),
        );
        if quote.is_none() {
            return SummaryOutcome::SymbolNotFound;
        }

        let prompt = format!(
            "Summarize the investment outlook for {symbol} as JSON with fields sentiment_score \
             (1-10), sentiment_label, summary, key_points, catalysts, risks. Quote: {:?}. News: {:?}. \
             Grades: {:?}. Price target: {:?}. Estimates: {:?}.",
            quote, news, grades, price_target, estimates
        );

        let raw: Option<RawStockSummary> = self
            .llm
            .generate_json(&prompt, Some(&keys::summary(&symbol)))
            .await;
        let Some(raw) = raw else {
            return SummaryOutcome::GenerationFailed;
        };

        SummaryOutcome::Ready(StockSummary {
            symbol: symbol.clone(),
            sentiment: Sentiment {
                score: raw.sentiment_score.unwrap_or(5).min(10),
                label: raw
                    .sentiment_label
                    .as_deref()
                    .map(parse_sentiment_label)
                    .unwrap_or(SentimentLabel::Neutral),
            },
            summary: raw.summary.unwrap_or_default(),
            key_points: raw.key_points.unwrap_or_default(),
            catalysts: raw.catalysts.unwrap_or_default(),
            risks: raw.risks.unwrap_or_default(),
            generated_at: Utc::now().to_rfc3339(),
            data_source: "llm".to_string(),
        })
    }

    pub async fn market_overview(&self) -> Option<MarketOverview> {
        if !self.llm.is_configured() {
            return None;
        }
        let prompt = "Summarize current overall market sentiment as JSON with fields sentiment, \
                      summary, top_themes, sectors_to_watch, outlook."
            .to_string();
        let raw: RawMarketOverview = self
            .llm
            .generate_json(&prompt, Some(&keys::market_overview()))
            .await?;

        Some(MarketOverview {
            sentiment: raw.sentiment.as_deref().map(parse_market_sentiment).unwrap_or(MarketSentiment::Neutral),
            summary: raw.summary.unwrap_or_default(),
            top_themes: raw.top_themes.unwrap_or_default(),
            sectors_to_watch: raw.sectors_to_watch.unwrap_or_default(),
            outlook: raw.outlook.unwrap_or_default(),
            generated_at: Utc::now().to_rfc3339(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_fallback_extracts_symbols_and_excludes_common_words() {
        let filters = keyword_fallback_parse("show me AAPL and MSFT UP");
        assert_eq!(filters.symbols, vec!["AAPL".to_string(), "MSFT".to_string()]);
        assert_eq!(filters.change_direction, ChangeDirection::Up);
        assert_eq!(filters.search_type, SearchType::Stock);
    }

    #[test]
    fn keyword_fallback_detects_sector_by_name() {
        let filters = keyword_fallback_parse("healthcare stocks trending down");
        assert_eq!(filters.sector, Some(Sector::Healthcare));
        assert_eq!(filters.change_direction, ChangeDirection::Down);
    }

    #[test]
    fn keyword_fallback_defaults_to_both_with_no_symbols() {
        let filters = keyword_fallback_parse("tech stocks");
        assert_eq!(filters.search_type, SearchType::Both);
    }

    #[test]
    fn normalize_filters_upper_cases_symbols() {
        let filters = SearchFilters {
            symbols: vec!["aapl".to_string()],
            ..SearchFilters::default()
        };
        let normalized = normalize_filters(filters);
        assert_eq!(normalized.symbols, vec!["AAPL".to_string()]);
    }

    #[test]
    fn sentiment_label_parsing_falls_back_to_neutral() {
        assert_eq!(parse_sentiment_label("bullish"), SentimentLabel::Bullish);
        assert_eq!(parse_sentiment_label("garbage"), SentimentLabel::Neutral);
    }
}
