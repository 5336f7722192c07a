//! Parameter validation shared across route handlers (spec §4.7, §8
//! boundary behaviors). Every validator runs before any adapter call.

use serde_json::json;

use crate::adapters::crypto::{is_valid_coin_id, range_to_days};
use crate::adapters::explorer::{is_valid_address, is_valid_tx_hash};
use crate::error::GatewayError;

pub fn coin_id(raw: &str) -> Result<String, GatewayError> {
    if is_valid_coin_id(raw) {
        Ok(raw.to_string())
    } else {
        Err(GatewayError::validation(
            "invalid coin id",
            json!({ "field": "coinId", "value": raw }),
        ))
    }
}

pub fn chart_range(raw: &str) -> Result<String, GatewayError> {
    if range_to_days(raw).is_some() {
        Ok(raw.to_string())
    } else {
        Err(GatewayError::validation(
            "invalid range",
            json!({ "field": "range", "value": raw, "allowed": ["1D", "7D", "30D", "90D", "1Y"] }),
        ))
    }
}

pub fn chain(raw: &str) -> Result<String, GatewayError> {
    match raw {
        "bitcoin" | "ethereum" => Ok(raw.to_string()),
        _ => Err(GatewayError::validation(
            "invalid chain",
            json!({ "field": "chain", "value": raw, "allowed": ["bitcoin", "ethereum"] }),
        )),
    }
}

/// Block numbers are non-negative integers with no leading zeros except
/// the literal `"0"`.
pub fn block_number(raw: &str) -> Result<String, GatewayError> {
    let is_valid = !raw.is_empty()
        && raw.chars().all(|c| c.is_ascii_digit())
        && (raw == "0" || !raw.starts_with('0'));
    if is_valid {
        Ok(raw.to_string())
    } else {
        Err(GatewayError::validation(
            "invalid block number",
            json!({ "field": "number", "value": raw }),
        ))
    }
}

/// Limits coerced into [1,100]; out-of-range values are rejected rather
/// than silently clamped (spec §8: `limit=0`/`limit=101` both yield 400).
pub fn limit(raw: &str) -> Result<u32, GatewayError> {
    let value: u32 = raw.parse().map_err(|_| {
        GatewayError::validation("invalid limit", json!({ "field": "limit", "value": raw }))
    })?;
    if (1..=100).contains(&value) {
        Ok(value)
    } else {
        Err(GatewayError::validation(
            "limit out of range",
            json!({ "field": "limit", "value": value, "min": 1, "max": 100 }),
        ))
    }
}

pub fn page(raw: &str) -> Result<u32, GatewayError> {
    let value: u32 = raw.parse().map_err(|_| {
        GatewayError::validation("invalid page", json!({ "field": "page", "value": raw }))
    })?;
    if value >= 1 {
        Ok(value)
    } else {
        Err(GatewayError::validation(
            "page out of range",
            json!({ "field": "page", "value": value, "min": 1 }),
        ))
    }
}

pub fn timeframe(raw: &str) -> Result<String, GatewayError> {
    match raw {
        "1D" | "7D" | "30D" | "1Y" => Ok(raw.to_string()),
        _ => Err(GatewayError::validation(
            "invalid timeframe",
            json!({ "field": "timeframe", "value": raw, "allowed": ["1D", "7D", "30D", "1Y"] }),
        )),
    }
}

/// Comma-separated coin ids for `/prices/batch` (spec §8: missing, empty,
/// or more than 50 ids is a 400).
pub fn coin_id_list(raw: &str, max: usize) -> Result<Vec<String>, GatewayError> {
    let ids: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if ids.is_empty() || ids.len() > max || !ids.iter().all(|id| is_valid_coin_id(id)) {
        return Err(GatewayError::validation(
            "invalid coin id list",
            json!({ "field": "ids", "count": ids.len(), "max": max }),
        ));
    }
    Ok(ids)
}

/// Transaction hash shape for either chain (spec §4.6): `(0x)?[a-fA-F0-9]{64}`.
/// A malformed hash is a validation error, not a miss — the chain can't
/// even be guessed, let alone looked up.
pub fn tx_hash(raw: &str) -> Result<String, GatewayError> {
    if is_valid_tx_hash(raw) {
        Ok(raw.to_string())
    } else {
        Err(GatewayError::validation(
            "invalid transaction hash",
            json!({ "field": "hash", "value": raw }),
        ))
    }
}

/// Ethereum or Bitcoin address shape (spec §4.6).
pub fn address(raw: &str) -> Result<String, GatewayError> {
    if is_valid_address(raw) {
        Ok(raw.to_string())
    } else {
        Err(GatewayError::validation(
            "invalid address",
            json!({ "field": "address", "value": raw }),
        ))
    }
}

pub fn symbol_list(raw: &str, max: usize) -> Result<Vec<String>, GatewayError> {
    let symbols: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_uppercase)
        .collect();
    if symbols.is_empty() || symbols.len() > max {
        return Err(GatewayError::validation(
            "invalid symbol list",
            json!({ "field": "symbols", "count": symbols.len(), "max": max }),
        ));
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_number_rejects_leading_zeros_except_literal_zero() {
        assert!(block_number("0").is_ok());
        assert!(block_number("007").is_err());
        assert!(block_number("123").is_ok());
        assert!(block_number("-1").is_err());
        assert!(block_number("").is_err());
    }

    #[test]
    fn limit_boundaries_reject_zero_and_over_100() {
        assert!(limit("0").is_err());
        assert!(limit("101").is_err());
        assert!(limit("1").is_ok());
        assert!(limit("100").is_ok());
    }

    #[test]
    fn page_rejects_zero() {
        assert!(page("0").is_err());
        assert!(page("1").is_ok());
    }

    #[test]
    fn tx_hash_rejects_wrong_length() {
        assert!(tx_hash(&"a".repeat(64)).is_ok());
        assert!(tx_hash(&format!("0x{}", "a".repeat(64))).is_ok());
        assert!(tx_hash(&"a".repeat(63)).is_err());
        assert!(tx_hash("not-a-hash").is_err());
    }

    #[test]
    fn address_accepts_either_chain_shape() {
        assert!(address(&format!("0x{}", "1".repeat(40))).is_ok());
        assert!(address("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa").is_ok());
        assert!(address("not-an-address").is_err());
    }

    #[test]
    fn symbol_list_enforces_max_count() {
        assert!(symbol_list("a,b,c", 2).is_err());
        assert!(symbol_list("a,b", 2).is_ok());
        assert!(symbol_list("", 2).is_err());
        assert_eq!(symbol_list("aapl, msft", 10).unwrap(), vec!["AAPL", "MSFT"]);
    }
}
