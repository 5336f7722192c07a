//! Read-only application configuration, built once at startup.
//!
//! Re-architects the teacher's ad hoc `hasX = apiKey.length > 0` module-scope
//! booleans (design note §9) into a single immutable record passed to every
//! adapter constructor. Shape follows `models::Config::from_env` in the
//! teacher: one `std::env::var(..).unwrap_or_else(..)` per field, loaded
//! after `dotenv::dotenv().ok()`.

use std::time::Duration;

/// Upstream hostnames egress is permitted to reach. Exhaustive; never grown
/// at runtime.
#[derive(Debug, Clone)]
pub struct Allowlist {
    pub hosts: Vec<String>,
}

impl Allowlist {
    pub fn contains(&self, host: &str) -> bool {
        self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub port: u16,
    pub app_url: String,

    pub allowlist: Allowlist,
    pub default_timeout: Duration,

    pub coingecko_api_key: Option<String>,
    pub etherscan_api_key: Option<String>,
    pub blockcypher_api_key: Option<String>,
    pub stock_primary_api_key: Option<String>,
    pub stock_fallback_api_key: Option<String>,
    pub fundamentals_api_key: Option<String>,
    pub llm_api_key: Option<String>,

    pub cors_allowed_origins: Vec<String>,

    pub inbound_rate_limit_per_minute: u32,
    pub llm_rate_limit_per_window: u32,
    pub llm_rate_window: Duration,

    /// Per-upstream base-URL overrides. `None` in every normal deployment;
    /// set only by `tests/dispatcher_scenarios.rs` to point an adapter at a
    /// `mockito` server instead of the real upstream. Never read from the
    /// environment in production — `from_env` never populates these.
    pub base_url_overrides: BaseUrlOverrides,
}

#[derive(Debug, Clone, Default)]
pub struct BaseUrlOverrides {
    pub crypto: Option<String>,
    pub blockcypher: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Scheme enforcement per spec §4.3 rule 2: HTTPS required in production.
    pub fn requires_https(self) -> bool {
        self.is_production()
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let environment = match std::env::var("NODE_ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        };

        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let app_url =
            std::env::var("APP_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let allowlist = Allowlist {
            hosts: default_allowlist_hosts()
                .into_iter()
                .map(str::to_string)
                .collect(),
        };

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| app_url.clone())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            environment,
            port,
            app_url,
            allowlist,
            default_timeout: Duration::from_secs(10),
            coingecko_api_key: non_empty_env("COINGECKO_API_KEY"),
            etherscan_api_key: non_empty_env("ETHERSCAN_API_KEY"),
            blockcypher_api_key: non_empty_env("BLOCKCYPHER_API_KEY"),
            stock_primary_api_key: non_empty_env("FINNHUB_API_KEY"),
            stock_fallback_api_key: non_empty_env("FINNHUB_FALLBACK_API_KEY")
                .or_else(|| non_empty_env("TWELVEDATA_API_KEY")),
            fundamentals_api_key: non_empty_env("FMP_API_KEY"),
            llm_api_key: non_empty_env("GEMINI_API_KEY"),
            cors_allowed_origins,
            inbound_rate_limit_per_minute: 100,
            llm_rate_limit_per_window: 15,
            llm_rate_window: Duration::from_secs(60),
            base_url_overrides: BaseUrlOverrides::default(),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn default_allowlist_hosts() -> Vec<&'static str> {
    vec![
        "api.coingecko.com",
        "api.etherscan.io",
        "api.blockcypher.com",
        "finnhub.io",
        "www.alphavantage.co",
        "financialmodelingprep.com",
        "generativelanguage.googleapis.com",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlist_match_is_case_insensitive_exact() {
        let allow = Allowlist {
            hosts: vec!["api.coingecko.com".to_string()],
        };
        assert!(allow.contains("API.COINGECKO.COM"));
        assert!(!allow.contains("evil.api.coingecko.com"));
        assert!(!allow.contains("api.coingecko.com.evil.com"));
    }

    #[test]
    fn development_does_not_require_https() {
        assert!(!Environment::Development.requires_https());
        assert!(Environment::Production.requires_https());
    }
}
