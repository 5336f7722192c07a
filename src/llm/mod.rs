//! LLM wrapper: cached, rate-limited, never throws to its caller (spec §4.5).

pub mod extractor;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::breaker::CircuitBreaker;
use crate::cache::TtlCache;
use crate::http_client::Fetcher;
use crate::rate_limiter::FixedWindowLimiter;

const CACHE_TTL: Duration = Duration::from_secs(2 * 60 * 60);
const REQUEST_TIMEOUT_MS: u64 = 15_000;
const TEMPERATURE: f32 = 0.1;
const MAX_OUTPUT_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

pub struct LlmClient {
    api_key: Option<String>,
    endpoint_base: String,
    fetcher: Arc<Fetcher>,
    cache: TtlCache,
    limiter: Arc<FixedWindowLimiter>,
    breaker: Arc<CircuitBreaker>,
}

impl LlmClient {
    pub fn new(
        api_key: Option<String>,
        fetcher: Arc<Fetcher>,
        cache: TtlCache,
        limiter: Arc<FixedWindowLimiter>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            api_key,
            endpoint_base: "https://generativelanguage.googleapis.com/v1beta/models/\
                gemini-1.5-flash:generateContent"
                .to_string(),
            fetcher,
            cache,
            limiter,
            breaker,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn requests_remaining(&self) -> u32 {
        self.limiter.get_status().requests_remaining
    }

    /// Flow steps 1-6 from spec §4.5. Never throws; `None` covers every
    /// failure mode (not configured, cache miss + rate limited, upstream
    /// failure).
    pub async fn generate_content(&self, prompt: &str, cache_key: Option<&str>) -> Option<String> {
        let api_key = self.api_key.as_ref()?;

        if let Some(key) = cache_key {
            if let Some(cached) = self.cache.get_typed::<String>(key, CACHE_TTL) {
                return Some(cached);
            }
        }

        if !self.limiter.check_rate_limit() {
            warn!("LLM rate limit reached; rejecting generation request");
            return None;
        }
        self.limiter.record_request();

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        });

        let api_key = api_key.clone();
        let url = format!("{}?key={api_key}", self.endpoint_base);
        let fetcher = self.fetcher.clone();

        let result = self
            .breaker
            .execute(|| async move {
                let parsed: Value = fetcher.post_json(&url, &body, REQUEST_TIMEOUT_MS).await?;
                extract_text(&parsed).ok_or_else(|| crate::error::GatewayError::Upstream {
                    upstream: "llm",
                    message: "no text in response".to_string(),
                })
            })
            .await;

        match result {
            Ok(text) => {
                if let Some(key) = cache_key {
                    self.cache.set(key, &text);
                }
                Some(text)
            }
            Err(err) => {
                warn!(error = %err, "LLM generation failed");
                None
            }
        }
    }

    /// Wraps `generate_content` with the balanced-brace extractor, then a
    /// generic JSON decode. Schema validation/defaults are the caller's job.
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        cache_key: Option<&str>,
    ) -> Option<T> {
        let text = self.generate_content(prompt, cache_key).await?;
        let extracted = extractor::extract_json(&text)?;
        serde_json::from_str(&extracted).ok()
    }
}

fn extract_text(response: &Value) -> Option<String> {
    response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;

    fn client(api_key: Option<String>) -> LlmClient {
        let clock: Arc<dyn crate::clock::Clock> = Arc::new(TestClock::new());
        let cache = TtlCache::new(clock.clone());
        let limiter = Arc::new(FixedWindowLimiter::new(15, Duration::from_secs(60), clock.clone()));
        let breaker = Arc::new(CircuitBreaker::new(
            "llm",
            3,
            2,
            Duration::from_secs(120),
            clock,
        ));
        let fetcher = Arc::new(Fetcher::new(
            crate::config::Allowlist {
                hosts: vec!["generativelanguage.googleapis.com".to_string()],
            },
            crate::config::Environment::Development,
        ));
        LlmClient::new(api_key, fetcher, cache, limiter, breaker)
    }

    #[tokio::test]
    async fn not_configured_returns_none_without_consuming_rate_limit() {
        let c = client(None);
        assert!(c.generate_content("hi", None).await.is_none());
        assert_eq!(c.requests_remaining(), 15);
    }

    #[tokio::test]
    async fn cache_hit_short_circuits_before_rate_limit_check() {
        let c = client(Some("key".to_string()));
        c.cache.set("ai:summary:AAPL", &"cached text".to_string());
        let result = c.generate_content("prompt", Some("ai:summary:AAPL")).await;
        assert_eq!(result.as_deref(), Some("cached text"));
        assert_eq!(c.requests_remaining(), 15);
    }

    #[test]
    fn extract_text_reads_first_candidate_part() {
        let response = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "hello"}]}}]
        });
        assert_eq!(extract_text(&response).as_deref(), Some("hello"));
    }
}
