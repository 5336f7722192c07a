//! SSRF-guarded HTTP fetcher — the only egress point (spec §4.3).
//!
//! Builds one shared `reqwest::Client` the way the teacher's
//! `HashdiveScraper::new` does (`Client::builder().timeout(..).
//! user_agent(..)`), but unlike any single teacher scraper — which trusts
//! its own hardcoded base URL — every call here is validated against an
//! explicit allowlist first, since this client is shared across every
//! upstream adapter rather than owned by one.

use std::time::Duration;

use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::config::{Allowlist, Environment};
use crate::error::GatewayError;

const USER_AGENT: &str = "TickerHub/1.0";

pub struct Fetcher {
    client: reqwest::Client,
    allowlist: Allowlist,
    environment: Environment,
}

impl Fetcher {
    pub fn new(allowlist: Allowlist, environment: Environment) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            allowlist,
            environment,
        }
    }

    /// Spec §4.3 rules 1-4, all of which must pass.
    fn validate_url(&self, raw_url: &str) -> Result<Url, GatewayError> {
        let url = Url::parse(raw_url)
            .map_err(|_| GatewayError::Forbidden(format!("unparseable URL: {raw_url}")))?;

        if self.environment.requires_https() && url.scheme() != "https" {
            return Err(GatewayError::Forbidden(format!(
                "non-HTTPS scheme in production: {}",
                url.scheme()
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| GatewayError::Forbidden("missing host".to_string()))?;

        if !self.allowlist.contains(host) {
            return Err(GatewayError::Forbidden(format!("host not allowlisted: {host}")));
        }

        if is_private_or_loopback(host) {
            return Err(GatewayError::Forbidden(format!(
                "host resolves to a private/loopback pattern: {host}"
            )));
        }

        Ok(url)
    }

    /// Sets standard headers merged over caller headers and aborts at
    /// `timeout_ms`. Non-2xx is surfaced to callers, not translated here —
    /// that happens in `fetch_json`.
    pub async fn fetch_with_timeout(
        &self,
        url: &str,
        headers: Vec<(&str, String)>,
        timeout_ms: u64,
    ) -> Result<Response, GatewayError> {
        let url = self.validate_url(url)?;

        let mut builder = self
            .client
            .request(Method::GET, url)
            .timeout(Duration::from_millis(timeout_ms))
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json");

        for (key, value) in headers {
            builder = builder.header(key, value);
        }

        builder.send().await.map_err(|err| {
            if err.is_timeout() {
                GatewayError::Upstream {
                    upstream: "fetch",
                    message: "timed out".to_string(),
                }
            } else {
                GatewayError::Upstream {
                    upstream: "fetch",
                    message: err.to_string(),
                }
            }
        })
    }

    /// Non-2xx is an upstream error; parse failure is also an upstream
    /// error. Callers decide whether that becomes 404/503/etc.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        timeout_ms: u64,
    ) -> Result<T, GatewayError> {
        let response = self.fetch_with_timeout(url, Vec::new(), timeout_ms).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Upstream {
                upstream: "fetch",
                message: format!("status {status}"),
            });
        }
        response.json::<T>().await.map_err(|err| GatewayError::Upstream {
            upstream: "fetch",
            message: format!("parse failure: {err}"),
        })
    }

    /// Swallows all errors to `None` — for optional augmentation calls
    /// (health probes, fallback profile merges).
    pub async fn safe_fetch<T: DeserializeOwned>(&self, url: &str, timeout_ms: u64) -> Option<T> {
        self.fetch_json(url, timeout_ms).await.ok()
    }

    /// Same allowlist/SSRF validation as `fetch_json`, for upstreams (the
    /// LLM generation endpoint) that are called with `POST` and a JSON body
    /// rather than `GET`. This is the only other egress path in the crate;
    /// every upstream call, `GET` or `POST`, passes through `validate_url`.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
        timeout_ms: u64,
    ) -> Result<T, GatewayError> {
        let url = self.validate_url(url)?;

        let response = self
            .client
            .request(Method::POST, url)
            .timeout(Duration::from_millis(timeout_ms))
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    GatewayError::Upstream {
                        upstream: "fetch",
                        message: "timed out".to_string(),
                    }
                } else {
                    GatewayError::Upstream {
                        upstream: "fetch",
                        message: err.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Upstream {
                upstream: "fetch",
                message: format!("status {status}"),
            });
        }
        response.json::<T>().await.map_err(|err| GatewayError::Upstream {
            upstream: "fetch",
            message: format!("parse failure: {err}"),
        })
    }

    /// Same validation path as `fetch_json` but returns only the status,
    /// for health probes that don't care about the body shape. A non-2xx
    /// status is still a failed probe.
    pub async fn probe(&self, url: &str, timeout_ms: u64) -> Result<StatusCode, GatewayError> {
        let response = self.fetch_with_timeout(url, Vec::new(), timeout_ms).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Upstream {
                upstream: "fetch",
                message: format!("status {status}"),
            });
        }
        Ok(status)
    }
}

fn is_private_or_loopback(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == "localhost"
        || host == "127.0.0.1"
        || host.starts_with("192.168.")
        || host.starts_with("10.")
        || host.starts_with("172.16.")
        || host.ends_with(".local")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> Fetcher {
        Fetcher::new(
            Allowlist {
                hosts: vec!["api.coingecko.com".to_string()],
            },
            Environment::Production,
        )
    }

    #[test]
    fn rejects_host_not_in_allowlist() {
        let f = fetcher();
        let err = f.validate_url("https://evil.example.com/admin").unwrap_err();
        assert!(matches!(err, GatewayError::Forbidden(_)));
    }

    #[test]
    fn rejects_private_and_loopback_hosts_even_if_allowlisted() {
        let f = Fetcher::new(
            Allowlist {
                hosts: vec!["192.168.0.1".to_string(), "localhost".to_string()],
            },
            Environment::Development,
        );
        assert!(f.validate_url("http://192.168.0.1/admin").is_err());
        assert!(f.validate_url("http://localhost/admin").is_err());
        assert!(f.validate_url("http://127.0.0.1/admin").is_err());
        assert!(f.validate_url("http://foo.local/admin").is_err());
        assert!(f.validate_url("http://10.0.0.5/x").is_err());
        assert!(f.validate_url("http://172.16.0.5/x").is_err());
    }

    #[test]
    fn requires_https_in_production() {
        let f = fetcher();
        let err = f.validate_url("http://api.coingecko.com/v3/ping").unwrap_err();
        assert!(matches!(err, GatewayError::Forbidden(_)));
    }

    #[test]
    fn allows_https_in_production_for_allowlisted_host() {
        let f = fetcher();
        assert!(f.validate_url("https://api.coingecko.com/v3/ping").is_ok());
    }

    #[test]
    fn development_permits_http_for_allowlisted_host() {
        let f = Fetcher::new(
            Allowlist {
                hosts: vec!["api.coingecko.com".to_string()],
            },
            Environment::Development,
        );
        assert!(f.validate_url("http://api.coingecko.com/v3/ping").is_ok());
    }

    #[tokio::test]
    async fn fetch_json_rejects_ssrf_before_any_socket_attempt() {
        let f = Fetcher::new(
            Allowlist {
                hosts: vec!["api.coingecko.com".to_string()],
            },
            Environment::Production,
        );
        let result: Result<serde_json::Value, _> =
            f.fetch_json("http://192.168.0.1/admin", 1000).await;
        assert!(matches!(result.unwrap_err(), GatewayError::Forbidden(_)));
    }

    #[tokio::test]
    async fn fetch_json_reads_body_from_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/ping")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let host = server.host_with_port();
        let host_only = host.split(':').next().unwrap().to_string();
        let f = Fetcher::new(
            Allowlist {
                hosts: vec![host_only],
            },
            Environment::Development,
        );
        let url = format!("{}/ping", server.url());
        let value: serde_json::Value = f.fetch_json(&url, 2000).await.unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn fetch_json_non_2xx_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/fail")
            .with_status(500)
            .create_async()
            .await;
        let host_only = server.host_with_port().split(':').next().unwrap().to_string();
        let f = Fetcher::new(
            Allowlist {
                hosts: vec![host_only],
            },
            Environment::Development,
        );
        let url = format!("{}/fail", server.url());
        let result: Result<serde_json::Value, _> = f.fetch_json(&url, 2000).await;
        assert!(matches!(result.unwrap_err(), GatewayError::Upstream { .. }));
    }

    #[tokio::test]
    async fn safe_fetch_swallows_errors() {
        let f = fetcher();
        let result: Option<serde_json::Value> =
            f.safe_fetch("http://192.168.0.1/admin", 1000).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn post_json_rejects_ssrf_before_any_socket_attempt() {
        let f = Fetcher::new(
            Allowlist {
                hosts: vec!["generativelanguage.googleapis.com".to_string()],
            },
            Environment::Production,
        );
        let result: Result<serde_json::Value, _> = f
            .post_json("http://192.168.0.1/admin", &serde_json::json!({}), 1000)
            .await;
        assert!(matches!(result.unwrap_err(), GatewayError::Forbidden(_)));
    }

    #[tokio::test]
    async fn post_json_sends_body_and_reads_response() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/generate")
            .match_body(mockito::Matcher::Json(serde_json::json!({"prompt": "hi"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let host_only = server.host_with_port().split(':').next().unwrap().to_string();
        let f = Fetcher::new(
            Allowlist {
                hosts: vec![host_only],
            },
            Environment::Development,
        );
        let url = format!("{}/generate", server.url());
        let value: serde_json::Value = f
            .post_json(&url, &serde_json::json!({"prompt": "hi"}), 2000)
            .await
            .unwrap();
        assert_eq!(value["ok"], true);
    }
}
