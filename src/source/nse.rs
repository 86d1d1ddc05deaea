use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::api::latency::LatencyStats;
use crate::config::{Config, USER_AGENT};
use crate::error::{AppError, Result};
use crate::source::baseline::Baseline;
use crate::source::{Batch, SnapshotSource};
use crate::types::Quote;

/// Result of one quote request.
enum QuoteFetch {
    Ok(Quote),
    /// 401/403 — the session cookies are missing or expired.
    Unauthorized(StatusCode),
    Failed(String),
}

/// Session-based client for the NSE quote-equity endpoint.
///
/// The endpoint rejects requests without the cookies set by the home page,
/// so every fetch cycle starts a fresh cookie session and primes it first.
pub struct NseClient {
    base_url: String,
    quote_timeout: Duration,
    prime_timeout: Duration,
    request_delay: Duration,
    latency: Arc<LatencyStats>,
}

impl NseClient {
    pub fn new(cfg: &Config, latency: Arc<LatencyStats>) -> Self {
        Self {
            base_url: cfg.nse_base_url.trim_end_matches('/').to_string(),
            quote_timeout: Duration::from_secs(cfg.quote_timeout_secs),
            prime_timeout: Duration::from_secs(cfg.prime_timeout_secs),
            request_delay: Duration::from_millis(cfg.request_delay_ms),
            latency,
        }
    }

    fn session(&self) -> Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .build()?;
        Ok(client)
    }

    /// Visit the home page so the session picks up its cookies.
    async fn prime(&self, client: &reqwest::Client) {
        match client
            .get(&self.base_url)
            .timeout(self.prime_timeout)
            .send()
            .await
        {
            Ok(resp) => debug!(status = %resp.status(), "session primed"),
            Err(e) => warn!("Session priming failed: {e}"),
        }
    }

    async fn fetch_quote(&self, client: &reqwest::Client, symbol: &str) -> QuoteFetch {
        let url = format!("{}/api/quote-equity?symbol={}", self.base_url, symbol);
        let started = Instant::now();
        let resp = client.get(&url).timeout(self.quote_timeout).send().await;
        self.latency.record(started.elapsed());

        let resp = match resp {
            Ok(r) => r,
            Err(e) => return QuoteFetch::Failed(format!("request error: {e}")),
        };
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return QuoteFetch::Unauthorized(status);
        }
        if !status.is_success() {
            return QuoteFetch::Failed(format!("status {status}"));
        }

        let body: serde_json::Value = match resp.json().await {
            Ok(v) => v,
            Err(e) => return QuoteFetch::Failed(format!("JSON parse error: {e}")),
        };
        match parse_quote(symbol, &body, Utc::now()) {
            Some(q) => QuoteFetch::Ok(q),
            None => QuoteFetch::Failed("response has no usable lastPrice".to_string()),
        }
    }

    /// Fetch quotes sequentially. Symbols that fail are logged and skipped.
    pub async fn fetch_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>> {
        let client = self.session()?;
        self.prime(&client).await;

        let mut quotes = Vec::with_capacity(symbols.len());
        for (i, symbol) in symbols.iter().enumerate() {
            if i > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            let mut outcome = self.fetch_quote(&client, symbol).await;
            if let QuoteFetch::Unauthorized(status) = outcome {
                debug!(symbol = %symbol, %status, "session rejected, re-priming once");
                self.prime(&client).await;
                outcome = self.fetch_quote(&client, symbol).await;
            }

            match outcome {
                QuoteFetch::Ok(q) => {
                    info!(
                        symbol = %q.symbol,
                        price = q.price,
                        volume = q.volume,
                        "✓ {:<12} | Price: ₹{:>10.2} | Volume: {:>15.0}",
                        q.symbol, q.price, q.volume,
                    );
                    quotes.push(q);
                }
                QuoteFetch::Unauthorized(status) => {
                    warn!(symbol = %symbol, "✗ {symbol:<12} | rejected after re-prime (status {status})");
                }
                QuoteFetch::Failed(reason) => {
                    warn!(symbol = %symbol, "✗ {symbol:<12} | {reason}");
                }
            }
        }

        info!("Fetched {}/{} quotes from NSE", quotes.len(), symbols.len());
        Ok(quotes)
    }
}

/// Extract a quote from a quote-equity response.
///
/// Volume prefers the pre-open session total and falls back to the top-level
/// total when the pre-open figure is zero or absent.
pub fn parse_quote(symbol: &str, v: &serde_json::Value, observed_at: DateTime<Utc>) -> Option<Quote> {
    let price = v
        .get("priceInfo")
        .and_then(|p| p.get("lastPrice"))
        .and_then(as_number)?;
    if !price.is_finite() || price <= 0.0 {
        return None;
    }

    let pre_open = v
        .get("preOpenMarket")
        .and_then(|p| p.get("totalTradedVolume"))
        .and_then(as_number)
        .unwrap_or(0.0);
    let volume = if pre_open > 0.0 {
        pre_open
    } else {
        v.get("totalTradedVolume").and_then(as_number).unwrap_or(0.0)
    };

    Some(Quote {
        symbol: symbol.to_string(),
        price,
        volume,
        observed_at,
    })
}

/// NSE sends numbers either as JSON numbers or as strings, sometimes with
/// thousands separators.
fn as_number(v: &serde_json::Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.replace(',', "").trim().parse().ok()))
}

// ---------------------------------------------------------------------------
// LiveSource
// ---------------------------------------------------------------------------

pub struct LiveSource {
    client: NseClient,
    symbols: Vec<String>,
    baseline: Baseline,
}

impl LiveSource {
    pub fn new(client: NseClient, symbols: Vec<String>, baseline: Baseline) -> Self {
        Self { client, symbols, baseline }
    }

    /// Raw quotes without pairing, used to record a baseline.
    pub async fn quotes(&self) -> Result<Vec<Quote>> {
        self.client.fetch_quotes(&self.symbols).await
    }
}

#[async_trait]
impl SnapshotSource for LiveSource {
    fn name(&self) -> &'static str {
        "live"
    }

    async fn snapshots(&self) -> Result<Batch> {
        let quotes = self.quotes().await?;
        if quotes.is_empty() {
            return Err(AppError::Acquisition("no quotes received from NSE".to_string()));
        }
        let snapshots = self.baseline.pair(&quotes);
        debug!(
            baseline = self.baseline.label(),
            quotes = quotes.len(),
            snapshots = snapshots.len(),
            "paired live quotes"
        );
        Ok(Batch {
            provenance: self.name(),
            snapshots,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_last_price_and_pre_open_volume() {
        let body = json!({
            "priceInfo": { "lastPrice": 2950.5, "open": 2900.0 },
            "preOpenMarket": { "totalTradedVolume": 183_220 },
            "totalTradedVolume": 999
        });
        let q = parse_quote("RELIANCE", &body, Utc::now()).unwrap();
        assert_eq!(q.symbol, "RELIANCE");
        assert_eq!(q.price, 2950.5);
        assert_eq!(q.volume, 183_220.0);
    }

    #[test]
    fn falls_back_to_top_level_volume() {
        let body = json!({
            "priceInfo": { "lastPrice": "1,512.25" },
            "preOpenMarket": { "totalTradedVolume": 0 },
            "totalTradedVolume": "2,100,000"
        });
        let q = parse_quote("HDFCBANK", &body, Utc::now()).unwrap();
        assert_eq!(q.price, 1512.25);
        assert_eq!(q.volume, 2_100_000.0);
    }

    #[test]
    fn missing_volume_defaults_to_zero() {
        let body = json!({ "priceInfo": { "lastPrice": 470.0 } });
        let q = parse_quote("WIPRO", &body, Utc::now()).unwrap();
        assert_eq!(q.volume, 0.0);
    }

    #[test]
    fn rejects_missing_or_zero_price() {
        assert!(parse_quote("TCS", &json!({ "priceInfo": {} }), Utc::now()).is_none());
        assert!(parse_quote("TCS", &json!({ "priceInfo": { "lastPrice": 0 } }), Utc::now()).is_none());
        assert!(parse_quote("TCS", &json!({ "error": "Resource not found" }), Utc::now()).is_none());
    }

    #[tokio::test]
    async fn unreachable_host_yields_no_quotes() {
        let mut cfg = Config::defaults();
        cfg.nse_base_url = "http://127.0.0.1:9".to_string();
        cfg.request_delay_ms = 0;
        cfg.quote_timeout_secs = 1;
        cfg.prime_timeout_secs = 1;
        let latency = Arc::new(LatencyStats::new());
        let source = LiveSource::new(
            NseClient::new(&cfg, Arc::clone(&latency)),
            vec!["TCS".to_string(), "INFY".to_string()],
            Baseline::synthetic(),
        );

        assert!(source.quotes().await.unwrap().is_empty());
        assert!(matches!(source.snapshots().await, Err(AppError::Acquisition(_))));
        assert!(latency.len() >= 2);
    }
}
