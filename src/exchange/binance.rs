use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::alert::RateSnapshot;
use crate::config::Config;
use crate::exchange::retry::{is_retryable_http_error, is_retryable_network_error, retry_async, RetryConfig};
use crate::exchange::{RateSource, SourceError};

const PREMIUM_INDEX_PATH: &str = "/fapi/v1/premiumIndex";
const USER_AGENT: &str = concat!("fundwatch/", env!("CARGO_PKG_VERSION"));

/// Binance USDⓈ-M futures funding rates with endpoint fallback.
///
/// Endpoints are tried starting from the last one that answered, so a
/// geo-blocked primary costs one failed request per tick at most.
pub struct BinanceFutures {
    client: Client,
    bases: Vec<String>,
    preferred: AtomicUsize,
    retry: RetryConfig,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PremiumIndex {
    symbol: String,
    mark_price: String,
    last_funding_rate: String,
    #[serde(default)]
    next_funding_time: u64,
}

#[derive(Debug, Error)]
enum FetchError {
    #[error("HTTP {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected payload: {0}")]
    Decode(String),
}

impl FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status(status) => is_retryable_http_error(*status),
            FetchError::Network(err) => is_retryable_network_error(err),
            FetchError::Decode(_) => false,
        }
    }
}

impl BinanceFutures {
    pub fn new(cfg: &Config) -> Result<Self, SourceError> {
        Self::with_endpoints(cfg.fapi_bases.clone(), cfg.http_timeout(), cfg.retry())
    }

    pub fn with_endpoints(bases: Vec<String>, timeout: Duration, retry: RetryConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            bases,
            preferred: AtomicUsize::new(0),
            retry,
        })
    }

    /// Base URL that answered most recently.
    pub fn current_endpoint(&self) -> Option<&str> {
        if self.bases.is_empty() {
            return None;
        }
        let idx = self.preferred.load(Ordering::Relaxed) % self.bases.len();
        Some(self.bases[idx].as_str())
    }

    async fn fetch_from(&self, base: &str) -> Result<Vec<RateSnapshot>, FetchError> {
        let url = format!("{}{}", base, PREMIUM_INDEX_PATH);
        debug!(%url, "fetching funding rates");
        let resp = self.client.get(&url).header(ACCEPT, "application/json").send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body: Value = resp.json().await?;
        let items = body
            .as_array()
            .ok_or_else(|| FetchError::Decode("expected a JSON array".to_string()))?;
        Ok(parse_premium_index(items, Utc::now()))
    }
}

#[async_trait]
impl RateSource for BinanceFutures {
    async fn fetch_rates(&self) -> Result<Vec<RateSnapshot>, SourceError> {
        let n = self.bases.len();
        let start = if n == 0 { 0 } else { self.preferred.load(Ordering::Relaxed) % n };
        let mut last_error = String::from("no endpoints configured");
        let mut attempts = 0;

        for offset in 0..n {
            let idx = (start + offset) % n;
            let base = self.bases[idx].as_str();
            attempts += 1;
            match retry_async(&self.retry, "premium_index", FetchError::is_retryable, || self.fetch_from(base)).await {
                Ok(rates) => {
                    if idx != start {
                        info!(endpoint = base, "switched funding-rate endpoint");
                    }
                    self.preferred.store(idx, Ordering::Relaxed);
                    info!(endpoint = base, count = rates.len(), "fetched funding rates");
                    return Ok(rates);
                }
                Err(e) => {
                    warn!(endpoint = base, error = %e, "funding-rate endpoint failed");
                    last_error = format!("{}: {}", base, e);
                }
            }
        }

        Err(SourceError::Unavailable { attempts, last_error })
    }
}

/// Normalize a `premiumIndex` payload. Entries without a usable funding
/// rate (delivery contracts report an empty string) are skipped.
pub(crate) fn parse_premium_index(items: &[Value], observed_at: DateTime<Utc>) -> Vec<RateSnapshot> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let entry: PremiumIndex = match serde_json::from_value(item.clone()) {
            Ok(e) => e,
            Err(e) => {
                let symbol = item.get("symbol").and_then(Value::as_str).unwrap_or("unknown");
                warn!(symbol, error = %e, "skipping malformed premium index entry");
                continue;
            }
        };
        let rate = match entry.last_funding_rate.parse::<f64>() {
            Ok(r) if r.is_finite() => r,
            _ => {
                debug!(symbol = %entry.symbol, raw = %entry.last_funding_rate, "skipping entry without funding rate");
                continue;
            }
        };
        out.push(RateSnapshot {
            symbol: entry.symbol,
            rate,
            mark_price: entry.mark_price.parse().unwrap_or(0.0),
            next_funding_time: entry.next_funding_time,
            observed_at,
        });
    }
    out
}
