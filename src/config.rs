use std::time::Duration;

use thiserror::Error;

use crate::alert::ThresholdConfig;
use crate::exchange::retry::RetryConfig;

pub const MIN_CHECK_INTERVAL_SECS: u64 = 60;

const DEFAULT_FAPI_BASES: &[&str] = &[
    "https://fapi.binance.com",
    "https://api.binance.com",
    "https://fapi.binance.us",
];

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("TELEGRAM_BOT_TOKEN is required")]
    MissingToken,
    #[error("UPPER_THRESHOLD ({upper}%) must be greater than LOWER_THRESHOLD ({lower}%)")]
    InvalidBand { upper: f64, lower: f64 },
    #[error("thresholds must be finite numbers")]
    NonFinite,
    #[error("CHECK_INTERVAL must be at least {} seconds, got {}", MIN_CHECK_INTERVAL_SECS, .0)]
    IntervalTooShort(u64),
    #[error("WEBHOOK_URL is required")]
    MissingWebhookUrl,
    #[error("no funding-rate endpoints configured")]
    NoEndpoints,
}

/// Process configuration, sourced from the environment.
///
/// Thresholds are entered in percent (`UPPER_THRESHOLD=0.6` means 0.6%)
/// and converted to fractions by [`Config::thresholds`].
#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: Option<String>,
    pub telegram_api_base: String,
    /// Chats that receive alerts from boot, before anyone sends a command.
    pub chat_ids: Vec<i64>,
    pub upper_threshold_pct: f64,
    pub lower_threshold_pct: f64,
    pub check_interval_secs: u64,
    pub monitor_on_start: bool,
    pub fapi_bases: Vec<String>,
    pub http_timeout_secs: u64,
    pub fetch_retries: u32,
    pub port: u16,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            telegram_token: non_empty("TELEGRAM_BOT_TOKEN"),
            telegram_api_base: non_empty("TELEGRAM_API_BASE").unwrap_or_else(|| "https://api.telegram.org".to_string()),
            chat_ids: var("TELEGRAM_CHAT_IDS")
                .map(|v| v.split(',').filter_map(|s| s.trim().parse().ok()).collect())
                .unwrap_or_default(),
            upper_threshold_pct: var("UPPER_THRESHOLD").and_then(|v| v.trim().parse().ok()).unwrap_or(0.6),
            lower_threshold_pct: var("LOWER_THRESHOLD").and_then(|v| v.trim().parse().ok()).unwrap_or(-1.0),
            check_interval_secs: var("CHECK_INTERVAL").and_then(|v| v.trim().parse().ok()).unwrap_or(300),
            monitor_on_start: var("MONITOR_ON_START")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            fapi_bases: var("BINANCE_FAPI_BASES")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().trim_end_matches('/').to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_else(|| DEFAULT_FAPI_BASES.iter().map(|s| s.to_string()).collect()),
            http_timeout_secs: var("HTTP_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()).unwrap_or(30),
            fetch_retries: var("FETCH_RETRIES").and_then(|v| v.trim().parse().ok()).unwrap_or(1),
            port: var("PORT").and_then(|v| v.trim().parse().ok()).unwrap_or(8000),
            webhook_url: non_empty("WEBHOOK_URL"),
            webhook_secret: non_empty("WEBHOOK_SECRET"),
        }
    }

    /// Checks shared by every deployment. Token presence is checked
    /// separately since the tick endpoint can run without one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_band(self.upper_threshold_pct, self.lower_threshold_pct)?;
        if self.check_interval_secs < MIN_CHECK_INTERVAL_SECS {
            return Err(ConfigError::IntervalTooShort(self.check_interval_secs));
        }
        if self.fapi_bases.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }
        Ok(())
    }

    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.telegram_token.as_deref().ok_or(ConfigError::MissingToken)
    }

    pub fn require_webhook_url(&self) -> Result<&str, ConfigError> {
        self.webhook_url.as_deref().ok_or(ConfigError::MissingWebhookUrl)
    }

    pub fn thresholds(&self) -> ThresholdConfig {
        ThresholdConfig::from_percent(self.upper_threshold_pct, self.lower_threshold_pct)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.fetch_retries,
            base_delay_ms: 500,
            max_delay_ms: 5000,
            ..Default::default()
        }
    }
}

/// Percent-valued band check, shared with the runtime settings command.
pub fn validate_band(upper_pct: f64, lower_pct: f64) -> Result<(), ConfigError> {
    if !upper_pct.is_finite() || !lower_pct.is_finite() {
        return Err(ConfigError::NonFinite);
    }
    if upper_pct <= lower_pct {
        return Err(ConfigError::InvalidBand { upper: upper_pct, lower: lower_pct });
    }
    Ok(())
}
