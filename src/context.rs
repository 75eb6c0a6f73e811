//! Process-wide runtime state shared by the monitor loop and the command
//! handlers.
//!
//! Lifecycle: built once from [`Config`] at startup, mutated only through the
//! methods here (settings commands, monitor toggles, chat subscriptions, the
//! driver storing each fetched batch), and read by everything else as
//! copies. Nothing here is persisted.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Notify, RwLock};
use tracing::info;

use crate::alert::{AlertStore, InMemoryAlertStore, RateSnapshot, ThresholdConfig};
use crate::config::{validate_band, Config, ConfigError, MIN_CHECK_INTERVAL_SECS};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub thresholds: ThresholdConfig,
    pub check_interval: Duration,
}

impl Settings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            thresholds: cfg.thresholds(),
            check_interval: cfg.check_interval(),
        }
    }
}

/// The most recent successful fetch.
#[derive(Debug, Clone)]
pub struct RateBatch {
    pub fetched_at: DateTime<Utc>,
    pub rates: Vec<RateSnapshot>,
}

pub struct AppContext {
    settings: RwLock<Settings>,
    monitoring: AtomicBool,
    subscribers: RwLock<BTreeSet<i64>>,
    latest: RwLock<Option<RateBatch>>,
    alerts: Arc<dyn AlertStore>,
    wake: Notify,
}

impl AppContext {
    pub fn new(settings: Settings, alerts: Arc<dyn AlertStore>) -> Self {
        Self {
            settings: RwLock::new(settings),
            monitoring: AtomicBool::new(false),
            subscribers: RwLock::new(BTreeSet::new()),
            latest: RwLock::new(None),
            alerts,
            wake: Notify::new(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let mut ctx = Self::new(Settings::from_config(cfg), Arc::new(InMemoryAlertStore::new()));
        *ctx.monitoring.get_mut() = cfg.monitor_on_start;
        ctx.subscribers.get_mut().extend(cfg.chat_ids.iter().copied());
        ctx
    }

    // === settings ===

    pub async fn settings(&self) -> Settings {
        *self.settings.read().await
    }

    /// Takes percent. Already-recorded alert bands are left alone; the new
    /// bound applies from the next tick.
    pub async fn set_upper_pct(&self, upper_pct: f64) -> Result<Settings, ConfigError> {
        let mut s = self.settings.write().await;
        validate_band(upper_pct, s.thresholds.lower_pct())?;
        s.thresholds.upper = upper_pct / 100.0;
        info!(upper_pct, "upper threshold updated");
        Ok(*s)
    }

    pub async fn set_lower_pct(&self, lower_pct: f64) -> Result<Settings, ConfigError> {
        let mut s = self.settings.write().await;
        validate_band(s.thresholds.upper_pct(), lower_pct)?;
        s.thresholds.lower = lower_pct / 100.0;
        info!(lower_pct, "lower threshold updated");
        Ok(*s)
    }

    pub async fn set_check_interval(&self, secs: u64) -> Result<Settings, ConfigError> {
        if secs < MIN_CHECK_INTERVAL_SECS {
            return Err(ConfigError::IntervalTooShort(secs));
        }
        let mut s = self.settings.write().await;
        s.check_interval = Duration::from_secs(secs);
        info!(secs, "check interval updated");
        Ok(*s)
    }

    // === monitoring flag ===

    pub fn is_monitoring(&self) -> bool {
        self.monitoring.load(Ordering::SeqCst)
    }

    /// Returns false if monitoring was already on. Turning it on wakes the
    /// loop so the first check does not wait a full interval.
    pub fn start_monitoring(&self) -> bool {
        let was_on = self.monitoring.swap(true, Ordering::SeqCst);
        if !was_on {
            info!("monitoring started");
            self.wake.notify_one();
        }
        !was_on
    }

    /// Returns false if monitoring was already off.
    pub fn stop_monitoring(&self) -> bool {
        let was_on = self.monitoring.swap(false, Ordering::SeqCst);
        if was_on {
            info!("monitoring stopped");
        }
        was_on
    }

    /// Resolves when `start_monitoring` turns monitoring on.
    pub async fn woken(&self) {
        self.wake.notified().await
    }

    // === subscribers ===

    /// Returns true for a chat not seen before.
    pub async fn subscribe(&self, chat_id: i64) -> bool {
        let added = self.subscribers.write().await.insert(chat_id);
        if added {
            info!(chat_id, "chat subscribed to alerts");
        }
        added
    }

    pub async fn subscribers(&self) -> Vec<i64> {
        self.subscribers.read().await.iter().copied().collect()
    }

    // === latest batch ===

    pub async fn store_batch(&self, rates: Vec<RateSnapshot>) {
        *self.latest.write().await = Some(RateBatch {
            fetched_at: Utc::now(),
            rates,
        });
    }

    pub async fn latest(&self) -> Option<RateBatch> {
        self.latest.read().await.clone()
    }

    pub async fn tracked_symbols(&self) -> usize {
        self.latest.read().await.as_ref().map(|b| b.rates.len()).unwrap_or(0)
    }

    // === alert bands ===

    pub fn alerts(&self) -> &Arc<dyn AlertStore> {
        &self.alerts
    }

    pub fn reset_alerts(&self) {
        self.alerts.clear();
        info!("alert bands reset");
    }
}
