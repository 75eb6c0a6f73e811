//! Polling driver: fetch → evaluate → notify, once per interval.
//!
//! A tick runs to completion before the next wait starts. A tick while
//! monitoring is off does nothing and is not made up later. A failed fetch
//! skips the tick with alert bands untouched.

use std::sync::Arc;

use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::alert::{evaluate, AlertEvent, RateSnapshot, ThresholdConfig};
use crate::context::AppContext;
use crate::exchange::RateSource;
use crate::notify::format::alert_message;
use crate::notify::Notifier;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TickReport {
    pub checked: usize,
    pub alerts: Vec<AlertEvent>,
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TickOutcome {
    Paused,
    Skipped { reason: String },
    Completed(TickReport),
}

impl TickOutcome {
    pub fn alerts(&self) -> &[AlertEvent] {
        match self {
            TickOutcome::Completed(report) => &report.alerts,
            _ => &[],
        }
    }
}

pub struct Monitor {
    ctx: Arc<AppContext>,
    source: Arc<dyn RateSource>,
    notifier: Arc<dyn Notifier>,
}

impl Monitor {
    pub fn new(ctx: Arc<AppContext>, source: Arc<dyn RateSource>, notifier: Arc<dyn Notifier>) -> Self {
        Self { ctx, source, notifier }
    }

    /// One scheduled tick; a no-op while monitoring is off.
    pub async fn tick(&self) -> TickOutcome {
        if !self.ctx.is_monitoring() {
            debug!("monitoring off, tick skipped");
            return TickOutcome::Paused;
        }
        self.check().await
    }

    /// Fetch and evaluate regardless of the monitoring flag.
    pub async fn check(&self) -> TickOutcome {
        // thresholds are fixed for the whole tick
        let settings = self.ctx.settings().await;

        let rates = match self.source.fetch_rates().await {
            Ok(rates) => rates,
            Err(e) => {
                warn!(error = %e, "funding-rate fetch failed, tick skipped");
                return TickOutcome::Skipped { reason: e.to_string() };
            }
        };
        if rates.is_empty() {
            warn!("no funding rates retrieved");
            return TickOutcome::Completed(TickReport::default());
        }

        let alerts = self.evaluate_batch(&rates, &settings.thresholds);
        let checked = rates.len();
        self.ctx.store_batch(rates).await;

        let (delivered, failed) = self.dispatch(&alerts).await;
        info!(checked, alerts = alerts.len(), delivered, failed, "tick complete");
        TickOutcome::Completed(TickReport {
            checked,
            alerts,
            delivered,
            failed,
        })
    }

    fn evaluate_batch(&self, rates: &[RateSnapshot], thresholds: &ThresholdConfig) -> Vec<AlertEvent> {
        let store = self.ctx.alerts();
        let mut alerts = Vec::new();
        for snapshot in rates {
            let prior = store.band(&snapshot.symbol);
            let (band, alert) = evaluate(snapshot, thresholds, prior);
            if band == prior {
                continue;
            }
            if !store.compare_and_swap(&snapshot.symbol, prior, band) {
                debug!(symbol = %snapshot.symbol, "band changed concurrently, leaving it to the other writer");
                continue;
            }
            debug!(symbol = %snapshot.symbol, from = prior.as_str(), to = band.as_str(), "band transition");
            if let Some(alert) = alert {
                info!(
                    symbol = %alert.symbol,
                    rate = alert.rate,
                    direction = alert.direction.as_str(),
                    "threshold crossed"
                );
                alerts.push(alert);
            }
        }
        alerts
    }

    async fn dispatch(&self, alerts: &[AlertEvent]) -> (usize, usize) {
        if alerts.is_empty() {
            return (0, 0);
        }
        let chats = self.ctx.subscribers().await;
        if chats.is_empty() {
            warn!(alerts = alerts.len(), "no subscribed chats, alerts not delivered");
            return (0, 0);
        }

        let mut delivered = 0;
        let mut failed = 0;
        for alert in alerts {
            let text = alert_message(alert);
            for &chat_id in &chats {
                match self.notifier.send(chat_id, &text).await {
                    Ok(()) => delivered += 1,
                    Err(e) => {
                        warn!(chat_id, symbol = %alert.symbol, error = %e, "alert delivery failed");
                        failed += 1;
                    }
                }
            }
        }
        (delivered, failed)
    }

    /// Tick forever. The interval is re-read after every tick, and turning
    /// monitoring on cuts the current wait short.
    pub async fn run(&self) {
        info!("monitor loop started");
        loop {
            self.tick().await;
            let interval = self.ctx.settings().await.check_interval;
            tokio::select! {
                _ = sleep(interval) => {}
                _ = self.ctx.woken() => debug!("monitor loop woken"),
            }
        }
    }
}
