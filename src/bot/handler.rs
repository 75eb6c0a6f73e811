use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::bot::command::{Command, SettingsCommand};
use crate::context::{AppContext, RateBatch, Settings};
use crate::exchange::{RateSource, SourceError};
use crate::notify::format;
use crate::notify::{Button, Reply};
use crate::telegram::Update;

/// Rows shown by `/rates` without a symbol.
const RATES_SHOWN: usize = 20;

const FETCH_FAILED: &str = "❌ Error fetching funding rates. Please try again later.";

/// Turns commands into replies against the shared context.
pub struct CommandHandler {
    ctx: Arc<AppContext>,
    source: Arc<dyn RateSource>,
}

impl CommandHandler {
    pub fn new(ctx: Arc<AppContext>, source: Arc<dyn RateSource>) -> Self {
        Self { ctx, source }
    }

    /// Run the command carried by a Telegram update, if there is one.
    pub async fn handle_update(&self, update: &Update) -> Option<(i64, Reply)> {
        let chat_id = update.chat_id()?;
        let command = match (&update.callback_query, &update.message) {
            (Some(query), _) => query.data.as_deref().and_then(Command::from_callback)?,
            (None, Some(msg)) => msg.text.as_deref().and_then(Command::parse)?,
            (None, None) => return None,
        };
        Some((chat_id, self.handle(chat_id, command).await))
    }

    /// Any chat that talks to the bot is subscribed to alerts.
    pub async fn handle(&self, chat_id: i64, command: Command) -> Reply {
        self.ctx.subscribe(chat_id).await;
        info!(chat_id, command = command.name(), "command received");

        match command {
            Command::Start => {
                let settings = self.ctx.settings().await;
                Reply::text(format::welcome_text(&settings))
                    .with_row(vec![Button::new("🟢 Start Monitoring", "start_monitoring")])
                    .with_row(vec![Button::new("📊 Show Current Rates", "show_rates")])
                    .with_row(vec![Button::new("⚙️ Settings", "settings")])
            }
            Command::Help => Reply::text(format::help_text(&self.ctx.settings().await)),
            Command::Monitor => self.monitor().await,
            Command::Stop => self.stop(),
            Command::Status => self.status().await,
            Command::Rates { symbol } => self.rates(symbol).await,
            Command::Top { limit } => self.top(limit).await,
            Command::Settings(cmd) => self.settings(cmd).await,
            Command::Unknown(name) => Reply::text(format!(
                "❓ Unknown command /{}. Use /help to see what I can do.",
                format::escape_markdown(&name)
            )),
        }
    }

    async fn monitor(&self) -> Reply {
        if !self.ctx.start_monitoring() {
            return Reply::text("🟢 Monitoring is already active!");
        }
        let s = self.ctx.settings().await;
        Reply::text(format!(
            "🟢 *Monitoring Started!*\n\n\
             • Checking rates every {}\n\
             • High alert threshold: *{}*\n\
             • Low alert threshold: *{}*\n\n\
             You'll receive alerts when funding rates cross these thresholds.",
            format::interval_label(s.check_interval.as_secs()),
            format::pct(s.thresholds.upper),
            format::pct(s.thresholds.lower),
        ))
        .with_row(vec![Button::new("🔴 Stop Monitoring", "stop_monitoring")])
    }

    fn stop(&self) -> Reply {
        if !self.ctx.stop_monitoring() {
            return Reply::text("🔴 Monitoring is not active.");
        }
        Reply::text("🔴 *Monitoring Stopped*\n\nYou will no longer receive funding rate alerts.")
            .with_row(vec![Button::new("🟢 Start Monitoring", "start_monitoring")])
    }

    async fn status(&self) -> Reply {
        let monitoring = self.ctx.is_monitoring();
        let settings = self.ctx.settings().await;
        let tracked = self.ctx.tracked_symbols().await;
        let active = self.ctx.alerts().active_count();
        let toggle = if monitoring {
            Button::new("🔴 Stop", "stop_monitoring")
        } else {
            Button::new("🟢 Start", "start_monitoring")
        };
        Reply::text(format::status_text(monitoring, &settings, tracked, active))
            .with_row(vec![toggle])
            .with_row(vec![Button::new("📊 Current Rates", "show_rates")])
    }

    /// Cached batch while the monitor keeps it current, otherwise a fresh
    /// fetch. A fetched batch is cached but never evaluated for alerts. If
    /// the fetch fails, a stale batch beats no answer.
    async fn batch(&self) -> Result<RateBatch, SourceError> {
        let max_age = self.ctx.settings().await.check_interval;
        let cached = self.ctx.latest().await;
        if let Some(batch) = &cached {
            if self.ctx.is_monitoring() && batch_age(batch) <= max_age {
                return Ok(batch.clone());
            }
        }
        match self.source.fetch_rates().await {
            Ok(rates) => {
                self.ctx.store_batch(rates.clone()).await;
                Ok(self.ctx.latest().await.unwrap_or(RateBatch {
                    fetched_at: Utc::now(),
                    rates,
                }))
            }
            Err(e) => match cached {
                Some(stale) => {
                    warn!(error = %e, fetched_at = %stale.fetched_at, "refresh failed, serving cached rates");
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }

    async fn rates(&self, symbol: Option<String>) -> Reply {
        let batch = match self.batch().await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "rates command could not fetch");
                return Reply::text(FETCH_FAILED);
            }
        };
        match symbol {
            Some(symbol) => match batch.rates.iter().find(|r| r.symbol == symbol) {
                Some(rate) => Reply::text(format::single_rate(rate)),
                None => Reply::text(format!(
                    "❌ Could not find funding rate for {}",
                    format::escape_markdown(&symbol)
                )),
            },
            None => {
                let thresholds = self.ctx.settings().await.thresholds;
                let shown = &batch.rates[..batch.rates.len().min(RATES_SHOWN)];
                Reply::text(format::rates_summary(shown, &thresholds, batch.fetched_at))
            }
        }
    }

    async fn top(&self, limit: usize) -> Reply {
        match self.batch().await {
            Ok(batch) => Reply::text(format::top_rates(&batch.rates, limit)),
            Err(e) => {
                warn!(error = %e, "top command could not fetch");
                Reply::text(FETCH_FAILED)
            }
        }
    }

    async fn settings(&self, cmd: SettingsCommand) -> Reply {
        let updated = match cmd {
            SettingsCommand::Show => {
                let settings = self.ctx.settings().await;
                return Reply::text(format::settings_text(&settings))
                    .with_row(vec![Button::new("🔄 Reset Alerts", "reset_alerts")]);
            }
            SettingsCommand::Reset => {
                self.ctx.reset_alerts();
                return Reply::text("✅ Alert history reset!");
            }
            SettingsCommand::Usage => {
                return Reply::text(
                    "Usage:\n\
                     `/settings upper <percent>`\n\
                     `/settings lower <percent>`\n\
                     `/settings interval <seconds>`\n\
                     `/settings reset`",
                );
            }
            SettingsCommand::Upper(v) => self.ctx.set_upper_pct(v).await,
            SettingsCommand::Lower(v) => self.ctx.set_lower_pct(v).await,
            // the running wait finishes first; the new interval starts after it
            SettingsCommand::Interval(secs) => self.ctx.set_check_interval(secs).await,
        };
        match updated {
            Ok(settings) => Reply::text(format!("✅ Settings updated\n\n{}", summary(&settings))),
            Err(e) => Reply::text(format!("❌ {}", format::escape_markdown(&e.to_string()))),
        }
    }
}

fn batch_age(batch: &RateBatch) -> Duration {
    (Utc::now() - batch.fetched_at).to_std().unwrap_or_default()
}

fn summary(settings: &Settings) -> String {
    format!(
        "• High Alert: *{}*\n• Low Alert: *{}*\n• Check Interval: *{}*",
        format::pct(settings.thresholds.upper),
        format::pct(settings.thresholds.lower),
        format::interval_label(settings.check_interval.as_secs()),
    )
}
