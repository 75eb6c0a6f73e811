//! Telegram Markdown renderings of alerts, rate lists and settings.

use chrono::{DateTime, Utc};

use crate::alert::{AlertEvent, Direction, RateSnapshot, ThresholdConfig};
use crate::context::Settings;

pub const MAX_MESSAGE_LEN: usize = 4096;

/// Rates at or beyond this magnitude (fraction) get an amber marker in lists.
const ELEVATED: f64 = 0.003;

/// Percent with trailing zeros trimmed: 0.006 -> "0.6%", -0.01 -> "-1%".
pub fn pct(fraction: f64) -> String {
    let s = format!("{:.4}", fraction * 100.0);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    let s = if s == "-0" { "0" } else { s };
    format!("{}%", s)
}

/// Signed percent with four decimals, as rates are shown everywhere.
pub fn signed_pct(fraction: f64) -> String {
    format!("{:+.4}%", fraction * 100.0)
}

fn who_pays(rate: f64) -> &'static str {
    if rate > 0.0 {
        "📈 Long positions paying shorts"
    } else {
        "📉 Short positions paying longs"
    }
}

pub fn interval_label(secs: u64) -> String {
    if secs % 60 == 0 {
        format!("{} minutes", secs / 60)
    } else {
        format!("{} seconds", secs)
    }
}

pub fn alert_message(alert: &AlertEvent) -> String {
    let emoji = match alert.direction {
        Direction::Above => "🔴",
        Direction::Below => "🟢",
    };
    format!(
        "{e} *FUNDING RATE ALERT* {e}\n\n\
         *Symbol:* `{symbol}`\n\
         *Rate:* *{rate}*\n\
         *Threshold:* {dir} {threshold}\n\
         *Mark Price:* ${mark:.4}\n\
         *Time:* {time} UTC\n\n\
         {pays}",
        e = emoji,
        symbol = alert.symbol,
        rate = signed_pct(alert.rate),
        dir = alert.direction.as_str(),
        threshold = pct(alert.threshold),
        mark = alert.mark_price,
        time = alert.ts.format("%Y-%m-%d %H:%M:%S"),
        pays = who_pays(alert.rate),
    )
}

fn indicator(rate: f64, thresholds: &ThresholdConfig) -> &'static str {
    if rate >= thresholds.upper {
        "🔴"
    } else if rate <= thresholds.lower {
        "🟢"
    } else if rate >= ELEVATED {
        "🟠"
    } else if rate <= -ELEVATED {
        "🟡"
    } else {
        "⚪"
    }
}

pub fn rates_summary(rates: &[RateSnapshot], thresholds: &ThresholdConfig, fetched_at: DateTime<Utc>) -> String {
    if rates.is_empty() {
        return "❌ No funding rates available".to_string();
    }
    let mut msg = format!("*📊 Current Funding Rates* ({} shown)\n\n", rates.len());
    for r in rates {
        msg.push_str(&format!(
            "{} `{}`: *{}*\n",
            indicator(r.rate, thresholds),
            r.symbol,
            signed_pct(r.rate)
        ));
    }
    msg.push_str(&format!("\n_Updated: {} UTC_", fetched_at.format("%Y-%m-%d %H:%M:%S")));
    msg
}

pub fn single_rate(rate: &RateSnapshot) -> String {
    let pays = if rate.rate > 0.0 { "📈 Longs pay shorts" } else { "📉 Shorts pay longs" };
    format!(
        "*📊 {symbol} Funding Rate*\n\n\
         *Rate:* *{rate}*\n\
         *Mark Price:* ${mark:.4}\n\
         *Updated:* {time} UTC\n\n\
         {pays}",
        symbol = escape_markdown(&rate.symbol),
        rate = signed_pct(rate.rate),
        mark = rate.mark_price,
        time = rate.observed_at.format("%Y-%m-%d %H:%M:%S"),
        pays = pays,
    )
}

/// Highest `limit` descending, then lowest `limit` ascending.
pub fn top_rates(rates: &[RateSnapshot], limit: usize) -> String {
    if rates.is_empty() {
        return "❌ No funding rates available".to_string();
    }
    let mut sorted: Vec<&RateSnapshot> = rates.iter().collect();
    sorted.sort_by(|a, b| b.rate.total_cmp(&a.rate));

    let mut msg = format!("*🔝 Top {} Highest Rates:*\n", limit);
    for (i, r) in sorted.iter().take(limit).enumerate() {
        msg.push_str(&format!("{}. `{}`: *{}*\n", i + 1, r.symbol, signed_pct(r.rate)));
    }
    msg.push_str(&format!("\n*🔻 Top {} Lowest Rates:*\n", limit));
    for (i, r) in sorted.iter().rev().take(limit).enumerate() {
        msg.push_str(&format!("{}. `{}`: *{}*\n", i + 1, r.symbol, signed_pct(r.rate)));
    }
    msg
}

pub fn settings_text(settings: &Settings) -> String {
    format!(
        "⚙️ *Current Settings*\n\n\
         • High Alert: *{}*\n\
         • Low Alert: *{}*\n\
         • Check Interval: *{}*\n\n\
         Adjust with:\n\
         `/settings upper <percent>`\n\
         `/settings lower <percent>`\n\
         `/settings interval <seconds>`\n\
         `/settings reset` - forget active alerts",
        pct(settings.thresholds.upper),
        pct(settings.thresholds.lower),
        interval_label(settings.check_interval.as_secs()),
    )
}

pub fn welcome_text(settings: &Settings) -> String {
    format!(
        "🚀 *Binance Funding Rate Monitor Bot* 🚀\n\n\
         I'll monitor funding rates across all Binance futures and alert you \
         when rates hit {} or {}\n\n\
         *Available Commands:*\n\
         • /monitor - Start monitoring funding rates\n\
         • /stop - Stop monitoring\n\
         • /status - Check monitoring status\n\
         • /rates - Show current funding rates\n\
         • /top - Show highest/lowest rates\n\
         • /settings - Configure alert thresholds\n\
         • /help - Show this help message\n\n\
         Use /monitor to get started!",
        pct(settings.thresholds.upper),
        pct(settings.thresholds.lower),
    )
}

pub fn help_text(settings: &Settings) -> String {
    format!(
        "*📖 Funding Rate Bot Help*\n\n\
         *Commands:*\n\
         • `/monitor` - Start monitoring funding rates\n\
         • `/stop` - Stop monitoring\n\
         • `/status` - Check current monitoring status\n\
         • `/rates [symbol]` - Show funding rates (optionally for one symbol)\n\
         • `/top [n]` - Show top N highest/lowest rates (default: 10)\n\
         • `/settings` - Show or change alert thresholds\n\n\
         *Current Thresholds:*\n\
         • High Alert: ≥ {}\n\
         • Low Alert: ≤ {}\n\n\
         *About Funding Rates:*\n\
         Funding rates are periodic payments between traders. \
         High positive rates mean long positions pay shorts, \
         while negative rates mean shorts pay longs.\n\n\
         Monitoring checks rates every {}.",
        pct(settings.thresholds.upper),
        pct(settings.thresholds.lower),
        interval_label(settings.check_interval.as_secs()),
    )
}

pub fn status_text(monitoring: bool, settings: &Settings, tracked: usize, active_alerts: usize) -> String {
    if monitoring {
        format!(
            "🟢 *Actively Monitoring*\n\n\
             • Check interval: {}\n\
             • Thresholds: {} / {}\n\
             • Tracked symbols: {}\n\
             • Active alerts: {}",
            interval_label(settings.check_interval.as_secs()),
            pct(settings.thresholds.upper),
            pct(settings.thresholds.lower),
            tracked,
            active_alerts,
        )
    } else {
        "🔴 *Not Monitoring*\n\nUse /monitor to start monitoring funding rates.".to_string()
    }
}

/// Escape user-supplied or error text for legacy Markdown, where a lone
/// `_` or `*` makes Telegram reject the whole message.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Clip to Telegram's message limit on a char boundary.
pub fn truncate(text: &str) -> &str {
    if text.len() <= MAX_MESSAGE_LEN {
        return text;
    }
    let mut end = MAX_MESSAGE_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
