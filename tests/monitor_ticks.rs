//! Monitor ticks and chat commands against scripted fakes.

mod common;

use std::sync::Arc;
use std::time::Duration;

use fundwatch::alert::Band;
use fundwatch::bot::{dispatch, Command, CommandHandler, SettingsCommand};
use fundwatch::monitor::{Monitor, TickOutcome};
use fundwatch::telegram::Update;

use common::{context, snap, RecordingNotifier, ScriptedSource};

fn completed(outcome: &TickOutcome) -> &fundwatch::monitor::TickReport {
    match outcome {
        TickOutcome::Completed(report) => report,
        other => panic!("expected a completed tick, got {:?}", other),
    }
}

#[tokio::test]
async fn btc_sequence_sends_two_alerts() {
    let ctx = context();
    ctx.subscribe(1).await;
    ctx.start_monitoring();
    let batches = [0.004, 0.007, 0.007, 0.003, -0.012]
        .iter()
        .map(|&r| Some(vec![snap("BTCUSDT", r)]))
        .collect();
    let source = ScriptedSource::new(batches);
    let notifier = RecordingNotifier::new();
    let monitor = Monitor::new(ctx.clone(), source, notifier.clone());

    let mut per_tick = Vec::new();
    for _ in 0..5 {
        per_tick.push(monitor.tick().await.alerts().len());
    }
    assert_eq!(per_tick, vec![0, 1, 0, 0, 1]);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].1.contains("BTCUSDT"));
    assert!(sent[0].1.contains("+0.7000%"));
    assert!(sent[1].1.contains("-1.2000%"));
    assert_eq!(ctx.alerts().band("BTCUSDT"), Band::BelowLower);
}

#[tokio::test]
async fn failed_fetch_leaves_bands_untouched() {
    let ctx = context();
    ctx.subscribe(1).await;
    ctx.start_monitoring();
    let source = ScriptedSource::new(vec![Some(vec![snap("BTCUSDT", 0.007)]), None]);
    let notifier = RecordingNotifier::new();
    let monitor = Monitor::new(ctx.clone(), source, notifier.clone());

    assert_eq!(monitor.tick().await.alerts().len(), 1);
    let outcome = monitor.tick().await;
    assert!(matches!(outcome, TickOutcome::Skipped { .. }));
    assert_eq!(ctx.alerts().band("BTCUSDT"), Band::AboveUpper);
    assert_eq!(notifier.sent().len(), 1);
    // the last good batch is still what commands see
    assert_eq!(ctx.tracked_symbols().await, 1);
}

#[tokio::test]
async fn paused_tick_does_not_fetch() {
    let ctx = context();
    let source = ScriptedSource::new(vec![Some(vec![snap("BTCUSDT", 0.007)])]);
    let monitor = Monitor::new(ctx.clone(), source.clone(), RecordingNotifier::new());

    assert!(matches!(monitor.tick().await, TickOutcome::Paused));
    assert_eq!(source.calls(), 0);
    assert_eq!(ctx.alerts().active_count(), 0);
}

#[tokio::test]
async fn delivery_failure_is_counted_not_raised() {
    let ctx = context();
    ctx.subscribe(1).await;
    ctx.subscribe(2).await;
    ctx.start_monitoring();
    let source = ScriptedSource::new(vec![Some(vec![snap("DOGEUSDT", -0.02)])]);
    let notifier = RecordingNotifier::failing_for(&[2]);
    let monitor = Monitor::new(ctx.clone(), source, notifier.clone());

    let outcome = monitor.tick().await;
    let report = completed(&outcome);
    assert_eq!(report.alerts.len(), 1);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 1);
    // the crossing is recorded even though one chat missed it
    assert_eq!(ctx.alerts().band("DOGEUSDT"), Band::BelowLower);
}

#[tokio::test]
async fn empty_batch_completes_with_nothing_checked() {
    let ctx = context();
    ctx.start_monitoring();
    let monitor = Monitor::new(ctx, ScriptedSource::new(vec![Some(vec![])]), RecordingNotifier::new());
    let outcome = monitor.tick().await;
    assert_eq!(completed(&outcome).checked, 0);
}

#[tokio::test]
async fn threshold_change_applies_next_tick_without_reset() {
    let ctx = context();
    ctx.subscribe(1).await;
    ctx.start_monitoring();
    let source = ScriptedSource::new(vec![
        Some(vec![snap("BTCUSDT", 0.007)]),
        Some(vec![snap("BTCUSDT", 0.007)]),
    ]);
    let monitor = Monitor::new(ctx.clone(), source, RecordingNotifier::new());

    assert_eq!(monitor.tick().await.alerts().len(), 1);
    ctx.set_upper_pct(0.5).await.unwrap();
    // still above the (lower) upper bound: no repeat alert
    assert_eq!(monitor.tick().await.alerts().len(), 0);
}

fn handler(batches: Vec<Option<Vec<fundwatch::alert::RateSnapshot>>>) -> (Arc<fundwatch::context::AppContext>, CommandHandler) {
    let ctx = context();
    let handler = CommandHandler::new(ctx.clone(), ScriptedSource::new(batches));
    (ctx, handler)
}

#[tokio::test]
async fn rates_fetches_on_demand_and_finds_symbol() {
    let (ctx, handler) = handler(vec![Some(vec![snap("BTCUSDT", 0.0001), snap("ETHUSDT", -0.0003)])]);

    let reply = handler.handle(9, Command::Rates { symbol: None }).await;
    assert!(reply.text.contains("BTCUSDT"));
    assert!(reply.text.contains("ETHUSDT"));
    // the refresh fails (one scripted batch), so the cached batch answers
    let reply = handler.handle(9, Command::Rates { symbol: Some("ETHUSDT".into()) }).await;
    assert!(reply.text.contains("-0.0300%"));
    let reply = handler.handle(9, Command::Rates { symbol: Some("XYZUSDT".into()) }).await;
    assert_eq!(reply.text, "❌ Could not find funding rate for XYZUSDT");

    // on-demand fetches never touch alert bands
    assert_eq!(ctx.alerts().active_count(), 0);
    assert_eq!(ctx.subscribers().await, vec![9]);
}

#[tokio::test]
async fn rates_refetch_while_monitoring_is_off() {
    let source = ScriptedSource::new(vec![
        Some(vec![snap("BTCUSDT", 0.0001)]),
        Some(vec![snap("BTCUSDT", 0.0099)]),
    ]);
    let ctx = context();
    let handler = CommandHandler::new(ctx.clone(), source.clone());

    let first = handler.handle(1, Command::Rates { symbol: Some("BTCUSDT".into()) }).await;
    assert!(first.text.contains("+0.0100%"));
    let second = handler.handle(1, Command::Rates { symbol: Some("BTCUSDT".into()) }).await;
    assert!(second.text.contains("+0.9900%"));
    assert_eq!(source.calls(), 2);
    // fresh rates for a command never raise alerts
    assert_eq!(ctx.alerts().active_count(), 0);
}

#[tokio::test]
async fn rates_reuse_fresh_batch_while_monitoring() {
    let source = ScriptedSource::new(vec![]);
    let ctx = context();
    ctx.start_monitoring();
    ctx.store_batch(vec![snap("BTCUSDT", 0.0002)]).await;
    let handler = CommandHandler::new(ctx, source.clone());

    let reply = handler.handle(1, Command::Top { limit: 3 }).await;
    assert!(reply.text.contains("BTCUSDT"));
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn rates_reports_fetch_failure() {
    let (_, handler) = handler(vec![None]);
    let reply = handler.handle(1, Command::Top { limit: 5 }).await;
    assert!(reply.text.starts_with("❌ Error fetching funding rates"));
}

#[tokio::test]
async fn monitor_and_stop_report_redundant_toggles() {
    let (ctx, handler) = handler(vec![]);
    let first = handler.handle(1, Command::Monitor).await;
    assert!(first.text.contains("Monitoring Started"));
    assert_eq!(first.keyboard[0][0].callback_data, "stop_monitoring");
    let again = handler.handle(1, Command::Monitor).await;
    assert_eq!(again.text, "🟢 Monitoring is already active!");
    assert!(ctx.is_monitoring());

    assert!(handler.handle(1, Command::Stop).await.text.contains("Monitoring Stopped"));
    assert_eq!(handler.handle(1, Command::Stop).await.text, "🔴 Monitoring is not active.");
}

#[tokio::test]
async fn settings_changes_are_validated() {
    let (ctx, handler) = handler(vec![]);
    let ok = handler.handle(1, Command::Settings(SettingsCommand::Upper(0.8))).await;
    assert!(ok.text.starts_with("✅"));
    assert!(ok.text.contains("0.8%"));

    let bad = handler.handle(1, Command::Settings(SettingsCommand::Lower(1.0))).await;
    assert!(bad.text.starts_with("❌"));
    let short = handler.handle(1, Command::Settings(SettingsCommand::Interval(10))).await;
    assert!(short.text.starts_with("❌"));

    let s = ctx.settings().await;
    assert!((s.thresholds.upper - 0.008).abs() < 1e-12);
    assert!((s.thresholds.lower + 0.01).abs() < 1e-12);
}

#[tokio::test]
async fn replies_escape_markdown_in_echoed_text() {
    let (_, handler) = handler(vec![Some(vec![snap("BTCUSDT", 0.0001)])]);

    let reply = handler.handle(1, Command::Settings(SettingsCommand::Interval(10))).await;
    assert_eq!(reply.text, "❌ CHECK\\_INTERVAL must be at least 60 seconds, got 10");

    let reply = handler.handle(1, Command::Rates { symbol: Some("BTC_USDT".into()) }).await;
    assert_eq!(reply.text, "❌ Could not find funding rate for BTC\\_USDT");

    let reply = handler.handle(1, Command::Unknown("do_it".into())).await;
    assert!(reply.text.contains("/do\\_it"));
}

#[tokio::test]
async fn settings_reset_clears_bands() {
    let (ctx, handler) = handler(vec![]);
    ctx.alerts().compare_and_swap("BTCUSDT", Band::Normal, Band::AboveUpper);
    let reply = handler.handle(1, Command::Settings(SettingsCommand::Reset)).await;
    assert_eq!(reply.text, "✅ Alert history reset!");
    assert_eq!(ctx.alerts().active_count(), 0);
}

#[tokio::test]
async fn unknown_command_points_to_help() {
    let (_, handler) = handler(vec![]);
    let reply = handler.handle(1, Command::Unknown("launch".into())).await;
    assert!(reply.text.contains("/help"));
}

#[tokio::test]
async fn dispatch_acknowledges_callback_and_replies_to_chat() {
    let (ctx, handler) = handler(vec![]);
    let notifier = RecordingNotifier::new();
    let update: Update = serde_json::from_value(serde_json::json!({
        "update_id": 3,
        "callback_query": {
            "id": "cb-1",
            "from": {"id": 77},
            "message": {"message_id": 1, "chat": {"id": 500}},
            "data": "start_monitoring"
        }
    }))
    .unwrap();

    dispatch(&handler, notifier.as_ref(), &update).await;

    assert_eq!(*notifier.acks.lock().unwrap(), vec!["cb-1".to_string()]);
    let replies = notifier.replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].0, 500);
    assert!(ctx.is_monitoring());
    assert_eq!(ctx.subscribers().await, vec![500]);
}

#[tokio::test]
async fn dispatch_ignores_plain_chat_text() {
    let (_, handler) = handler(vec![]);
    let notifier = RecordingNotifier::new();
    let update: Update = serde_json::from_value(serde_json::json!({
        "update_id": 4,
        "message": {"message_id": 2, "chat": {"id": 500}, "text": "gm"}
    }))
    .unwrap();
    dispatch(&handler, notifier.as_ref(), &update).await;
    assert!(notifier.replies().is_empty());
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn run_loop_wakes_on_start_and_rereads_interval() {
    let ctx = context();
    let source = ScriptedSource::new(vec![]);
    let monitor = Arc::new(Monitor::new(ctx.clone(), source.clone(), RecordingNotifier::new()));
    let task = tokio::spawn({
        let monitor = monitor.clone();
        async move { monitor.run().await }
    });

    // paused ticks never fetch
    settle().await;
    tokio::time::advance(Duration::from_secs(300)).await;
    settle().await;
    assert_eq!(source.calls(), 0);

    // starting cuts the wait short
    ctx.start_monitoring();
    settle().await;
    assert_eq!(source.calls(), 1);

    tokio::time::advance(Duration::from_secs(299)).await;
    settle().await;
    assert_eq!(source.calls(), 1);
    tokio::time::advance(Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(source.calls(), 2);

    // a shorter interval applies once the current 300 s wait ends
    ctx.set_check_interval(60).await.unwrap();
    tokio::time::advance(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(source.calls(), 2);
    tokio::time::advance(Duration::from_secs(240)).await;
    settle().await;
    assert_eq!(source.calls(), 3);
    tokio::time::advance(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(source.calls(), 4);

    ctx.stop_monitoring();
    tokio::time::advance(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(source.calls(), 4);

    task.abort();
}
