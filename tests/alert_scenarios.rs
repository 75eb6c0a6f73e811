//! Threshold crossing sequences run through the pure engine and the
//! per-symbol band store.

use chrono::Utc;

use fundwatch::alert::{evaluate, AlertStore, Band, Direction, InMemoryAlertStore, RateSnapshot, ThresholdConfig};

fn thresholds() -> ThresholdConfig {
    ThresholdConfig::from_percent(0.6, -1.0)
}

/// Feed each rate through the engine and record the band, as one tick would.
fn run(store: &InMemoryAlertStore, symbol: &str, rates: &[f64]) -> Vec<Option<Direction>> {
    rates
        .iter()
        .map(|&r| {
            let snap = RateSnapshot::new(symbol, r, Utc::now());
            let prior = store.band(symbol);
            let (band, alert) = evaluate(&snap, &thresholds(), prior);
            assert!(store.compare_and_swap(symbol, prior, band));
            alert.map(|a| a.direction)
        })
        .collect()
}

#[test]
fn btc_sequence_alerts_on_entry_only() {
    let state = InMemoryAlertStore::new();
    let fired = run(&state, "BTCUSDT", &[0.004, 0.007, 0.007, 0.003, -0.012]);
    assert_eq!(fired, vec![None, Some(Direction::Above), None, None, Some(Direction::Below)]);
    assert_eq!(state.band("BTCUSDT"), Band::BelowLower);
}

#[test]
fn round_trip_through_both_extremes_fires_twice() {
    let state = InMemoryAlertStore::new();
    let fired = run(&state, "ETHUSDT", &[0.0, 0.01, 0.0, -0.02, 0.0]);
    assert_eq!(fired.iter().flatten().count(), 2);
    assert_eq!(state.band("ETHUSDT"), Band::Normal);
}

#[test]
fn direct_flip_between_extremes_fires_new_alert() {
    let state = InMemoryAlertStore::new();
    let fired = run(&state, "SOLUSDT", &[0.008, -0.015, 0.009]);
    assert_eq!(fired, vec![Some(Direction::Above), Some(Direction::Below), Some(Direction::Above)]);
}

#[test]
fn exact_threshold_counts_as_crossed() {
    let t = thresholds();
    let (band, alert) = evaluate(&RateSnapshot::new("X", t.upper, Utc::now()), &t, Band::Normal);
    assert_eq!(band, Band::AboveUpper);
    assert!(alert.is_some());
    let (band, _) = evaluate(&RateSnapshot::new("X", t.lower, Utc::now()), &t, Band::Normal);
    assert_eq!(band, Band::BelowLower);
}

#[test]
fn repeated_evaluation_is_idempotent() {
    let t = thresholds();
    let snap = RateSnapshot::new("BTCUSDT", 0.007, Utc::now());
    let (band, first) = evaluate(&snap, &t, Band::Normal);
    let (again, second) = evaluate(&snap, &t, band);
    assert!(first.is_some());
    assert!(second.is_none());
    assert_eq!(band, again);
}

#[test]
fn symbols_are_tracked_independently() {
    let state = InMemoryAlertStore::new();
    assert_eq!(run(&state, "BTCUSDT", &[0.007]), vec![Some(Direction::Above)]);
    assert_eq!(run(&state, "ETHUSDT", &[0.007]), vec![Some(Direction::Above)]);
    assert_eq!(state.active_count(), 2);
}

#[test]
fn store_compare_and_swap_rejects_stale_writer() {
    let store = InMemoryAlertStore::new();
    assert!(store.compare_and_swap("BTCUSDT", Band::Normal, Band::AboveUpper));
    // a second writer that read NORMAL earlier loses
    assert!(!store.compare_and_swap("BTCUSDT", Band::Normal, Band::AboveUpper));
    assert_eq!(store.band("BTCUSDT"), Band::AboveUpper);
    assert_eq!(store.active(), vec![("BTCUSDT".to_string(), Band::AboveUpper)]);
    store.clear();
    assert_eq!(store.active_count(), 0);
}
