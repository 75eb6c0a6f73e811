//! Threshold-crossing decision: (snapshot, thresholds, prior band) -> (band, alert).
//!
//! Pure and total. An alert fires only on the transition into a non-normal
//! band; holding a band is silent, and so is returning to normal. A direct
//! flip between the two extremes is a new condition and fires again.

use super::types::{AlertEvent, Band, Direction, RateSnapshot, ThresholdConfig};

pub fn evaluate(
    snapshot: &RateSnapshot,
    config: &ThresholdConfig,
    prior: Band,
) -> (Band, Option<AlertEvent>) {
    let band = config.classify(snapshot.rate);
    if band == prior {
        return (prior, None);
    }

    let alert = match band {
        Band::Normal => None,
        Band::AboveUpper => Some(alert_for(snapshot, Direction::Above, config.upper)),
        Band::BelowLower => Some(alert_for(snapshot, Direction::Below, config.lower)),
    };
    (band, alert)
}

fn alert_for(snapshot: &RateSnapshot, direction: Direction, threshold: f64) -> AlertEvent {
    AlertEvent {
        symbol: snapshot.symbol.clone(),
        rate: snapshot.rate,
        direction,
        threshold,
        mark_price: snapshot.mark_price,
        ts: snapshot.observed_at,
    }
}
