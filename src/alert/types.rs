use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One funding-rate observation for a single perpetual contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub symbol: String,
    /// Signed fraction, 0.006 = 0.6%.
    pub rate: f64,
    pub mark_price: f64,
    /// Exchange timestamp (ms) of the next funding settlement.
    pub next_funding_time: u64,
    pub observed_at: DateTime<Utc>,
}

impl RateSnapshot {
    pub fn new(symbol: impl Into<String>, rate: f64, observed_at: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            rate,
            mark_price: 0.0,
            next_funding_time: 0,
            observed_at,
        }
    }
}

/// Alert bounds, stored as fractions.
///
/// `upper > 0 > lower` is expected but only enforced by whoever builds the
/// config (see `Config::validate` and the settings command).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub upper: f64,
    pub lower: f64,
}

impl ThresholdConfig {
    pub fn new(upper: f64, lower: f64) -> Self {
        Self { upper, lower }
    }

    /// Build from percent values as operators type them (0.6 = 0.6%).
    pub fn from_percent(upper_pct: f64, lower_pct: f64) -> Self {
        Self {
            upper: upper_pct / 100.0,
            lower: lower_pct / 100.0,
        }
    }

    pub fn upper_pct(&self) -> f64 {
        self.upper * 100.0
    }

    pub fn lower_pct(&self) -> f64 {
        self.lower * 100.0
    }

    /// Inclusive on both bounds; upper wins if the bounds overlap.
    /// Non-finite rates are NORMAL so bad data never pages anyone.
    pub fn classify(&self, rate: f64) -> Band {
        if !rate.is_finite() {
            return Band::Normal;
        }
        if rate >= self.upper {
            Band::AboveUpper
        } else if rate <= self.lower {
            Band::BelowLower
        } else {
            Band::Normal
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self::from_percent(0.6, -1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    #[default]
    Normal,
    AboveUpper,
    BelowLower,
}

impl Band {
    pub fn is_normal(&self) -> bool {
        matches!(self, Band::Normal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Normal => "normal",
            Band::AboveUpper => "above_upper",
            Band::BelowLower => "below_lower",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Above,
    Below,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Above => "above",
            Direction::Below => "below",
        }
    }
}

/// Emitted once when a symbol enters a non-normal band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub symbol: String,
    pub rate: f64,
    pub direction: Direction,
    /// The bound that was crossed, as a fraction.
    pub threshold: f64,
    pub mark_price: f64,
    pub ts: DateTime<Utc>,
}
