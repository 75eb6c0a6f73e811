//! Funding-rate threshold alerts with per-symbol hysteresis.

pub mod engine;
pub mod store;
pub mod types;

pub use engine::evaluate;
pub use store::{AlertState, AlertStore, InMemoryAlertStore};
pub use types::{AlertEvent, Band, Direction, RateSnapshot, ThresholdConfig};
