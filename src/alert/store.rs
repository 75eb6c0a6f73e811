use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::types::Band;

/// Per-symbol band map. Symbols that are NORMAL are not stored, so an unseen
/// symbol and a symbol back inside the band look the same.
#[derive(Debug, Clone, Default)]
pub struct AlertState {
    bands: HashMap<String, Band>,
}

impl AlertState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn band(&self, symbol: &str) -> Band {
        self.bands.get(symbol).copied().unwrap_or_default()
    }

    pub fn set(&mut self, symbol: &str, band: Band) {
        if band.is_normal() {
            self.bands.remove(symbol);
        } else {
            self.bands.insert(symbol.to_string(), band);
        }
    }

    pub fn active_count(&self) -> usize {
        self.bands.len()
    }

    pub fn active(&self) -> Vec<(String, Band)> {
        let mut out: Vec<_> = self.bands.iter().map(|(s, b)| (s.clone(), *b)).collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn clear(&mut self) {
        self.bands.clear();
    }
}

/// Where the driver keeps alert bands between ticks.
///
/// A shared external store must make `compare_and_swap` atomic per symbol;
/// that is what keeps one alert per crossing across instances.
pub trait AlertStore: Send + Sync {
    fn band(&self, symbol: &str) -> Band;

    /// Set `symbol` to `new` only if it is currently `expected`.
    fn compare_and_swap(&self, symbol: &str, expected: Band, new: Band) -> bool;

    /// Non-normal symbols, sorted by symbol.
    fn active(&self) -> Vec<(String, Band)>;

    fn clear(&self);

    fn active_count(&self) -> usize {
        self.active().len()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAlertStore {
    state: Mutex<AlertState>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut AlertState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

impl AlertStore for InMemoryAlertStore {
    fn band(&self, symbol: &str) -> Band {
        self.with_state(|s| s.band(symbol))
    }

    fn compare_and_swap(&self, symbol: &str, expected: Band, new: Band) -> bool {
        self.with_state(|s| {
            if s.band(symbol) != expected {
                return false;
            }
            s.set(symbol, new);
            true
        })
    }

    fn active(&self) -> Vec<(String, Band)> {
        self.with_state(|s| s.active())
    }

    fn clear(&self) {
        self.with_state(|s| s.clear())
    }

    fn active_count(&self) -> usize {
        self.with_state(|s| s.active_count())
    }
}
