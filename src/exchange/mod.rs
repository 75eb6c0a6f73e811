use async_trait::async_trait;
use thiserror::Error;

use crate::alert::RateSnapshot;

pub mod binance;
pub mod retry;

pub use binance::BinanceFutures;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("all funding-rate endpoints failed after {attempts} attempt(s): {last_error}")]
    Unavailable { attempts: usize, last_error: String },
    #[error("http client setup failed: {0}")]
    Client(#[from] reqwest::Error),
}

/// Anything that can produce the current funding-rate batch.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rates(&self) -> Result<Vec<RateSnapshot>, SourceError>;
}
