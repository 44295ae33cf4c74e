use thiserror::Error;

use crate::api::coingecko::ApiError;

/// Errors surfaced by the registry, the price store and their services
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),
    #[error("Invalid price: {0}")]
    InvalidPrice(f64),
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(i64),
    #[error("Coin with id {0} not found")]
    UnknownCoin(i64),
    #[error("No price found for {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    Store(#[from] sqlx::Error),
    #[error("Price source error: {0}")]
    SourceFetch(#[from] ApiError),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TrackerError {
    /// Input mistakes the caller can fix; logged as warnings, not errors
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TrackerError::InvalidSymbol(_)
                | TrackerError::InvalidPrice(_)
                | TrackerError::InvalidTimestamp(_)
        )
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;
