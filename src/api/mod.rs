pub mod coingecko;

use async_trait::async_trait;

use coingecko::ApiError;

/// Anything that can quote the current price of a symbol
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_price(&self, symbol: &str) -> Result<f64, ApiError>;
}
