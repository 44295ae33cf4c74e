//! Price point models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored price for a coin at a point in time (unix seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PricePoint {
    pub id: i64,
    pub coin_id: i64,
    pub symbol: String,
    pub price: f64,
    pub timestamp: i64,
}

/// A price that has been fetched but not yet written
#[derive(Debug, Clone, PartialEq)]
pub struct NewPrice {
    pub coin_id: i64,
    pub symbol: String,
    pub price: f64,
    pub timestamp: i64,
}
