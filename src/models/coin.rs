//! Tracked coin models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A symbol the poller records prices for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TrackedCoin {
    pub id: i64,
    pub symbol: String,
}
