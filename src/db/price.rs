use sqlx::sqlite::SqlitePool;
use tracing::debug;

use crate::models::PricePoint;
use crate::utils::{TrackerError, TrackerResult};

/// Insert or overwrite the price of a coin at a timestamp
///
/// The coin existence check and the write are a single statement, so a coin
/// removed concurrently never ends up with a dangling price row and the write
/// lock is taken before the check runs.
/// Fails with `UnknownCoin` when `coin_id` is not tracked.
pub async fn upsert_price(
    pool: &SqlitePool,
    coin_id: i64,
    price: f64,
    timestamp: i64,
) -> TrackerResult<()> {
    let result = sqlx::query(
        "INSERT INTO coin_prices (coin_id, price, timestamp)
         SELECT ?, ?, ? WHERE EXISTS (SELECT 1 FROM tracked_coins WHERE id = ?)
         ON CONFLICT (coin_id, timestamp) DO UPDATE SET price = excluded.price",
    )
    .bind(coin_id)
    .bind(price)
    .bind(timestamp)
    .bind(coin_id)
    .execute(pool)
    .await;

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            let fk_violation = e
                .as_database_error()
                .map(|db_err| db_err.is_foreign_key_violation())
                .unwrap_or(false);
            return Err(if fk_violation {
                TrackerError::UnknownCoin(coin_id)
            } else {
                TrackerError::Store(e)
            });
        }
    };

    if result.rows_affected() == 0 {
        return Err(TrackerError::UnknownCoin(coin_id));
    }

    debug!("Stored price {} for coin {} at {}", price, coin_id, timestamp);
    Ok(())
}

/// Get the price point whose timestamp is closest to `target_timestamp`
/// Ties go to the earlier timestamp, then the lower row id.
pub async fn get_nearest_price(
    pool: &SqlitePool,
    symbol: &str,
    target_timestamp: i64,
) -> Result<Option<PricePoint>, sqlx::Error> {
    sqlx::query_as::<_, PricePoint>(
        "SELECT cp.id, cp.coin_id, tc.symbol, cp.price, cp.timestamp
         FROM coin_prices cp
         JOIN tracked_coins tc ON tc.id = cp.coin_id
         WHERE tc.symbol = ?
         ORDER BY ABS(cp.timestamp - ?) ASC, cp.timestamp ASC, cp.id ASC
         LIMIT 1",
    )
    .bind(symbol)
    .bind(target_timestamp)
    .fetch_optional(pool)
    .await
}

/// Get every price point for a coin, oldest first
pub async fn get_price_history(pool: &SqlitePool, symbol: &str) -> Result<Vec<PricePoint>, sqlx::Error> {
    sqlx::query_as::<_, PricePoint>(
        "SELECT cp.id, cp.coin_id, tc.symbol, cp.price, cp.timestamp
         FROM coin_prices cp
         JOIN tracked_coins tc ON tc.id = cp.coin_id
         WHERE tc.symbol = ?
         ORDER BY cp.timestamp ASC",
    )
    .bind(symbol)
    .fetch_all(pool)
    .await
}

/// Count stored price points for a coin id
pub async fn count_prices_for_coin(pool: &SqlitePool, coin_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM coin_prices WHERE coin_id = ?")
        .bind(coin_id)
        .fetch_one(pool)
        .await
}
