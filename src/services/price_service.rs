use sqlx::sqlite::SqlitePool;

use crate::db;
use crate::models::{NewPrice, PricePoint};
use crate::services::validation::{normalize_symbol, validate_price, validate_timestamp};
use crate::utils::{TrackerError, TrackerResult};

/// Get the stored price nearest in time to `target_timestamp`
///
/// Fails with `NotFound` when the symbol is not tracked or has no prices yet.
pub async fn get_price(
    pool: &SqlitePool,
    symbol: &str,
    target_timestamp: i64,
) -> TrackerResult<PricePoint> {
    let symbol = normalize_symbol(symbol)?;
    validate_timestamp(target_timestamp)?;

    db::price::get_nearest_price(pool, &symbol, target_timestamp)
        .await?
        .ok_or(TrackerError::NotFound(symbol))
}

/// Validate and store a freshly fetched price
pub async fn add_price(pool: &SqlitePool, new_price: &NewPrice) -> TrackerResult<()> {
    normalize_symbol(&new_price.symbol)?;
    validate_price(new_price.price)?;
    validate_timestamp(new_price.timestamp)?;

    db::price::upsert_price(pool, new_price.coin_id, new_price.price, new_price.timestamp).await
}

/// Full price history of a symbol, oldest first
pub async fn get_price_history(pool: &SqlitePool, symbol: &str) -> TrackerResult<Vec<PricePoint>> {
    let symbol = normalize_symbol(symbol)?;
    Ok(db::price::get_price_history(pool, &symbol).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::services::coin_service;

    async fn tracked(pool: &SqlitePool, symbol: &str) -> i64 {
        coin_service::add_coin(pool, symbol).await.unwrap();
        db::coin::get_coin_by_symbol(pool, &symbol.to_uppercase())
            .await
            .unwrap()
            .unwrap()
            .id
    }

    fn new_price(coin_id: i64, symbol: &str, price: f64, timestamp: i64) -> NewPrice {
        NewPrice {
            coin_id,
            symbol: symbol.to_string(),
            price,
            timestamp,
        }
    }

    #[tokio::test]
    async fn test_get_price_is_case_insensitive() {
        let pool = test_pool().await;
        let id = tracked(&pool, "eth").await;
        add_price(&pool, &new_price(id, "ETH", 10.0, 1000)).await.unwrap();
        add_price(&pool, &new_price(id, "ETH", 20.0, 2000)).await.unwrap();

        assert_eq!(get_price(&pool, "eth", 1400).await.unwrap().price, 10.0);
        assert_eq!(get_price(&pool, "Eth", 1600).await.unwrap().price, 20.0);
    }

    #[tokio::test]
    async fn test_get_price_errors() {
        let pool = test_pool().await;
        tracked(&pool, "btc").await;

        assert!(matches!(get_price(&pool, "b7c", 10).await, Err(TrackerError::InvalidSymbol(_))));
        assert!(matches!(get_price(&pool, "btc", 0).await, Err(TrackerError::InvalidTimestamp(0))));
        assert!(matches!(get_price(&pool, "btc", 10).await, Err(TrackerError::NotFound(s)) if s == "BTC"));
        assert!(matches!(get_price(&pool, "doge", 10).await, Err(TrackerError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_add_price_rejects_bad_points() {
        let pool = test_pool().await;
        let id = tracked(&pool, "sol").await;

        assert!(matches!(
            add_price(&pool, &new_price(id, "SOL", 0.0, 1000)).await,
            Err(TrackerError::InvalidPrice(_))
        ));
        assert!(matches!(
            add_price(&pool, &new_price(id, "SOL", 1.0, 0)).await,
            Err(TrackerError::InvalidTimestamp(0))
        ));
        assert!(matches!(
            add_price(&pool, &new_price(id, "S0L", 1.0, 1000)).await,
            Err(TrackerError::InvalidSymbol(_))
        ));
        assert!(matches!(
            add_price(&pool, &new_price(id + 100, "SOL", 1.0, 1000)).await,
            Err(TrackerError::UnknownCoin(_))
        ));
        assert!(get_price_history(&pool, "sol").await.unwrap().is_empty());
    }
}
