use sqlx::sqlite::SqlitePool;
use tracing::{debug, info};

use crate::db;
use crate::models::TrackedCoin;
use crate::services::validation::normalize_symbol;
use crate::utils::TrackerResult;

/// Start tracking a symbol; tracking an already tracked symbol is a no-op
pub async fn add_coin(pool: &SqlitePool, symbol: &str) -> TrackerResult<()> {
    let symbol = normalize_symbol(symbol)?;
    db::coin::add_coin(pool, &symbol).await?;
    info!("Tracking {}", symbol);
    Ok(())
}

/// Stop tracking a symbol; removing an untracked symbol is not an error
pub async fn remove_coin(pool: &SqlitePool, symbol: &str) -> TrackerResult<()> {
    let symbol = normalize_symbol(symbol)?;
    let removed = db::coin::remove_coin(pool, &symbol).await?;
    if removed > 0 {
        info!("Stopped tracking {}", symbol);
    } else {
        debug!("{} was not tracked", symbol);
    }
    Ok(())
}

/// All tracked coins ordered by symbol
pub async fn list_coins(pool: &SqlitePool) -> TrackerResult<Vec<TrackedCoin>> {
    let coins = db::coin::get_all_coins(pool).await?;
    debug!("Fetched {} tracked coins", coins.len());
    Ok(coins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::utils::TrackerError;

    #[tokio::test]
    async fn test_add_coin_is_idempotent_and_uppercases() {
        let pool = test_pool().await;
        add_coin(&pool, "btc").await.unwrap();
        add_coin(&pool, "BTC").await.unwrap();

        let coins = list_coins(&pool).await.unwrap();
        assert_eq!(coins.len(), 1);
        assert_eq!(coins[0].symbol, "BTC");
    }

    #[tokio::test]
    async fn test_invalid_symbols_never_reach_the_store() {
        let pool = test_pool().await;
        assert!(matches!(add_coin(&pool, "bt1").await, Err(TrackerError::InvalidSymbol(_))));
        assert!(matches!(add_coin(&pool, "").await, Err(TrackerError::InvalidSymbol(_))));
        assert!(matches!(remove_coin(&pool, "waytoolongsym").await, Err(TrackerError::InvalidSymbol(_))));
        assert!(list_coins(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_coin_absent_is_ok() {
        let pool = test_pool().await;
        add_coin(&pool, "eth").await.unwrap();

        remove_coin(&pool, "Eth").await.unwrap();
        remove_coin(&pool, "eth").await.unwrap();
        assert!(list_coins(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_coins_empty_is_ok() {
        let pool = test_pool().await;
        assert_eq!(list_coins(&pool).await.unwrap(), Vec::<TrackedCoin>::new());
    }
}
