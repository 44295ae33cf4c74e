use sqlx::sqlite::SqlitePool;

use crate::models::TrackedCoin;

/// Insert a tracked coin; an existing symbol is left untouched
pub async fn add_coin(pool: &SqlitePool, symbol: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO tracked_coins (symbol) VALUES (?) ON CONFLICT (symbol) DO NOTHING")
        .bind(symbol)
        .execute(pool)
        .await?;

    Ok(())
}

/// Delete a tracked coin by symbol
/// Returns the number of rows removed (0 when the symbol was not tracked)
pub async fn remove_coin(pool: &SqlitePool, symbol: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tracked_coins WHERE symbol = ?")
        .bind(symbol)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Get all tracked coins ordered by symbol
pub async fn get_all_coins(pool: &SqlitePool) -> Result<Vec<TrackedCoin>, sqlx::Error> {
    sqlx::query_as::<_, TrackedCoin>("SELECT id, symbol FROM tracked_coins ORDER BY symbol")
        .fetch_all(pool)
        .await
}

/// Get a tracked coin by its (already normalized) symbol
pub async fn get_coin_by_symbol(pool: &SqlitePool, symbol: &str) -> Result<Option<TrackedCoin>, sqlx::Error> {
    sqlx::query_as::<_, TrackedCoin>("SELECT id, symbol FROM tracked_coins WHERE symbol = ?")
        .bind(symbol)
        .fetch_optional(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_add_coin_twice_keeps_one_row() {
        let pool = test_pool().await;
        add_coin(&pool, "BTC").await.unwrap();
        add_coin(&pool, "BTC").await.unwrap();

        let coins = get_all_coins(&pool).await.unwrap();
        assert_eq!(coins.len(), 1);
        assert_eq!(coins[0].symbol, "BTC");
    }

    #[tokio::test]
    async fn test_get_all_coins_sorted_by_symbol() {
        let pool = test_pool().await;
        for symbol in ["SOL", "BTC", "ETH"] {
            add_coin(&pool, symbol).await.unwrap();
        }

        let symbols: Vec<String> = get_all_coins(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.symbol)
            .collect();
        assert_eq!(symbols, vec!["BTC", "ETH", "SOL"]);
    }

    #[tokio::test]
    async fn test_remove_coin_reports_rows() {
        let pool = test_pool().await;
        add_coin(&pool, "ETH").await.unwrap();

        assert_eq!(remove_coin(&pool, "ETH").await.unwrap(), 1);
        assert_eq!(remove_coin(&pool, "ETH").await.unwrap(), 0);
        assert!(get_coin_by_symbol(&pool, "ETH").await.unwrap().is_none());
    }
}
