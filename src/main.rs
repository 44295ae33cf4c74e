use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use coin_tracker::api::coingecko::CoinGeckoClient;
use coin_tracker::services::coin_service;
use coin_tracker::{db, PricePoller, Settings, TrackerError, TrackerResult};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Initialize tracing
    let mut filter = EnvFilter::from_default_env();
    for directive in ["coin_tracker=debug", "sqlx=warn"] {
        if let Ok(d) = directive.parse() {
            filter = filter.add_directive(d);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    if let Err(e) = run().await {
        error!("coin-tracker exited with error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> TrackerResult<()> {
    info!("Starting coin-tracker...");

    let settings = Settings::from_env()?;
    let poller_config = settings.poller_config()?;

    info!("Initializing database...");
    let pool = db::init_db(&settings.database_url, settings.db_max_connections).await?;
    info!("Database initialized successfully");

    for symbol in &settings.tracked_coins {
        match coin_service::add_coin(&pool, symbol).await {
            Ok(()) => {}
            Err(e @ TrackerError::InvalidSymbol(_)) => warn!("Skipping seed coin: {}", e),
            Err(e) => return Err(e),
        }
    }

    let client = CoinGeckoClient::with_base_url(
        settings.coingecko_api_key.clone(),
        settings.vs_currency.clone(),
        settings.coingecko_base_url.clone(),
    );
    client.ping().await?;

    let poller = Arc::new(PricePoller::new(pool.clone(), Arc::new(client), poller_config));
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let poller_handle = {
        let poller = Arc::clone(&poller);
        tokio::spawn(async move { poller.run(shutdown_rx).await })
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown requested, waiting for the current cycle to finish");
    let _ = shutdown_tx.send(());

    if let Err(e) = poller_handle.await {
        error!("Poller task failed: {}", e);
    }

    pool.close().await;
    info!("coin-tracker stopped ({})", poller.state());
    Ok(())
}
