//! Periodic price poller
//!
//! Each cycle snapshots the coin registry, fetches and stores a price for every
//! coin with at most `max_concurrent` fetches in flight, waits for the whole
//! cohort, then sleeps for the poll interval. A failure for one coin is recorded
//! in the cycle report and never affects the others.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::api::coingecko::ApiError;
use crate::api::PriceSource;
use crate::models::{CoinOutcome, CycleReport, NewPrice, PollerState, TrackedCoin};
use crate::services::{coin_service, price_service};
use crate::utils::{TrackerError, TrackerResult};

/// Pacing and fan-out limits for the poller
#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    poll_interval: Duration,
    max_concurrent: usize,
    fetch_timeout: Option<Duration>,
}

impl PollerConfig {
    /// `max_concurrent` of zero is rejected: it would block every cycle forever
    pub fn new(poll_interval: Duration, max_concurrent: usize) -> TrackerResult<Self> {
        if max_concurrent == 0 {
            return Err(TrackerError::Config("max_concurrent must be greater than zero".to_string()));
        }
        if max_concurrent > Semaphore::MAX_PERMITS {
            return Err(TrackerError::Config(format!(
                "max_concurrent must be at most {}",
                Semaphore::MAX_PERMITS
            )));
        }

        Ok(Self {
            poll_interval,
            max_concurrent,
            fetch_timeout: None,
        })
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Option<Duration>) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout
    }
}

pub struct PricePoller {
    pool: SqlitePool,
    source: Arc<dyn PriceSource>,
    config: PollerConfig,
    state: watch::Sender<PollerState>,
    cycles: AtomicU64,
}

impl PricePoller {
    pub fn new(pool: SqlitePool, source: Arc<dyn PriceSource>, config: PollerConfig) -> Self {
        let (state, _) = watch::channel(PollerState::Idle);
        Self {
            pool,
            source,
            config,
            state,
            cycles: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> PollerState {
        *self.state.borrow()
    }

    /// Watch state transitions (Idle -> Fetching -> Draining -> Idle ... -> Stopped)
    pub fn subscribe_state(&self) -> watch::Receiver<PollerState> {
        self.state.subscribe()
    }

    /// Number of cycles started so far
    pub fn cycles_run(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: PollerState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!("Poller state {} -> {}", previous, state);
        }
    }

    /// Run cycles until a shutdown signal arrives (or every sender is dropped)
    ///
    /// The signal is checked before each cycle and interrupts the sleep between
    /// cycles. A cycle already in progress always runs to completion.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            "Price poller started (interval {:?}, max concurrent {})",
            self.config.poll_interval, self.config.max_concurrent
        );

        loop {
            if shutdown_requested(&mut shutdown) {
                break;
            }

            let report = self.run_cycle().await;
            if let Some(err) = &report.registry_error {
                warn!("Cycle {} skipped, retrying after {:?}: {}", report.cycle, self.config.poll_interval, err);
            } else {
                info!(
                    "Cycle {} finished: {} attempted, {} stored, {} fetch failures, {} store failures, {} failed tasks",
                    report.cycle,
                    report.attempted,
                    report.stored,
                    report.fetch_failed,
                    report.store_failed,
                    report.task_failed
                );
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = shutdown.recv() => break,
            }
        }

        self.set_state(PollerState::Stopped);
        info!("Price poller stopped after {} cycles", self.cycles_run());
    }

    /// Run one full cycle and report what happened to each coin
    ///
    /// A failed registry read dispatches nothing and is returned in
    /// `registry_error` instead of aborting the poller.
    pub async fn run_cycle(&self) -> CycleReport {
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        let span = info_span!("cycle", cycle);
        self.run_cycle_inner(cycle).instrument(span).await
    }

    async fn run_cycle_inner(&self, cycle: u64) -> CycleReport {
        let mut report = CycleReport::new(cycle);
        self.set_state(PollerState::Fetching);

        let coins = match coin_service::list_coins(&self.pool).await {
            Ok(coins) => coins,
            Err(e) => {
                error!("Failed to read tracked coins: {}", e);
                report.registry_error = Some(e.to_string());
                self.set_state(PollerState::Idle);
                return report;
            }
        };
        debug!("Dispatching {} coins", coins.len());

        let gate = Arc::new(Semaphore::new(self.config.max_concurrent));
        let mut tasks: Vec<(String, JoinHandle<CoinOutcome>)> = Vec::with_capacity(coins.len());

        for coin in coins {
            // waits for a free slot; the gate is never closed
            let permit = match gate.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!("Admission gate closed: {}", e);
                    report.record(coin.symbol, CoinOutcome::FetchFailed(e.to_string()));
                    continue;
                }
            };

            let pool = self.pool.clone();
            let source = Arc::clone(&self.source);
            let fetch_timeout = self.config.fetch_timeout;
            let symbol = coin.symbol.clone();
            let span = info_span!("coin", symbol = %coin.symbol, id = coin.id);

            let handle = tokio::spawn(
                async move {
                    let outcome = poll_coin(&pool, source.as_ref(), &coin, fetch_timeout).await;
                    drop(permit);
                    outcome
                }
                .instrument(span),
            );
            tasks.push((symbol, handle));
        }

        self.set_state(PollerState::Draining);

        for (symbol, handle) in tasks {
            match handle.await {
                Ok(outcome) => report.record(symbol, outcome),
                Err(e) => {
                    error!("Task for {} did not complete: {}", symbol, e);
                    report.record(symbol, CoinOutcome::TaskFailed(e.to_string()));
                }
            }
        }

        self.set_state(PollerState::Idle);
        report
    }
}

fn shutdown_requested(shutdown: &mut broadcast::Receiver<()>) -> bool {
    !matches!(shutdown.try_recv(), Err(TryRecvError::Empty))
}

/// Fetch one coin's price and store it; errors end up in the outcome
async fn poll_coin(
    pool: &SqlitePool,
    source: &dyn PriceSource,
    coin: &TrackedCoin,
    fetch_timeout: Option<Duration>,
) -> CoinOutcome {
    let fetched = match fetch_timeout {
        Some(limit) => match tokio::time::timeout(limit, source.fetch_price(&coin.symbol)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout(limit.as_millis() as u64)),
        },
        None => source.fetch_price(&coin.symbol).await,
    };

    let price = match fetched {
        Ok(price) => price,
        Err(e) => {
            warn!("Failed to fetch price: {}", e);
            return CoinOutcome::FetchFailed(e.to_string());
        }
    };

    let new_price = NewPrice {
        coin_id: coin.id,
        symbol: coin.symbol.clone(),
        price,
        timestamp: Utc::now().timestamp(),
    };
    debug!("Fetched price {}", price);

    match price_service::add_price(pool, &new_price).await {
        Ok(()) => CoinOutcome::Stored {
            price,
            timestamp: new_price.timestamp,
        },
        Err(e) if e.is_validation() => {
            warn!("Rejected fetched price: {}", e);
            CoinOutcome::StoreFailed(e.to_string())
        }
        Err(e @ TrackerError::UnknownCoin(_)) => {
            warn!("Coin untracked before its price was stored: {}", e);
            CoinOutcome::StoreFailed(e.to_string())
        }
        Err(e) => {
            error!("Failed to store price: {}", e);
            CoinOutcome::StoreFailed(e.to_string())
        }
    }
}
