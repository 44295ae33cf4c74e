//! Poller state and per-cycle reporting

use std::fmt;

/// Lifecycle of the price poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// Sleeping between cycles
    Idle,
    /// Registry snapshot taken, tasks being dispatched
    Fetching,
    /// Waiting for every dispatched task to finish
    Draining,
    /// Shut down, no further cycles will run
    Stopped,
}

impl fmt::Display for PollerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PollerState::Idle => "idle",
            PollerState::Fetching => "fetching",
            PollerState::Draining => "draining",
            PollerState::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}

/// What happened to one coin during a cycle
#[derive(Debug, Clone, PartialEq)]
pub enum CoinOutcome {
    Stored { price: f64, timestamp: i64 },
    FetchFailed(String),
    StoreFailed(String),
    /// The coin's task panicked or was cancelled before producing an outcome
    TaskFailed(String),
}

/// Summary of a single poll cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub cycle: u64,
    pub attempted: usize,
    pub stored: usize,
    pub fetch_failed: usize,
    pub store_failed: usize,
    pub task_failed: usize,
    /// Set when the registry snapshot could not be read and nothing was dispatched
    pub registry_error: Option<String>,
    pub outcomes: Vec<(String, CoinOutcome)>,
}

impl CycleReport {
    pub fn new(cycle: u64) -> Self {
        Self {
            cycle,
            ..Default::default()
        }
    }

    /// Record the result of one coin's task
    pub fn record(&mut self, symbol: String, outcome: CoinOutcome) {
        self.attempted += 1;
        match &outcome {
            CoinOutcome::Stored { .. } => self.stored += 1,
            CoinOutcome::FetchFailed(_) => self.fetch_failed += 1,
            CoinOutcome::StoreFailed(_) => self.store_failed += 1,
            CoinOutcome::TaskFailed(_) => self.task_failed += 1,
        }
        self.outcomes.push((symbol, outcome));
    }

    pub fn outcome_for(&self, symbol: &str) -> Option<&CoinOutcome> {
        self.outcomes
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, o)| o)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_each_outcome() {
        let mut report = CycleReport::new(3);
        report.record("BTC".to_string(), CoinOutcome::Stored { price: 1.0, timestamp: 10 });
        report.record("ETH".to_string(), CoinOutcome::FetchFailed("timeout".to_string()));
        report.record("SOL".to_string(), CoinOutcome::StoreFailed("locked".to_string()));
        report.record("ADA".to_string(), CoinOutcome::TaskFailed("panicked".to_string()));

        assert_eq!(report.cycle, 3);
        assert_eq!(report.attempted, 4);
        assert_eq!(report.stored, 1);
        assert_eq!(report.fetch_failed, 1);
        assert_eq!(report.store_failed, 1);
        assert_eq!(report.task_failed, 1);
        assert!(matches!(report.outcome_for("ETH"), Some(CoinOutcome::FetchFailed(_))));
        assert!(report.outcome_for("XRP").is_none());
    }
}
