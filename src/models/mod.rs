//! Data models shared by the registry, the price store and the poller

pub mod coin;
pub mod price;
pub mod poller;

pub use coin::TrackedCoin;
pub use price::{NewPrice, PricePoint};
pub use poller::{CoinOutcome, CycleReport, PollerState};
