pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod scheduler;
pub mod services;
pub mod utils;

pub use api::PriceSource;
pub use config::Settings;
pub use models::{CycleReport, PollerState, PricePoint, TrackedCoin};
pub use scheduler::{PollerConfig, PricePoller};
pub use utils::{TrackerError, TrackerResult};
