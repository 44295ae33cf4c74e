pub mod poller;

pub use poller::{PollerConfig, PricePoller};
