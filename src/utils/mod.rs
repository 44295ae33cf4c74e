pub mod errors;

pub use errors::{TrackerError, TrackerResult};
