//! Core business logic abstractions

pub mod error;
pub mod log;
pub mod snapshot;

// Re-export main types for cleaner imports
pub use error::FetchError;
pub use snapshot::{RateSnapshot, ScheduleOutcome, ScheduleResult};
