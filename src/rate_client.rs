//! Provides exchange rate fetching for the application.

use crate::core::error::FetchError;
use crate::core::snapshot::RateSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One upstream fetch attempt. Implementations make exactly one network
/// call per invocation; retry policy belongs to the scheduler.
#[async_trait]
pub trait RateClient: Send + Sync {
    async fn fetch(&self, base: &str, now: DateTime<Utc>) -> Result<RateSnapshot, FetchError>;
}
