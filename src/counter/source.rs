//! Where async increments get their amount from.

use std::time::Duration;

use async_trait::async_trait;

use crate::api::ApiError;

/// Remote call performed by [`increment_async`](super::increment_async).
#[async_trait]
pub trait CountSource: Send + Sync {
    /// Returns the name of this source for logging.
    fn name(&self) -> &'static str;

    /// Resolve the amount to add to the counter.
    async fn fetch_count(&self, amount: i64) -> Result<i64, ApiError>;
}

/// Simulated network request that echoes the amount after a fixed delay.
#[derive(Debug, Clone)]
pub struct SimulatedCount {
    delay: Duration,
}

impl SimulatedCount {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedCount {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[async_trait]
impl CountSource for SimulatedCount {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn fetch_count(&self, amount: i64) -> Result<i64, ApiError> {
        tokio::time::sleep(self.delay).await;
        Ok(amount)
    }
}
