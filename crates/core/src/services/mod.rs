pub mod availability;
pub mod booking;
pub mod schedule;

use std::time::Duration;

pub use availability::AvailabilityQuery;
pub use booking::BookingCoordinator;
pub use schedule::{ScheduleService, ScheduleSettings};

/// Bounds the optimistic read-validate-commit loop of versioned writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Multiplied by the attempt number before the next try.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            backoff: Duration::from_millis(5),
        }
    }
}

impl RetryPolicy {
    pub async fn wait(&self, attempt: u32) {
        if !self.backoff.is_zero() {
            tokio::time::sleep(self.backoff * attempt).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}
