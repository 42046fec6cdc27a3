//! Retry budgets for bringing the bridge up.

use std::future::Future;
use std::time::Duration;

use action_primitives::Clock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Fixed-interval retry: wait `first_delay`, try, then wait `between` before
/// each further attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub first_delay: Duration,
    pub between: Duration,
}

impl RetryPolicy {
    /// Initialization triggered by a fill request.
    pub const ON_DEMAND: RetryPolicy = RetryPolicy {
        max_attempts: 3,
        first_delay: Duration::from_secs(1),
        between: Duration::from_secs(2),
    };

    /// Initialization right after the page loaded.
    pub const PAGE_LOAD: RetryPolicy = RetryPolicy {
        max_attempts: 5,
        first_delay: Duration::from_secs(3),
        between: Duration::from_secs(3),
    };

    /// Run `attempt` until it returns true or the budget is spent.
    pub async fn run<F, Fut>(&self, clock: &dyn Clock, cancel: &CancellationToken, mut attempt: F) -> bool
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = bool>,
    {
        clock.sleep(self.first_delay).await;
        for n in 1..=self.max_attempts {
            if cancel.is_cancelled() {
                return false;
            }
            info!(attempt = n, max = self.max_attempts, "초기화 시도");
            if attempt(n).await {
                return true;
            }
            warn!(attempt = n, max = self.max_attempts, "초기화 실패");
            if n < self.max_attempts {
                clock.sleep(self.between).await;
            }
        }
        false
    }
}
