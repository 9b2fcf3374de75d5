// @file: kline_ingestion/src/core/rate_limiter.rs
// @description: Request pacer shared by all symbol workers to stay under the exchange's aggregate limit.
// @author: LAS.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;


//
// PACER
//

/// Leaky bucket with a single slot: requests leave at most once per `gap`,
/// no matter how many workers are waiting.
#[derive(Debug)]
pub struct RequestPacer {
    // Earliest instant the next request may start.
    next_slot: Mutex<Instant>,
    gap: Duration,
}

impl RequestPacer {
    pub fn new(gap: Duration) -> Self {
        RequestPacer {
            next_slot: Mutex::new(Instant::now()),
            gap,
        }
    }

    /// `0` disables pacing.
    pub fn per_second(requests_per_second: u32) -> Self {
        if requests_per_second == 0 {
            return Self::unlimited();
        }
        Self::new(Duration::from_secs(1) / requests_per_second)
    }

    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn gap(&self) -> Duration {
        self.gap
    }

    pub async fn acquire(&self) {
        if self.gap.is_zero() {
            return;
        }

        // #1. Reserve a slot under the lock, sleep outside it
        let sleep_until: Instant = {
            let mut guard = self.next_slot.lock().await;
            let now: Instant = Instant::now();
            let when: Instant = if *guard > now { *guard } else { now };
            *guard = when + self.gap;
            when
        };

        let now: Instant = Instant::now();
        if sleep_until > now {
            tokio::time::sleep(sleep_until - now).await;
        }
    }
}
