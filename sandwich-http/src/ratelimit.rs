use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::sleep;

/// Rate limiter for the single route this client calls. A full per-route
/// bucket map isn't needed when there is exactly one route, but the
/// remaining/reset-after/global semantics still apply the same way they do
/// to every other Discord REST bucket.
pub struct RateLimiter {
    remaining: Mutex<u32>,
    reset_at: Mutex<Instant>,
    semaphore: Semaphore,
    global_until: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            remaining: Mutex::new(1),
            reset_at: Mutex::new(Instant::now()),
            semaphore: Semaphore::new(1),
            global_until: Mutex::new(None),
        }
    }

    pub async fn acquire(&self) {
        let until = *self.global_until.lock();
        if let Some(until) = until {
            if Instant::now() < until {
                sleep(until - Instant::now()).await;
            }
        }

        let _permit = self.semaphore.acquire().await.unwrap();

        let wait = {
            let remaining = *self.remaining.lock();
            if remaining == 0 {
                let reset_at = *self.reset_at.lock();
                (Instant::now() < reset_at).then(|| reset_at - Instant::now())
            } else {
                None
            }
        };

        if let Some(duration) = wait {
            sleep(duration).await;
        }
    }

    pub fn update(&self, remaining: u32, reset_after_ms: u64) {
        *self.remaining.lock() = remaining;
        *self.reset_at.lock() = Instant::now() + Duration::from_millis(reset_after_ms);
    }

    pub fn set_global(&self, retry_after_ms: u64) {
        *self.global_until.lock() = Some(Instant::now() + Duration::from_millis(retry_after_ms));
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
