use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Hands out at most `per_minute` permits per minute, evenly spaced.
#[derive(Debug)]
pub struct RateLimiter {
    permits: Arc<Semaphore>,
    refill: JoinHandle<()>,
}

impl RateLimiter {
    /// Must be called from within a tokio runtime.
    pub fn per_minute(per_minute: usize) -> Self {
        let permits = Arc::new(Semaphore::new(1));
        let period = Duration::from_secs_f64(60.0 / per_minute.max(1) as f64);

        let permits_c = permits.clone();
        let refill = tokio::spawn(async move {
            let mut ticks = tokio::time::interval(period);
            ticks.tick().await;
            loop {
                ticks.tick().await;
                if permits_c.available_permits() == 0 {
                    permits_c.add_permits(1);
                }
            }
        });

        Self { permits, refill }
    }

    pub async fn acquire(&self) -> Result<()> {
        self.permits.acquire().await?.forget();
        Ok(())
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.refill.abort();
    }
}
