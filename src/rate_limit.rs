use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

/// Keeps requests to one domain at least `interval` apart.
///
/// Each caller reserves the next free slot under the lock and sleeps outside
/// it, so concurrent callers for the same domain queue up while other
/// domains are never held back.
#[derive(Default)]
pub struct DomainRateLimiter {
    last_request: Mutex<HashMap<String, Instant>>,
}

impl DomainRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until `domain` may be hit again and returns how long that took.
    pub async fn wait(&self, domain: &str, interval: Duration) -> Duration {
        let now = Instant::now();
        let slot = {
            let mut last = self.last_request.lock().await;
            let slot = match last.get(domain) {
                Some(prev) => (*prev + interval).max(now),
                None => now,
            };
            last.insert(domain.to_string(), slot);
            slot
        };

        if slot > now {
            log::debug!("Rate limiting {} for {:?}", domain, slot - now);
            sleep_until(slot).await;
        }
        slot - now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn spaces_same_domain_only() {
        let limiter = DomainRateLimiter::new();
        let interval = Duration::from_secs(2);

        assert_eq!(limiter.wait("a.com", interval).await, Duration::ZERO);
        assert_eq!(limiter.wait("b.com", interval).await, Duration::ZERO);
        assert_eq!(limiter.wait("a.com", interval).await, interval);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(limiter.wait("a.com", interval).await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_queue_up() {
        let limiter = std::sync::Arc::new(DomainRateLimiter::new());
        let interval = Duration::from_millis(500);
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter.wait("a.com", interval).await;
                    Instant::now()
                })
            })
            .collect();

        let mut finished = Vec::new();
        for handle in handles {
            finished.push(handle.await.unwrap() - start);
        }
        finished.sort();
        assert_eq!(finished[0], Duration::ZERO);
        assert!(finished[1] >= interval);
        assert!(finished[2] >= interval * 2);
    }
}
