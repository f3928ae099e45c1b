use super::stats::DomainStatistics;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct CachedStats {
    stats: DomainStatistics,
    stored_at: Instant,
}

/// Per-domain statistics cache. Entries expire after `ttl` and are dropped
/// whenever a new attempt for their domain is recorded.
pub struct DomainCache {
    ttl: Duration,
    entries: Mutex<HashMap<(String, u32), CachedStats>>,
}

impl DomainCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, domain: &str, window_days: u32) -> Option<DomainStatistics> {
        let mut entries = self.entries.lock().await;
        let key = (domain.to_string(), window_days);
        match entries.get(&key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.stats.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub async fn put(&self, window_days: u32, stats: DomainStatistics) {
        let key = (stats.domain.clone(), window_days);
        self.entries.lock().await.insert(
            key,
            CachedStats {
                stats,
                stored_at: Instant::now(),
            },
        );
    }

    pub async fn invalidate(&self, domain: &str) {
        self.entries.lock().await.retain(|(d, _), _| d != domain);
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intelligence::stats::BackendPerformance;
    use crate::types::BackendKind;
    use std::collections::BTreeMap;

    fn sample(domain: &str) -> DomainStatistics {
        let mut backends = BTreeMap::new();
        backends.insert(BackendKind::Http, BackendPerformance::new(1, 1, 0.5));
        DomainStatistics::from_backends(domain, backends).unwrap()
    }

    #[tokio::test]
    async fn entries_expire_and_invalidate() {
        let cache = DomainCache::new(Duration::from_millis(50));
        cache.put(30, sample("a.com")).await;
        cache.put(30, sample("b.com")).await;
        assert!(cache.get("a.com", 30).await.is_some());
        assert!(cache.get("a.com", 7).await.is_none());

        cache.invalidate("a.com").await;
        assert!(cache.get("a.com", 30).await.is_none());
        assert!(cache.get("b.com", 30).await.is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get("b.com", 30).await.is_none());
    }
}
