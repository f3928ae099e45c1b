use super::cache::DomainCache;
use super::ranking::rank_backends;
use super::report::{
    DomainSummary, IntelligenceReport, OverallSummary, ScraperSummary, round_to,
};
use super::stats::{BackendPerformance, DomainStatistics, success_rate};
use crate::error::{Error, Result};
use crate::types::{Attempt, BackendKind, domain_of};
use chrono::{Duration as ChronoDuration, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Days of history kept by `export_learning_data`.
const EXPORT_WINDOW_DAYS: u32 = 90;
/// Domains need this many attempts to show up in the report's top list.
const TOP_DOMAIN_MIN_ATTEMPTS: i64 = 5;
const TOP_DOMAIN_LIMIT: i64 = 10;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS scraper_attempts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        url TEXT NOT NULL,
        domain TEXT NOT NULL,
        scraper_used TEXT NOT NULL,
        success BOOLEAN NOT NULL,
        response_time REAL NOT NULL,
        content_length INTEGER NOT NULL,
        error_message TEXT,
        timestamp INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_domain ON scraper_attempts(domain)",
    "CREATE INDEX IF NOT EXISTS idx_timestamp ON scraper_attempts(timestamp)",
];

#[derive(Debug, Clone)]
pub struct IntelligenceOptions {
    pub cache_ttl: Duration,
    /// Trailing window used by the ranking policy.
    pub window_days: u32,
}

impl Default for IntelligenceOptions {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30 * 60),
            window_days: 30,
        }
    }
}

/// Durable attempt log plus the statistics and ranking derived from it.
pub struct ScraperIntelligence {
    pool: SqlitePool,
    cache: DomainCache,
    window_days: u32,
}

fn cutoff_millis(days: u32) -> i64 {
    (Utc::now() - ChronoDuration::days(i64::from(days))).timestamp_millis()
}

impl ScraperIntelligence {
    pub async fn open<P: AsRef<Path>>(path: P, options: IntelligenceOptions) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let conn_str = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&conn_str).await?;
        Self::with_pool(pool, options).await
    }

    /// Private in-memory database; one connection so every query sees the same data.
    pub async fn in_memory(options: IntelligenceOptions) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool, options).await
    }

    async fn with_pool(pool: SqlitePool, options: IntelligenceOptions) -> Result<Self> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        log::info!("Scraper intelligence store ready");
        Ok(Self {
            pool,
            cache: DomainCache::new(options.cache_ttl),
            window_days: options.window_days,
        })
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    /// Best-effort append. Storage errors are logged, never returned.
    pub async fn record(&self, attempt: &Attempt) {
        match self.try_record(attempt).await {
            Ok(()) => log::debug!(
                "Recorded attempt: {} on {} - {}",
                attempt.backend,
                attempt.domain,
                if attempt.success { "SUCCESS" } else { "FAILED" }
            ),
            Err(e) => log::warn!(
                "Could not record {} attempt for {}: {}",
                attempt.backend,
                attempt.domain,
                e
            ),
        }
        self.cache.invalidate(&attempt.domain).await;
    }

    pub async fn try_record(&self, attempt: &Attempt) -> Result<()> {
        sqlx::query(
            "INSERT INTO scraper_attempts
             (url, domain, scraper_used, success, response_time, content_length, error_message, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&attempt.url)
        .bind(&attempt.domain)
        .bind(attempt.backend.as_str())
        .bind(attempt.success)
        .bind(attempt.response_time)
        .bind(i64::try_from(attempt.content_length).unwrap_or(i64::MAX))
        .bind(attempt.error_message.as_deref())
        .bind(attempt.timestamp.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// `None` when the domain has no attempts in the window or the store is unreadable.
    pub async fn domain_statistics(
        &self,
        domain: &str,
        window_days: u32,
    ) -> Option<DomainStatistics> {
        match self.try_domain_statistics(domain, window_days).await {
            Ok(stats) => stats,
            Err(e) => {
                log::warn!("Could not read statistics for {}: {}", domain, e);
                None
            }
        }
    }

    pub async fn try_domain_statistics(
        &self,
        domain: &str,
        window_days: u32,
    ) -> Result<Option<DomainStatistics>> {
        if let Some(stats) = self.cache.get(domain, window_days).await {
            return Ok(Some(stats));
        }

        let rows: Vec<(String, i64, Option<i64>, Option<f64>)> = sqlx::query_as(
            "SELECT scraper_used,
                    COUNT(*),
                    SUM(CASE WHEN success = 1 THEN 1 ELSE 0 END),
                    AVG(response_time)
             FROM scraper_attempts
             WHERE domain = ?1 AND timestamp > ?2
             GROUP BY scraper_used",
        )
        .bind(domain)
        .bind(cutoff_millis(window_days))
        .fetch_all(&self.pool)
        .await?;

        let mut backends = BTreeMap::new();
        for (name, attempts, successes, avg_time) in rows {
            let kind = match name.parse::<BackendKind>() {
                Ok(kind) => kind,
                Err(_) => {
                    log::debug!("Ignoring attempts from unknown backend {:?}", name);
                    continue;
                }
            };
            backends.insert(
                kind,
                BackendPerformance::new(
                    attempts.max(0) as u64,
                    successes.unwrap_or(0).max(0) as u64,
                    avg_time.unwrap_or(0.0),
                ),
            );
        }

        let stats = DomainStatistics::from_backends(domain, backends);
        if let Some(stats) = &stats {
            self.cache.put(window_days, stats.clone()).await;
        }
        Ok(stats)
    }

    /// Statistics over the configured window.
    pub async fn domain_insights(&self, domain: &str) -> Option<DomainStatistics> {
        self.domain_statistics(domain, self.window_days).await
    }

    pub async fn optimal_backend_order(
        &self,
        url: &str,
        default_order: &[BackendKind],
    ) -> Vec<BackendKind> {
        let domain = domain_of(url);
        let stats = self.domain_statistics(&domain, self.window_days).await;
        let order = rank_backends(stats.as_ref(), default_order);
        log::info!(
            "Optimal backend order for {}: {}",
            domain,
            order.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", ")
        );
        order
    }

    pub async fn intelligence_report(&self, days: u32) -> Result<IntelligenceReport> {
        let cutoff = cutoff_millis(days);

        let (total, successes, unique_domains, avg_time): (i64, Option<i64>, i64, Option<f64>) =
            sqlx::query_as(
                "SELECT COUNT(*),
                        SUM(CASE WHEN success = 1 THEN 1 ELSE 0 END),
                        COUNT(DISTINCT domain),
                        AVG(response_time)
                 FROM scraper_attempts
                 WHERE timestamp > ?1",
            )
            .bind(cutoff)
            .fetch_one(&self.pool)
            .await?;

        let total = total.max(0) as u64;
        let successes = successes.unwrap_or(0).max(0) as u64;
        let overall = OverallSummary {
            total_attempts: total,
            successful_attempts: successes,
            success_rate: round_to(success_rate(successes, total), 1),
            unique_domains: unique_domains.max(0) as u64,
            avg_response_time: round_to(avg_time.unwrap_or(0.0), 2),
        };

        let scraper_rows: Vec<(String, i64, Option<i64>, Option<f64>)> = sqlx::query_as(
            "SELECT scraper_used,
                    COUNT(*),
                    SUM(CASE WHEN success = 1 THEN 1 ELSE 0 END) AS successes,
                    AVG(response_time)
             FROM scraper_attempts
             WHERE timestamp > ?1
             GROUP BY scraper_used
             ORDER BY successes DESC, scraper_used ASC",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        let scrapers = scraper_rows
            .into_iter()
            .map(|(name, attempts, successes, avg_time)| {
                let attempts = attempts.max(0) as u64;
                let successes = successes.unwrap_or(0).max(0) as u64;
                (
                    name,
                    ScraperSummary {
                        attempts,
                        successes,
                        success_rate: round_to(success_rate(successes, attempts), 1),
                        avg_response_time: round_to(avg_time.unwrap_or(0.0), 2),
                    },
                )
            })
            .collect();

        let domain_rows: Vec<(String, i64, Option<i64>)> = sqlx::query_as(
            "SELECT domain,
                    COUNT(*),
                    SUM(CASE WHEN success = 1 THEN 1 ELSE 0 END) AS successes
             FROM scraper_attempts
             WHERE timestamp > ?1
             GROUP BY domain
             HAVING COUNT(*) >= ?2
             ORDER BY successes DESC, domain ASC
             LIMIT ?3",
        )
        .bind(cutoff)
        .bind(TOP_DOMAIN_MIN_ATTEMPTS)
        .bind(TOP_DOMAIN_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let top_domains = domain_rows
            .into_iter()
            .map(|(domain, attempts, successes)| {
                let attempts = attempts.max(0) as u64;
                let successes = successes.unwrap_or(0).max(0) as u64;
                DomainSummary {
                    domain,
                    attempts,
                    successes,
                    success_rate: round_to(success_rate(successes, attempts), 1),
                }
            })
            .collect();

        Ok(IntelligenceReport {
            period_days: days,
            overall,
            scrapers,
            top_domains,
            generated_at: Utc::now(),
        })
    }

    /// Writes a 90-day report as pretty JSON.
    pub async fn export_learning_data<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let report = self.intelligence_report(EXPORT_WINDOW_DAYS).await?;
        let json = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(path.as_ref(), json).await?;
        log::info!("Learning data exported to {}", path.as_ref().display());
        Ok(())
    }

    /// Deletes attempts older than the retention window and empties the cache.
    pub async fn cleanup(&self, retention_days: u32) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM scraper_attempts WHERE timestamp < ?1")
            .bind(cutoff_millis(retention_days))
            .execute(&self.pool)
            .await?
            .rows_affected();
        self.cache.clear().await;
        log::info!("Cleaned up {} old scraper attempts", deleted);
        Ok(deleted)
    }

    pub async fn attempt_count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scraper_attempts")
            .fetch_one(&self.pool)
            .await?;
        u64::try_from(count).map_err(|e| Error::Internal(e.to_string()))
    }

    /// Attempts for one domain, newest first.
    pub async fn recent_attempts(&self, domain: &str, limit: u32) -> Result<Vec<Attempt>> {
        let rows: Vec<(String, String, String, bool, f64, i64, Option<String>, i64)> =
            sqlx::query_as(
                "SELECT url, domain, scraper_used, success, response_time, content_length, error_message, timestamp
                 FROM scraper_attempts
                 WHERE domain = ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )
            .bind(domain)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(
                |(url, domain, backend, success, response_time, content_length, error_message, ts)| {
                    Ok(Attempt {
                        url,
                        domain,
                        backend: backend.parse()?,
                        success,
                        response_time,
                        content_length: content_length.max(0) as usize,
                        error_message,
                        timestamp: chrono::DateTime::from_timestamp_millis(ts).ok_or_else(
                            || Error::Internal(format!("bad timestamp {}", ts)),
                        )?,
                    })
                },
            )
            .collect()
    }

    /// Closes the pool; later writes fail and are logged by `record`.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
