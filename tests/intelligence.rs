mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::memory_store;
use std::time::Duration;
use unified_scraper::intelligence::{IntelligenceReport, MIN_SAMPLE_SIZE};
use unified_scraper::{Attempt, BackendKind, IntelligenceOptions, ScraperIntelligence};

use BackendKind::*;

async fn record_n(
    store: &ScraperIntelligence,
    url: &str,
    backend: BackendKind,
    n: usize,
    success: bool,
    response_time: f64,
) {
    for _ in 0..n {
        let error = (!success).then(|| format!("{}: failed", backend));
        store
            .record(&Attempt::new(url, backend, success, response_time, 2_000, error))
            .await;
    }
}

#[tokio::test]
async fn higher_volume_winner_ranks_first() {
    let store = memory_store().await;
    record_n(&store, "https://example.com/a", Crawler, 4, true, 1.0).await;
    record_n(&store, "https://example.com/b", Http, 1, true, 0.5).await;
    record_n(&store, "https://example.com/c", Http, 1, false, 0.5).await;

    let stats = store.domain_insights("example.com").await.unwrap();
    assert_eq!(stats.total_attempts, 6);
    assert_eq!(stats.backends[&Crawler].success_rate, 100.0);
    assert_eq!(stats.backends[&Http].success_rate, 50.0);
    assert_eq!(stats.best_backend, Some(Crawler));

    let order = store
        .optimal_backend_order("https://example.com/new", &[Http, Crawler])
        .await;
    assert_eq!(order, vec![Crawler, Http]);
}

#[tokio::test]
async fn sparse_history_keeps_caller_order() {
    let store = memory_store().await;
    let sample = MIN_SAMPLE_SIZE as usize - 1;
    record_n(&store, "https://sparse.org/", Http, sample, true, 0.1).await;

    for default in [
        vec![Crawler, Http, Headless],
        vec![Browser],
        vec![Feed, Http, Crawler, Browser, Headless],
    ] {
        let order = store.optimal_backend_order("https://sparse.org/x", &default).await;
        assert_eq!(order, default);
    }
}

#[tokio::test]
async fn learned_order_never_drops_defaults() {
    let store = memory_store().await;
    record_n(&store, "https://dense.org/", Feed, 3, true, 0.2).await;
    record_n(&store, "https://dense.org/", Crawler, 3, false, 0.2).await;
    record_n(&store, "https://dense.org/", Http, 2, true, 2.0).await;

    let default = vec![Crawler, Http, Headless];
    let order = store.optimal_backend_order("https://dense.org/", &default).await;

    for kind in &default {
        assert_eq!(order.iter().filter(|k| *k == kind).count(), 1, "{:?}", order);
    }
    assert_eq!(order, vec![Feed, Http, Crawler, Headless]);
}

#[tokio::test]
async fn statistics_respect_the_window() {
    let store = memory_store().await;
    let old = Utc::now() - ChronoDuration::days(45);
    for _ in 0..3 {
        store
            .record(&Attempt::new("https://window.org/", Crawler, true, 1.0, 900, None).at(old))
            .await;
    }
    record_n(&store, "https://window.org/", Http, 1, true, 0.4).await;

    let recent = store.domain_statistics("window.org", 30).await.unwrap();
    assert_eq!(recent.total_attempts, 1);
    assert!(!recent.backends.contains_key(&Crawler));

    let wide = store.domain_statistics("window.org", 60).await.unwrap();
    assert_eq!(wide.total_attempts, 4);
    assert_eq!(wide.avg_response_time, (3.0 * 1.0 + 0.4) / 4.0);

    assert!(store.domain_statistics("never-seen.org", 30).await.is_none());
}

#[tokio::test]
async fn recording_invalidates_cached_statistics() {
    let store = ScraperIntelligence::in_memory(IntelligenceOptions {
        cache_ttl: Duration::from_secs(3600),
        window_days: 30,
    })
    .await
    .unwrap();

    record_n(&store, "https://cache.org/", Http, 1, true, 0.3).await;
    assert_eq!(store.domain_insights("cache.org").await.unwrap().total_attempts, 1);

    record_n(&store, "https://cache.org/", Http, 1, false, 0.3).await;
    let stats = store.domain_insights("cache.org").await.unwrap();
    assert_eq!(stats.total_attempts, 2);
    assert_eq!(stats.success_rate, 50.0);
}

#[tokio::test]
async fn report_aggregates_the_period() {
    let store = memory_store().await;
    record_n(&store, "https://a.com/", Crawler, 3, true, 1.0).await;
    record_n(&store, "https://a.com/", Http, 2, false, 3.0).await;
    record_n(&store, "https://b.com/", Http, 2, true, 0.5).await;

    let report = store.intelligence_report(7).await.unwrap();
    assert_eq!(report.period_days, 7);
    assert_eq!(report.overall.total_attempts, 7);
    assert_eq!(report.overall.successful_attempts, 5);
    assert_eq!(report.overall.success_rate, 71.4);
    assert_eq!(report.overall.unique_domains, 2);
    assert_eq!(report.overall.avg_response_time, 1.43);

    let crawler = &report.scrapers["crawler"];
    assert_eq!((crawler.attempts, crawler.successes), (3, 3));
    let http = &report.scrapers["http"];
    assert_eq!(http.success_rate, 50.0);
    assert_eq!(http.avg_response_time, 1.75);

    assert_eq!(report.top_domains.len(), 1);
    assert_eq!(report.top_domains[0].domain, "a.com");
    assert_eq!(report.top_domains[0].success_rate, 60.0);
}

#[tokio::test]
async fn report_lists_scrapers_by_successes() {
    let store = memory_store().await;
    record_n(&store, "https://order.org/", Crawler, 1, true, 1.0).await;
    record_n(&store, "https://order.org/", Crawler, 3, false, 1.0).await;
    record_n(&store, "https://order.org/", Http, 3, true, 1.0).await;
    record_n(&store, "https://order.org/", Feed, 2, true, 1.0).await;

    let report = store.intelligence_report(7).await.unwrap();
    let names: Vec<&str> = report.scrapers.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["http", "feedparser", "crawler"]);

    let json = serde_json::to_string(&report).unwrap();
    let http = json.find("\"http\"").unwrap();
    let crawler = json.find("\"crawler\"").unwrap();
    assert!(http < crawler);
}

#[tokio::test]
async fn empty_report_is_zeroed() {
    let store = memory_store().await;
    let report = store.intelligence_report(30).await.unwrap();
    assert_eq!(report.overall.total_attempts, 0);
    assert_eq!(report.overall.success_rate, 0.0);
    assert!(report.scrapers.is_empty());
    assert!(report.top_domains.is_empty());
}

#[tokio::test]
async fn cleanup_drops_old_attempts() {
    let store = memory_store().await;
    let old = Utc::now() - ChronoDuration::days(100);
    store
        .record(&Attempt::new("https://old.org/", Http, true, 1.0, 500, None).at(old))
        .await;
    record_n(&store, "https://old.org/", Http, 2, true, 1.0).await;

    assert_eq!(store.cleanup(90).await.unwrap(), 1);
    assert_eq!(store.attempt_count().await.unwrap(), 2);
    assert_eq!(store.cleanup(90).await.unwrap(), 0);
}

#[tokio::test]
async fn export_writes_a_ninety_day_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("learning.json");
    let store = memory_store().await;
    let recent = Utc::now() - ChronoDuration::days(60);
    store
        .record(&Attempt::new("https://ex.org/", Feed, true, 0.8, 4000, None).at(recent))
        .await;

    store.export_learning_data(&path).await.unwrap();

    let report: IntelligenceReport =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(report.period_days, 90);
    assert_eq!(report.overall.total_attempts, 1);
    assert!(report.scrapers.contains_key("feedparser"));
}

#[tokio::test]
async fn file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data/databases/intel.db");

    let store = ScraperIntelligence::open(&path, IntelligenceOptions::default())
        .await
        .unwrap();
    store
        .record(&Attempt::new(
            "https://persist.org:8443/p",
            Crawler,
            false,
            2.5,
            0,
            Some("crawler: HTTP 503".into()),
        ))
        .await;
    store.close().await;

    let reopened = ScraperIntelligence::open(&path, IntelligenceOptions::default())
        .await
        .unwrap();
    let attempts = reopened.recent_attempts("persist.org:8443", 5).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].backend, Crawler);
    assert_eq!(attempts[0].error_message.as_deref(), Some("crawler: HTTP 503"));
    assert!(!attempts[0].success);
}
