use crate::backend::BackendRegistry;
use crate::error::{Error, Result};
use crate::intelligence::ScraperIntelligence;
use crate::metrics::MetricsCollector;
use crate::rate_limit::DomainRateLimiter;
use crate::routing::{Route, apply_route, classify};
use crate::types::{Attempt, BackendKind, ScrapeResult, Strategy, TargetOptions, domain_of};
use std::sync::Arc;
use std::time::Instant;

/// Results must carry more characters than this to be accepted.
pub const MIN_CONTENT_CHARS: usize = 100;

/// Tries backends in ranked order and returns the first good-enough result.
pub struct UnifiedScraper {
    intelligence: Arc<ScraperIntelligence>,
    backends: BackendRegistry,
    limiter: DomainRateLimiter,
    metrics: Arc<MetricsCollector>,
}

impl UnifiedScraper {
    pub fn new(
        intelligence: Arc<ScraperIntelligence>,
        backends: BackendRegistry,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        Self {
            intelligence,
            backends,
            limiter: DomainRateLimiter::new(),
            metrics: metrics.unwrap_or_else(|| Arc::new(MetricsCollector::new())),
        }
    }

    pub fn intelligence(&self) -> &Arc<ScraperIntelligence> {
        &self.intelligence
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Routing rules take precedence; the learned order fills in the rest.
    pub async fn resolve_order(&self, url: &str, strategy: &Strategy) -> Vec<BackendKind> {
        let default_order = strategy.default_order();
        let route = classify(url);
        let learned = self
            .intelligence
            .optimal_backend_order(url, &default_order)
            .await;
        if route != Route::Learned {
            log::debug!("{} matched routing rule {:?}", url, route);
        }
        apply_route(route, &learned)
    }

    /// Fetches `url`, falling back through the resolved backend order.
    ///
    /// Every backend invocation is recorded. Fetch failures come back as a
    /// result with `success == false`; only an invalid strategy is an `Err`.
    pub async fn scrape(
        &self,
        url: &str,
        target: Option<&TargetOptions>,
        strategy: &Strategy,
    ) -> Result<ScrapeResult> {
        strategy.validate()?;
        let defaults = TargetOptions::default();
        let target = target.unwrap_or(&defaults);

        let domain = domain_of(url);
        self.limiter
            .wait(&domain, strategy.rate_limit_interval())
            .await;

        let order = self.resolve_order(url, strategy).await;
        let timeout = strategy.timeout_duration();
        let mut last_error = String::new();

        for kind in order {
            log::info!("Attempting to scrape {} with {}", url, kind);
            let start = Instant::now();

            let outcome = match self.backends.get(kind) {
                Some(backend) => backend.fetch(url, target, timeout).await,
                None => Err(Error::BackendUnavailable(kind)),
            };
            let elapsed = start.elapsed();
            let response_time = elapsed.as_secs_f64();

            match outcome {
                Ok(mut result) => {
                    let content_len = result.content_len();
                    let accepted = result.success && content_len > MIN_CONTENT_CHARS;
                    let rejection = if accepted {
                        None
                    } else if result.success {
                        Some(format!("{}: Insufficient content ({} chars)", kind, content_len))
                    } else if result.error_message.is_empty() {
                        Some(format!("{}: no content", kind))
                    } else {
                        Some(format!("{}: {}", kind, result.error_message))
                    };

                    self.intelligence
                        .record(&Attempt::new(
                            url,
                            kind,
                            accepted,
                            response_time,
                            content_len,
                            rejection.clone(),
                        ))
                        .await;
                    self.metrics.record_attempt(kind, accepted, elapsed);

                    match rejection {
                        None => {
                            log::info!(
                                "Successfully scraped {} with {} in {:.1}s",
                                url,
                                kind,
                                response_time
                            );
                            result.backend = Some(kind);
                            result.response_time = response_time;
                            return Ok(result);
                        }
                        Some(reason) => {
                            log::warn!("Rejected result for {}: {}", url, reason);
                            last_error = reason;
                        }
                    }
                }
                Err(e) => {
                    let error_msg = format!("{}: {}", kind, e);
                    log::warn!("Backend {} failed for {}: {}", kind, url, e);

                    self.intelligence
                        .record(&Attempt::new(
                            url,
                            kind,
                            false,
                            response_time,
                            0,
                            Some(error_msg.clone()),
                        ))
                        .await;
                    self.metrics.record_attempt(kind, false, elapsed);
                    last_error = error_msg;
                }
            }
        }

        log::error!("All backends failed for {}: {}", url, last_error);
        Ok(ScrapeResult::failure(
            url,
            format!("All scrapers failed. Last error: {}", last_error),
        ))
    }
}
