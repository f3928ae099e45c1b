use crate::config::{RunConfig, TargetConfig};
use crate::error::{Error, Result};
use crate::metrics::collector::MetricsCollector;
use crate::metrics::snapshot::MetricsSnapshot;
use crate::orchestrator::UnifiedScraper;
use crate::output::{OutputHandler, TargetResult};
use crate::types::{ScrapeResult, Strategy, TargetOptions};
use futures::stream::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Running,
    Stopped,
}

/// One enabled target with its effective strategy.
#[derive(Debug, Clone)]
pub struct ScrapeJob {
    pub name: String,
    pub url: String,
    pub category: Option<String>,
    pub options: TargetOptions,
    pub strategy: Strategy,
}

impl ScrapeJob {
    pub fn from_target(config: &RunConfig, target: &TargetConfig) -> Self {
        Self {
            name: target.name.clone(),
            url: target.url.clone(),
            category: target.category.clone(),
            options: target.options.clone(),
            strategy: config.strategy_for(target).clone(),
        }
    }

    pub fn all(config: &RunConfig) -> Vec<Self> {
        config
            .enabled_targets()
            .map(|t| Self::from_target(config, t))
            .collect()
    }
}

/// Processes targets one after another, retrying failures and streaming
/// final results to an output sink.
pub struct ScrapeRunner {
    scraper: Arc<UnifiedScraper>,
    delay: Duration,
    retry_backoff: Duration,
    state: Arc<Mutex<RunnerState>>,
    state_watcher: watch::Sender<RunnerState>,
}

impl ScrapeRunner {
    pub fn new(scraper: Arc<UnifiedScraper>, delay: Duration) -> Self {
        let (state_tx, _) = watch::channel(RunnerState::Idle);

        Self {
            scraper,
            delay,
            retry_backoff: Duration::from_secs(5),
            state: Arc::new(Mutex::new(RunnerState::Idle)),
            state_watcher: state_tx,
        }
    }

    /// Base of the linear back-off: retry `n` waits `n * backoff`.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub async fn run(&self, jobs: Vec<ScrapeJob>, mut output: Box<dyn OutputHandler>) -> Result<()> {
        self.set_state(RunnerState::Running).await;
        let metrics = self.scraper.metrics().clone();
        metrics.increment_targets_queued(jobs.len() as u64);

        let (items_tx, items_rx) = mpsc::channel::<TargetResult>(100);

        let processor = tokio::spawn(async move {
            let mut items = tokio_stream::wrappers::ReceiverStream::new(items_rx);
            while let Some(item) = items.next().await {
                if let Err(e) = output.write(&item).await {
                    log::error!("Error writing result for {}: {}", item.target, e);
                }
            }
            output.close().await
        });

        let scraper = self.scraper.clone();
        let delay = self.delay;
        let backoff = self.retry_backoff;
        let state_rx = self.state_watcher.subscribe();
        let mut worker = tokio::spawn(async move {
            let total = jobs.len();
            for (index, job) in jobs.into_iter().enumerate() {
                if *state_rx.borrow() == RunnerState::Stopped {
                    log::info!("Run stopped before {}", job.name);
                    break;
                }

                let (result, attempts) = scrape_with_retries(&scraper, &job, backoff).await?;
                metrics.record_target(result.success);
                let item = TargetResult {
                    target: job.name,
                    category: job.category,
                    attempts,
                    result,
                };
                if items_tx.send(item).await.is_err() {
                    break;
                }

                if index + 1 < total && !delay.is_zero() {
                    sleep(delay).await;
                }
            }
            Ok::<(), Error>(())
        });

        let outcome = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down...");
                worker.abort();
                Ok(())
            }
            joined = &mut worker => {
                log::info!("Run finished.");
                joined.map_err(|e| Error::Internal(e.to_string()))?
            }
        };

        // The worker owned the only sender, so the processor drains and closes.
        let closed = processor
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        self.set_state(RunnerState::Stopped).await;
        outcome?;
        closed
    }

    /// Asks a running batch to stop after the current target.
    pub async fn stop(&self) {
        self.set_state(RunnerState::Stopped).await;
    }

    pub async fn state(&self) -> RunnerState {
        *self.state.lock().await
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.scraper.metrics().snapshot()
    }

    pub fn watch_metrics(&self) -> watch::Receiver<MetricsSnapshot> {
        watch_collector(self.scraper.metrics().clone())
    }

    pub async fn set_state(&self, state: RunnerState) {
        let mut state_guard = self.state.lock().await;
        *state_guard = state;
        let _ = self.state_watcher.send(state);
    }
}

async fn scrape_with_retries(
    scraper: &UnifiedScraper,
    job: &ScrapeJob,
    backoff: Duration,
) -> Result<(ScrapeResult, u32)> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let result = scraper
            .scrape(&job.url, Some(&job.options), &job.strategy)
            .await?;
        if result.success || attempt > job.strategy.retries {
            if !result.success {
                log::error!("{} failed after {} attempt(s)", job.name, attempt);
            }
            return Ok((result, attempt));
        }

        let wait = backoff * attempt;
        log::warn!(
            "{} failed (attempt {}/{}), retrying in {:?}",
            job.name,
            attempt,
            job.strategy.retries + 1,
            wait
        );
        sleep(wait).await;
    }
}

fn watch_collector(metrics: Arc<MetricsCollector>) -> watch::Receiver<MetricsSnapshot> {
    let (tx, rx) = watch::channel(metrics.snapshot());
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(500));
        loop {
            interval.tick().await;
            if tx.send(metrics.snapshot()).is_err() {
                break;
            }
        }
    });
    rx
}
