use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use unified_scraper::config::{ConfigLoader, Settings};
use unified_scraper::metrics::snapshot::MetricsSnapshot;
use unified_scraper::{
    BackendKind, BackendRegistry, ScrapeJob, ScrapeRunner, ScraperIntelligence, Strategy,
    UnifiedScraper,
};

#[derive(Parser)]
#[command(name = "unified-scraper")]
#[command(version = "0.1.0")]
#[command(about = "Multi-backend scraper that learns which backend works per domain", long_about = None)]
struct Cli {
    /// Optional settings file; SCRAPER_* environment variables override it
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every enabled target in a run file
    Run {
        /// Path to the run file (JSON/YAML/TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Show progress bars (stderr)
        #[arg(short, long, default_value_t = true)]
        progress: bool,
    },
    /// Scrape a single URL and print the result as JSON
    Scrape {
        url: String,

        #[arg(long)]
        primary: Option<BackendKind>,

        #[arg(long = "fallback")]
        fallbacks: Vec<BackendKind>,

        /// Per-attempt timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },
    /// Print the intelligence report
    Report {
        #[arg(short, long, default_value_t = 7)]
        days: u32,

        /// Also dump 90 days of learning data to this file
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
    /// Delete attempts older than the retention window
    Cleanup {
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Validate a run file
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },
}

async fn open_intelligence(
    settings: &Settings,
    database: Option<&Path>,
) -> anyhow::Result<Arc<ScraperIntelligence>> {
    let path = database.unwrap_or(settings.database_path.as_path());
    let intelligence = ScraperIntelligence::open(path, settings.intelligence_options())
        .await
        .with_context(|| format!("opening intelligence database {}", path.display()))?;
    Ok(Arc::new(intelligence))
}

fn build_scraper(
    settings: &Settings,
    intelligence: Arc<ScraperIntelligence>,
) -> anyhow::Result<UnifiedScraper> {
    let registry = BackendRegistry::standard(&settings.browser_settings())?;
    Ok(UnifiedScraper::new(intelligence, registry, None))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    let cli = Cli::parse();
    let logger = env_logger::Builder::from_default_env().build();
    let max_level = logger.filter();
    let multi = Arc::new(indicatif::MultiProgress::new());

    let show_progress = matches!(cli.command, Commands::Run { progress: true, .. });
    if show_progress {
        indicatif_log_bridge::LogWrapper::new((*multi).clone(), logger).try_init()?;
    } else {
        log::set_boxed_logger(Box::new(logger))?;
    }
    log::set_max_level(max_level);

    let settings = Settings::load(cli.settings.as_deref())?;

    match cli.command {
        Commands::Run { config, progress } => {
            log::info!("Loading config from {:?}", config);
            let run_config = ConfigLoader::load(&config)?;
            log::info!("Loaded run: {}", run_config.name);

            let database = run_config.database.as_ref().map(PathBuf::from);
            let intelligence = open_intelligence(&settings, database.as_deref()).await?;
            let scraper = Arc::new(build_scraper(&settings, intelligence.clone())?);
            let output = ConfigLoader::create_output(&run_config, Some(multi.clone()))?;
            let runner = ScrapeRunner::new(scraper, Duration::from_millis(run_config.delay_ms));
            let jobs = ScrapeJob::all(&run_config);

            let mut progress_bar: Option<ProgressBar> = None;
            let mut progress_task = None;
            if progress {
                let pb = multi.add(ProgressBar::new(jobs.len() as u64));
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
                        .progress_chars("#>-"),
                );

                let mut metrics_rx = runner.watch_metrics();
                let pb_clone = pb.clone();
                progress_bar = Some(pb);
                progress_task = Some(tokio::spawn(async move {
                    while metrics_rx.changed().await.is_ok() {
                        let snapshot: MetricsSnapshot = metrics_rx.borrow().clone();
                        pb_clone.set_position(snapshot.targets_processed);
                        pb_clone.set_message(format!(
                            "Ok: {} | Failed: {} | Attempts: {}",
                            snapshot.targets_succeeded,
                            snapshot.targets_failed,
                            snapshot.backend_attempts
                        ));
                    }
                }));
            }

            log::info!("Scraping {} target(s)...", jobs.len());
            let outcome = runner.run(jobs, output).await;

            if let Some(task) = progress_task {
                task.abort();
            }
            if let Some(pb) = progress_bar {
                let final_metrics = runner.get_metrics();
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("✅ [{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} {msg}")?
                        .progress_chars("#>-"),
                );
                pb.finish_with_message(format!(
                    "Success: {:.1}% - Completed",
                    final_metrics.success_rate
                ));
            }
            intelligence.close().await;
            outcome?;

            let final_metrics = runner.get_metrics();
            println!("\n✅ Run Completed:");
            println!("   Targets Processed: {}", final_metrics.targets_processed);
            println!("   Succeeded: {}", final_metrics.targets_succeeded);
            println!("   Success Rate: {:.1}%", final_metrics.success_rate);
            println!("   Backend Attempts: {}", final_metrics.backend_attempts);
            println!("   Average Attempt: {}ms", final_metrics.avg_response_time_ms);
            for (kind, backend) in &final_metrics.backends {
                println!(
                    "     {:<10} {}/{} accepted, {}ms avg",
                    kind.as_str(),
                    backend.successes,
                    backend.attempts,
                    backend.avg_response_time_ms
                );
            }
            println!("   Total Time: {:.1}s", final_metrics.elapsed_seconds);
        }
        Commands::Scrape {
            url,
            primary,
            fallbacks,
            timeout,
        } => {
            let mut strategy = Strategy::default().with_timeout(timeout);
            if let Some(primary) = primary {
                strategy.primary = primary;
            }
            if !fallbacks.is_empty() {
                strategy.fallbacks = fallbacks;
            }

            let intelligence = open_intelligence(&settings, None).await?;
            let scraper = build_scraper(&settings, intelligence.clone())?;
            let result = scraper.scrape(&url, None, &strategy).await;
            intelligence.close().await;

            println!("{}", serde_json::to_string_pretty(&result?)?);
        }
        Commands::Report { days, export } => {
            let intelligence = open_intelligence(&settings, None).await?;
            let report = intelligence.intelligence_report(days).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if let Some(path) = export {
                intelligence.export_learning_data(&path).await?;
                println!("Learning data exported to {}", path.display());
            }
            intelligence.close().await;
        }
        Commands::Cleanup { days } => {
            let days = days.unwrap_or(settings.retention_days);
            let intelligence = open_intelligence(&settings, None).await?;
            let deleted = intelligence.cleanup(days).await?;
            intelligence.close().await;
            println!("Deleted {} attempt(s) older than {} days", deleted, days);
        }
        Commands::Check { config } => match ConfigLoader::load(&config) {
            Ok(cfg) => {
                println!("✅ Config is valid:");
                println!("   Name: {}", cfg.name);
                println!(
                    "   Targets: {} ({} enabled)",
                    cfg.targets.len(),
                    cfg.enabled_targets().count()
                );
                println!(
                    "   Default order: {}",
                    cfg.strategy
                        .default_order()
                        .iter()
                        .map(|k| k.as_str())
                        .collect::<Vec<_>>()
                        .join(" -> ")
                );
            }
            Err(e) => {
                eprintln!("❌ Config error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
