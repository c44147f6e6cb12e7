//! PRICECHECK — reference host
//!
//! Entry point. Loads configuration, initialises structured logging,
//! restores the task record from disk (or creates a fresh one), and runs
//! the price-check step once or on an interval with graceful shutdown.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use pricecheck::config::AppConfig;
use pricecheck::scraping::HttpFetcher;
use pricecheck::storage;
use pricecheck::types::TaskRecord;
use pricecheck::{HostContext, PriceCheckStep};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load(&AppConfig::resolve_path())?;

    init_logging();

    let descriptor = PriceCheckStep::descriptor();
    info!(
        task = %cfg.task.name,
        url = %cfg.step.url,
        currency = %cfg.step.currency,
        interval_secs = cfg.task.interval_secs,
        step = %descriptor.description.replace('\n', " / "),
        "PRICECHECK starting up"
    );

    let mut record = match storage::load_record(&cfg.task.state_file)? {
        Some(r) => {
            info!(prev_price = r.data.prev_price, runs = r.runs, "Resumed from saved state");
            r
        }
        None => {
            let mut r = TaskRecord::new(&cfg.task.name);
            r.data = descriptor.data;
            r
        }
    };

    let fetcher = match cfg.task.timeout_secs {
        Some(secs) => HttpFetcher::with_timeout(Duration::from_secs(secs))?,
        None => HttpFetcher::new()?,
    };
    let step = PriceCheckStep::with_fetcher(Arc::new(fetcher));

    if cfg.task.is_one_shot() {
        run_once(&step, &cfg, &mut record).await?;
        return Ok(());
    }

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.task.interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.task.interval_secs,
        "Entering main loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = run_once(&step, &cfg, &mut record).await {
                    error!(error = %e, "Run failed, continuing to next");
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!(
        task = %record.name,
        prev_price = record.data.prev_price,
        runs = record.runs,
        "PRICECHECK shut down cleanly."
    );

    Ok(())
}

/// Run the step once and persist the record if the step asked for it.
async fn run_once(step: &PriceCheckStep, cfg: &AppConfig, record: &mut TaskRecord) -> Result<()> {
    let ctx = HostContext::new(&record.name);
    let input = serde_json::Value::Null;

    let outcome = step.run(&mut record.data, &ctx, &cfg.step, &input)?.await;

    if ctx.take_save_request() {
        record.record_run();
        storage::save_record(record, &cfg.task.state_file)?;
    }

    let check = outcome?;
    info!(
        task = %record.name,
        run_id = %ctx.run_id(),
        price = check.price,
        changed = check.price_changed,
        "Price checked"
    );
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pricecheck=info"));

    let json_logging = std::env::var("PRICECHECK_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
