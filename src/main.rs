//! Command-line entry point: crawl the archive and report what happened.
//!
//! ```sh
//! paper_scraper -o ./scraped-pdfs --years 5 --report crawl.json
//! ```

use chrono::{Datelike, Local};
use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

use paper_scraper::cli::Cli;
use paper_scraper::outputs::report::write_report;
use paper_scraper::utils::ensure_writable_dir;
use paper_scraper::{run_crawl, ScraperConfig};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("paper_scraper starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = match ScraperConfig::resolve(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    let current_year = args.current_year.unwrap_or_else(|| Local::now().year());
    info!(
        base_url = %config.base_url,
        output_dir = %config.output_dir.display(),
        workers = config.workers,
        max_retries = config.max_retries,
        year_window = config.year_window,
        current_year,
        "Configuration resolved"
    );

    // Early check: the output root must be writable before any request.
    if let Err(e) = ensure_writable_dir(&config.output_dir).await {
        error!(
            path = %config.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    let summary = match run_crawl(&config, current_year).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Crawl aborted");
            return Err(e.into());
        }
    };

    for result in summary.results.iter().filter(|r| !r.is_success()) {
        debug!(
            url = %result.source_url,
            outcome = ?result.outcome,
            error = result.error.as_deref().unwrap_or(""),
            "Unsuccessful task"
        );
    }

    if let Some(path) = &args.report {
        if let Err(e) = write_report(&summary, Path::new(path)).await {
            warn!(path = %path, error = %e, "Failed to write crawl report");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        total = summary.submitted,
        succeeded = summary.succeeded,
        skipped = summary.skipped,
        failed = summary.failed,
        "Execution complete"
    );

    Ok(())
}
