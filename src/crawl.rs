//! End-to-end crawl: discovery on the calling task, downloads on the pool.

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

use crate::config::ScraperConfig;
use crate::downloader::Downloader;
use crate::error::Result;
use crate::models::{CrawlSummary, DownloadResult, PaperTask};
use crate::pool::WorkerPool;
use crate::retry::RetryPolicy;
use crate::scrapers::fetcher::PageFetcher;
use crate::scrapers::papers::PaperWorker;
use crate::scrapers::years::{discover_years, YearWindow};

/// Crawl every admitted year of the archive described by `config`.
///
/// Paper tasks are submitted to the pool as each year listing is parsed and
/// the pool is drained before returning, so every submitted task has a
/// result in the summary.
///
/// # Errors
///
/// Fails on an invalid configuration or when the root page is unreachable.
#[instrument(
    level = "info",
    skip_all,
    fields(base_url = %config.base_url, current_year = current_year)
)]
pub async fn run_crawl(config: &ScraperConfig, current_year: i32) -> Result<CrawlSummary> {
    let t0 = Instant::now();
    let fetcher = PageFetcher::from_config(config)?;
    let downloader = Downloader::new(
        fetcher.client().clone(),
        fetcher.limiter(),
        config.chunk_size,
    );
    let policy = RetryPolicy::new(config.max_retries, config.rate_limit_base_delay());
    let worker = Arc::new(PaperWorker::new(fetcher.clone(), downloader, policy));

    let mut pool = WorkerPool::spawn(config.workers, move |task: PaperTask| {
        let worker = Arc::clone(&worker);
        async move { worker.process(task).await }
    })?;
    info!(workers = config.workers, "Worker pool started");

    let window = YearWindow::new(current_year, config.year_window);
    let discovered = discover_years(&fetcher, &policy, window, &config.output_dir, |task| {
        pool.submit(task)
    })
    .await;

    let years = match discovered {
        Ok(years) => years,
        Err(e) => {
            pool.drain().await;
            return Err(e);
        }
    };

    let submitted = pool.submitted();
    info!(years = years.len(), submitted, "Discovery complete; waiting for downloads");
    let results: Vec<DownloadResult> = pool.drain().await;

    let summary = CrawlSummary::new(years, submitted, results);
    info!(
        submitted = summary.submitted,
        succeeded = summary.succeeded,
        skipped = summary.skipped,
        failed = summary.failed,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Crawl complete"
    );
    Ok(summary)
}
