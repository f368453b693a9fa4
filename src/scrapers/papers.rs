//! Processing of a single [`PaperTask`]: detail page → PDF link → file.
//!
//! Every task ends in exactly one [`DownloadResult`]; nothing escapes to the
//! pool or to sibling tasks.

use std::path::PathBuf;
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::downloader::{destination_path, Downloader};
use crate::error::ScrapeError;
use crate::models::{DownloadOutcome, DownloadResult, PaperTask};
use crate::retry::{RetryPolicy, Settled};
use crate::scrapers::fetcher::PageFetcher;

#[derive(Debug, Clone)]
pub struct PaperWorker {
    fetcher: PageFetcher,
    downloader: Downloader,
    policy: RetryPolicy,
}

impl PaperWorker {
    pub fn new(fetcher: PageFetcher, downloader: Downloader, policy: RetryPolicy) -> Self {
        Self {
            fetcher,
            downloader,
            policy,
        }
    }

    #[instrument(level = "info", skip_all, fields(url = %task.detail_url))]
    pub async fn process(&self, task: PaperTask) -> DownloadResult {
        info!("Processing paper");

        let page_url = match Url::parse(&task.detail_url) {
            Ok(u) => u,
            Err(e) => {
                let err = ScrapeError::Parse(format!("bad paper URL: {e}"));
                error!(error = %err, "Failed");
                return failed(&task, None, None, 1, err);
            }
        };

        let fetcher = &self.fetcher;
        let page_ref = &page_url;
        let detail = self
            .policy
            .run(&task.detail_url, move |_| fetcher.detail_page(page_ref))
            .await;
        let page = match detail.settled {
            Settled::Success(page) => page,
            Settled::Skipped(reason) => {
                warn!(%reason, "Skipped");
                return skipped(&task, None, detail.attempts, reason);
            }
            Settled::Failed(e) => {
                error!(attempts = detail.attempts, error = %e, "Failed");
                return failed(&task, None, None, detail.attempts, e);
            }
        };

        let Some(pdf_url) = page.pdf_url else {
            let err = ScrapeError::ContentMismatch {
                url: task.detail_url.clone(),
                what: "PDF link",
            };
            info!("No PDF found");
            return skipped(&task, None, detail.attempts, err.to_string());
        };

        info!(pdf_url = %pdf_url, title = %page.title, "Downloading PDF");
        let downloader = &self.downloader;
        let pdf_ref = &pdf_url;
        let dir = &task.target_directory;
        let title = page.title.as_str();
        let download = self
            .policy
            .run(pdf_url.as_str(), move |_| downloader.download(pdf_ref, dir, title))
            .await;

        match download.settled {
            Settled::Success(saved) => DownloadResult {
                source_url: task.detail_url,
                pdf_url: Some(pdf_url.to_string()),
                destination_path: Some(saved.path),
                outcome: DownloadOutcome::Success,
                attempts: download.attempts,
                error: None,
            },
            Settled::Skipped(reason) => {
                warn!(%reason, "Skipped");
                skipped(&task, Some(&pdf_url), download.attempts, reason)
            }
            Settled::Failed(e) => {
                error!(pdf_url = %pdf_url, attempts = download.attempts, error = %e, "Failed");
                let destination = destination_path(&task.target_directory, &page.title);
                failed(&task, Some(&pdf_url), Some(destination), download.attempts, e)
            }
        }
    }
}

fn skipped(
    task: &PaperTask,
    pdf_url: Option<&Url>,
    attempts: u32,
    reason: String,
) -> DownloadResult {
    DownloadResult {
        source_url: task.detail_url.clone(),
        pdf_url: pdf_url.map(Url::to_string),
        destination_path: None,
        outcome: DownloadOutcome::Skipped,
        attempts,
        error: Some(reason),
    }
}

fn failed(
    task: &PaperTask,
    pdf_url: Option<&Url>,
    destination: Option<PathBuf>,
    attempts: u32,
    err: ScrapeError,
) -> DownloadResult {
    DownloadResult {
        source_url: task.detail_url.clone(),
        pdf_url: pdf_url.map(Url::to_string),
        destination_path: destination,
        outcome: DownloadOutcome::Failed,
        attempts,
        error: Some(err.to_string()),
    }
}
