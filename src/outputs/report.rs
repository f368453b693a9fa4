//! JSON crawl report.
//!
//! Serializes a [`CrawlSummary`] (per-outcome counts, admitted years and one
//! entry per task) so a run can be audited without replaying its log.

use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

use crate::error::{Result, ScrapeError};
use crate::models::CrawlSummary;

/// Write `summary` as pretty-printed JSON to `path`.
///
/// Parent directories are created as needed.
///
/// # Errors
///
/// Returns [`ScrapeError::Persistence`] if the directory or file cannot be
/// written, or [`ScrapeError::Parse`] if serialization fails.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_report(summary: &CrawlSummary, path: &Path) -> Result<()> {
    let json =
        serde_json::to_string_pretty(summary).map_err(|e| ScrapeError::Parse(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(dir = %parent.display(), error = %e, "Failed to create report dir");
            return Err(ScrapeError::persistence(parent, e));
        }
    }

    fs::write(path, json)
        .await
        .map_err(|e| ScrapeError::persistence(path, e))?;
    info!(tasks = summary.results.len(), "Wrote crawl report");
    Ok(())
}
