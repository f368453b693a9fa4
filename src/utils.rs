//! Utility functions for file naming, year parsing, log formatting and
//! output directory checks.
//!
//! - Filename sanitization for paper titles
//! - Year extraction from archive links
//! - String truncation for logging model replies
//! - JSON error detection for truncated model replies
//! - File system validation for the output root

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

use crate::error::{Result, ScrapeError};

static ILLEGAL_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:*?"<>|]"#).expect("static regex"));

static FOUR_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").expect("static regex"));

/// Replace every filesystem-illegal character with an underscore.
///
/// The illegal set is `\ / : * ? " < > |`. Length is not trimmed and no
/// deduplication happens: two titles that map to the same name end up on
/// the same path, and the later download overwrites the earlier one.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize_filename("A/B: C?"), "A_B_ C_");
/// ```
pub fn sanitize_filename(title: &str) -> String {
    ILLEGAL_FILENAME_CHARS.replace_all(title, "_").into_owned()
}

/// Extract the first run of four digits from an archive link.
///
/// Returns `None` when the link carries no year, so callers can discard it.
pub fn extract_year(href: &str) -> Option<i32> {
    FOUR_DIGITS
        .find(href)
        .and_then(|m| m.as_str().parse::<i32>().ok())
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` bytes (on a char boundary) with an
/// ellipsis and the number of dropped bytes appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
///
/// # Errors
///
/// Returns [`ScrapeError::Persistence`] if the directory cannot be created or
/// is not writable (permission denied, read-only filesystem, ...).
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| ScrapeError::persistence(path, e))?;

    let probe_path = path.join("..__probe_write__");
    fs::write(&probe_path, b"")
        .await
        .map_err(|e| ScrapeError::persistence(&probe_path, e))?;
    let _ = fs::remove_file(&probe_path).await;
    info!("Output directory is writable");
    Ok(())
}
