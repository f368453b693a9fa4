//! Streamed PDF download into a year directory.
//!
//! Bytes are written through a fixed-capacity buffer into a hidden temporary
//! sibling file and renamed onto `<dir>/<sanitized title>.pdf` only after the
//! whole body has been flushed. A failed attempt removes its temporary file,
//! so a retry always starts from scratch and a Failed task never leaves a
//! valid-looking PDF behind.
//!
//! Two titles that sanitize to the same name share a destination; the rename
//! of the later download replaces the earlier file.

use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::{Result, ScrapeError};
use crate::rate_limit::RateLimiter;
use crate::retry::Attempt;
use crate::scrapers::fetcher::check_status;
use crate::utils::sanitize_filename;

/// A PDF that landed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPdf {
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    limiter: RateLimiter,
    chunk_size: usize,
}

/// Final location of a PDF named after `title` inside `dir`.
pub fn destination_path(dir: &Path, title: &str) -> PathBuf {
    dir.join(format!("{}.pdf", sanitize_filename(title)))
}

impl Downloader {
    pub fn new(client: Client, limiter: RateLimiter, chunk_size: usize) -> Self {
        Self {
            client,
            limiter,
            chunk_size: chunk_size.max(1),
        }
    }

    /// One download attempt of `pdf_url` into `dir` under `title`.
    #[instrument(level = "info", skip_all, fields(url = %pdf_url))]
    pub async fn download(&self, pdf_url: &Url, dir: &Path, title: &str) -> Attempt<SavedPdf> {
        self.limiter.pause().await;

        let response = match self.client.get(pdf_url.clone()).send().await {
            Ok(r) => r,
            Err(e) => return Attempt::Failed(ScrapeError::request(pdf_url.as_str(), e)),
        };
        let response = match check_status(pdf_url.as_str(), response) {
            Ok(r) => r,
            Err(attempt) => return attempt,
        };

        if let Err(e) = fs::create_dir_all(dir).await {
            return Attempt::Failed(ScrapeError::persistence(dir, e));
        }

        let destination = destination_path(dir, title);
        let temp = temp_path(dir, title);

        match self.stream_to_file(pdf_url, response, &temp).await {
            Ok(bytes) => {
                if let Err(e) = fs::rename(&temp, &destination).await {
                    let _ = fs::remove_file(&temp).await;
                    return Attempt::Failed(ScrapeError::persistence(&destination, e));
                }
                info!(path = %destination.display(), bytes, "Saved PDF");
                Attempt::Success(SavedPdf {
                    path: destination,
                    bytes,
                })
            }
            Err(e) => {
                let _ = fs::remove_file(&temp).await;
                debug!(path = %temp.display(), "Removed partial download");
                Attempt::Failed(e)
            }
        }
    }

    async fn stream_to_file(
        &self,
        pdf_url: &Url,
        mut response: reqwest::Response,
        temp: &Path,
    ) -> Result<u64> {
        let file = fs::File::create(temp)
            .await
            .map_err(|e| ScrapeError::persistence(temp, e))?;
        let mut writer = BufWriter::with_capacity(self.chunk_size, file);
        let mut written: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ScrapeError::request(pdf_url.as_str(), e))?
        {
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| ScrapeError::persistence(temp, e))?;
            written += chunk.len() as u64;
        }

        writer
            .flush()
            .await
            .map_err(|e| ScrapeError::persistence(temp, e))?;
        writer
            .into_inner()
            .sync_all()
            .await
            .map_err(|e| ScrapeError::persistence(temp, e))?;
        Ok(written)
    }
}

fn temp_path(dir: &Path, title: &str) -> PathBuf {
    let nonce: u64 = rand::random();
    dir.join(format!(".{}.{nonce:016x}.part", sanitize_filename(title)))
}
