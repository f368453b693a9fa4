//! # Paper Scraper
//!
//! A concurrent crawler that mirrors the PDFs of a conference paper archive
//! into per-year directories, plus the building blocks to annotate the
//! mirrored papers afterwards.
//!
//! ## Architecture
//!
//! The crawl follows a producer/consumer pipeline:
//! 1. **Discovery**: fetch the root page, keep the years inside the trailing
//!    window and list the paper detail pages of each year
//! 2. **Queueing**: every detail page becomes a [`models::PaperTask`] on the
//!    [`pool::WorkerPool`] as soon as its year listing is parsed
//! 3. **Download**: workers resolve the PDF link and stream it to
//!    `<output>/<year>/<sanitized title>.pdf`
//! 4. **Summary**: every task yields one [`models::DownloadResult`], tallied
//!    into a [`models::CrawlSummary`]
//!
//! Every request goes through the shared [`rate_limit::RateLimiter`] and the
//! bounded [`retry::RetryPolicy`]. A failing paper or year never stops the
//! crawl; only an unreachable root page does.

pub mod annotate;
pub mod cli;
pub mod config;
pub mod crawl;
pub mod downloader;
pub mod error;
pub mod models;
pub mod outputs;
pub mod pool;
pub mod rate_limit;
pub mod retry;
pub mod scrapers;
pub mod utils;

pub use config::{ScraperConfig, SiteLayout};
pub use crawl::run_crawl;
pub use error::{Result, ScrapeError};
