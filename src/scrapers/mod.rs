//! Archive scrapers: page fetching, link extraction and the two crawl stages.
//!
//! The crawl has two phases:
//!
//! 1. **Discovery** ([`years`]): root page → admitted year listings → one
//!    task per paper detail page
//! 2. **Processing** ([`papers`]): detail page → PDF link → file on disk
//!
//! # Submodules
//!
//! | Module | Role |
//! |--------|------|
//! | [`fetcher`] | shared HTTP client, pacing, status mapping |
//! | [`links`] | CSS selectors and link/title extraction from HTML |
//! | [`years`] | year window and discovery |
//! | [`papers`] | per-task processing run by the workers |
//!
//! Failures are contained at the smallest unit: a paper failure is recorded
//! in its result, a year failure skips that year.

pub mod fetcher;
pub mod links;
pub mod papers;
pub mod years;
