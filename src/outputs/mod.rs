//! Output files written next to the downloaded PDFs.
//!
//! # Submodules
//!
//! - [`report`]: JSON summary of every task of a crawl
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── 2023/
//! │   ├── <sanitized title>.pdf
//! │   └── ...
//! └── 2024/
//!     └── ...
//!
//! <report path>                # optional, --report
//! ```

pub mod report;
