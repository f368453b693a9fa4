//! Data models for crawl tasks, their results, and downstream records.
//!
//! - [`YearBucket`]: an admitted archive year and its output directory
//! - [`PaperTask`]: one paper detail page to turn into a PDF on disk
//! - [`DownloadResult`]: what happened to one task
//! - [`CrawlSummary`]: aggregate of a whole run
//! - [`PaperRecord`], [`Category`], [`Classification`]: shapes exchanged with
//!   the extraction and classification collaborators

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// An archive year that passed the window filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearBucket {
    pub year: i32,
    pub directory: PathBuf,
}

/// A paper detail page waiting to be downloaded into its year's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperTask {
    pub detail_url: String,
    pub target_directory: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadOutcome {
    Success,
    Skipped,
    Failed,
}

/// The externally observable result of one [`PaperTask`].
#[derive(Debug, Clone, Serialize)]
pub struct DownloadResult {
    /// The paper detail page the task started from.
    pub source_url: String,
    /// The PDF link found on the detail page, if any.
    pub pdf_url: Option<String>,
    /// Where the PDF was (or would have been) written.
    pub destination_path: Option<PathBuf>,
    pub outcome: DownloadOutcome,
    /// Network attempts spent by the last operation of the task.
    pub attempts: u32,
    pub error: Option<String>,
}

impl DownloadResult {
    pub fn is_success(&self) -> bool {
        self.outcome == DownloadOutcome::Success
    }
}

/// Aggregate of a whole crawl.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlSummary {
    pub years: Vec<YearBucket>,
    pub submitted: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub results: Vec<DownloadResult>,
}

impl CrawlSummary {
    /// Tally `results` into the per-outcome counters.
    pub fn new(years: Vec<YearBucket>, submitted: usize, results: Vec<DownloadResult>) -> Self {
        let count = |o: DownloadOutcome| results.iter().filter(|r| r.outcome == o).count();
        Self {
            succeeded: count(DownloadOutcome::Success),
            skipped: count(DownloadOutcome::Skipped),
            failed: count(DownloadOutcome::Failed),
            years,
            submitted,
            results,
        }
    }
}

/// Title and abstract pulled out of one downloaded PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperRecord {
    pub year: String,
    pub title: String,
    pub abstract_text: String,
    pub file_path: PathBuf,
}

/// Research area labels a classifier may assign.
///
/// The first five are the closed label set; `Unknown` marks a reply outside
/// that set and `Error` marks a paper whose classification never completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Deep Learning/Machine Learning")]
    DeepLearning,
    #[serde(rename = "Computer Vision")]
    ComputerVision,
    #[serde(rename = "Reinforcement Learning")]
    ReinforcementLearning,
    #[serde(rename = "Natural Language Processing (NLP)")]
    NaturalLanguageProcessing,
    #[serde(rename = "Optimization Algorithms")]
    Optimization,
    Unknown,
    Error,
}

impl Category {
    /// The labels a classifier is allowed to choose from.
    pub const LABELS: [Category; 5] = [
        Category::DeepLearning,
        Category::ComputerVision,
        Category::ReinforcementLearning,
        Category::NaturalLanguageProcessing,
        Category::Optimization,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::DeepLearning => "Deep Learning/Machine Learning",
            Category::ComputerVision => "Computer Vision",
            Category::ReinforcementLearning => "Reinforcement Learning",
            Category::NaturalLanguageProcessing => "Natural Language Processing (NLP)",
            Category::Optimization => "Optimization Algorithms",
            Category::Unknown => "Unknown",
            Category::Error => "Error",
        }
    }

    /// Map a free-text label onto the closed set; anything else is `Unknown`.
    pub fn from_label(label: &str) -> Category {
        let label = label.trim();
        Self::LABELS
            .into_iter()
            .find(|c| c.label() == label)
            .unwrap_or(Category::Unknown)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: Category,
    pub authors: String,
}

impl Classification {
    /// Result recorded when classification could not be completed.
    pub fn error() -> Self {
        Self {
            category: Category::Error,
            authors: "Error".to_string(),
        }
    }
}
