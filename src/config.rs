//! Run configuration.
//!
//! A [`ScraperConfig`] is assembled once at startup from, in increasing
//! precedence, built-in defaults, an optional YAML file, and command-line
//! flags or environment variables. It is immutable afterwards and handed to
//! each component at construction.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::cli::Cli;
use crate::error::{Result, ScrapeError};
use crate::scrapers::links::LinkSelectors;

/// Where things live on the archive site.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SiteLayout {
    /// Path prefix of year index links on the root page.
    pub year_path_prefix: String,
    /// CSS selector for anchors inside the paper list of a year page.
    pub paper_list_selector: String,
    /// Suffix of paper detail page links.
    pub paper_suffix: String,
    /// Suffix of the PDF link on a detail page.
    pub pdf_suffix: String,
}

impl Default for SiteLayout {
    fn default() -> Self {
        Self {
            year_path_prefix: "/paper_files/paper/".to_string(),
            paper_list_selector: "ul.paper-list li a".to_string(),
            paper_suffix: "Abstract-Conference.html".to_string(),
            pdf_suffix: "Paper-Conference.pdf".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub base_url: String,
    pub output_dir: PathBuf,
    pub workers: usize,
    pub max_retries: u32,
    pub request_timeout_secs: u64,
    pub pacing_delay_ms: u64,
    pub year_window: i32,
    pub chunk_size: usize,
    pub rate_limit_base_delay_ms: u64,
    pub user_agent: String,
    pub layout: SiteLayout,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "https://papers.nips.cc".to_string(),
            output_dir: PathBuf::from("scraped-pdfs"),
            workers: 5,
            max_retries: 3,
            request_timeout_secs: 60,
            pacing_delay_ms: 2000,
            year_window: 5,
            chunk_size: 8192,
            rate_limit_base_delay_ms: 10_000,
            user_agent: concat!("paper_scraper/", env!("CARGO_PKG_VERSION")).to_string(),
            layout: SiteLayout::default(),
        }
    }
}

impl ScraperConfig {
    /// Parse a YAML document; missing keys keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| ScrapeError::Config(e.to_string()))
    }

    /// Load the YAML file at `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|e| ScrapeError::persistence(path, e))?;
        Self::from_yaml(&text)
    }

    /// Build the effective configuration for a CLI invocation and validate it.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(Path::new(path))?,
            None => Self::default(),
        };
        config.apply_overrides(cli);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(v) = &cli.base_url {
            self.base_url = v.clone();
        }
        if let Some(v) = &cli.output_dir {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = cli.workers {
            self.workers = v;
        }
        if let Some(v) = cli.max_retries {
            self.max_retries = v;
        }
        if let Some(v) = cli.timeout_secs {
            self.request_timeout_secs = v;
        }
        if let Some(v) = cli.pacing_ms {
            self.pacing_delay_ms = v;
        }
        if let Some(v) = cli.years {
            self.year_window = v;
        }
    }

    /// Reject values no run can succeed with.
    pub fn validate(&self) -> Result<()> {
        self.root_url()?;
        if self.workers == 0 {
            return Err(ScrapeError::Config("workers must be at least 1".into()));
        }
        if self.max_retries == 0 {
            return Err(ScrapeError::Config("max_retries must be at least 1".into()));
        }
        if self.chunk_size == 0 {
            return Err(ScrapeError::Config("chunk_size must be at least 1".into()));
        }
        if self.year_window < 0 {
            return Err(ScrapeError::Config("year_window must not be negative".into()));
        }
        LinkSelectors::new(&self.layout)?;
        Ok(())
    }

    pub fn root_url(&self) -> Result<Url> {
        Url::parse(&self.base_url).map_err(|e| {
            ScrapeError::Config(format!("invalid base_url {:?}: {e}", self.base_url))
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    pub fn rate_limit_base_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_base_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults() {
        let config = ScraperConfig::default();
        assert_eq!(config.workers, 5);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.pacing_delay(), Duration::from_secs(2));
        assert_eq!(config.year_window, 5);
        assert_eq!(config.chunk_size, 8192);
        assert_eq!(config.rate_limit_base_delay(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "workers: 8\nlayout:\n  pdf_suffix: Paper.pdf\n";
        let config = ScraperConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.workers, 8);
        assert_eq!(config.layout.pdf_suffix, "Paper.pdf");
        assert_eq!(config.layout.paper_suffix, "Abstract-Conference.html");
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_cli_overrides_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("scraper.yaml");
        std::fs::write(&path, "workers: 8\nyear_window: 2\n").unwrap();

        let cli = Cli::parse_from([
            "paper_scraper",
            "--config",
            path.to_str().unwrap(),
            "--workers",
            "3",
        ]);
        let config = ScraperConfig::resolve(&cli).unwrap();
        assert_eq!(config.workers, 3);
        assert_eq!(config.year_window, 2);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ScraperConfig::default();
        config.workers = 0;
        assert!(matches!(config.validate(), Err(ScrapeError::Config(_))));

        let mut config = ScraperConfig::default();
        config.base_url = "not a url".into();
        assert!(matches!(config.validate(), Err(ScrapeError::Config(_))));

        let mut config = ScraperConfig::default();
        config.layout.paper_list_selector = "ul[[".into();
        assert!(config.validate().is_err());
    }
}
