//! Command-line interface definitions for the paper scraper.
//!
//! Every option can be given as a flag or an environment variable. Options
//! left unset fall back to the YAML config file (if any) and then to the
//! built-in defaults, see [`crate::config::ScraperConfig`].

use clap::Parser;

/// Command-line arguments for the paper scraper.
///
/// # Examples
///
/// ```sh
/// # Crawl the last five years into ./scraped-pdfs
/// paper_scraper
///
/// # Ten workers, three years, custom output root
/// paper_scraper -w 10 --years 3 -o /data/papers
///
/// # Pin the year so reruns admit the same window, and keep a JSON report
/// paper_scraper --current-year 2024 --report crawl_report.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, env = "SCRAPER_CONFIG")]
    pub config: Option<String>,

    /// Archive root URL
    #[arg(long, env = "SCRAPER_BASE_URL")]
    pub base_url: Option<String>,

    /// Output root; one subdirectory per year is created beneath it
    #[arg(short, long, env = "SCRAPER_OUTPUT_DIR")]
    pub output_dir: Option<String>,

    /// Number of concurrent download workers
    #[arg(short, long, env = "SCRAPER_WORKERS")]
    pub workers: Option<usize>,

    /// Attempts per network operation before giving up
    #[arg(long, env = "SCRAPER_MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, env = "SCRAPER_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Pause before every request, in milliseconds
    #[arg(long, env = "SCRAPER_PACING_MS")]
    pub pacing_ms: Option<u64>,

    /// Size of the trailing year window
    #[arg(long, env = "SCRAPER_YEARS")]
    pub years: Option<i32>,

    /// Treat this as the current year instead of the local calendar year
    #[arg(long)]
    pub current_year: Option<i32>,

    /// Write a JSON summary of every task to this path
    #[arg(long)]
    pub report: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "paper_scraper",
            "--output-dir",
            "./pdfs",
            "--workers",
            "7",
            "--years",
            "2",
            "--current-year",
            "2024",
        ]);

        assert_eq!(cli.output_dir.as_deref(), Some("./pdfs"));
        assert_eq!(cli.workers, Some(7));
        assert_eq!(cli.years, Some(2));
        assert_eq!(cli.current_year, Some(2024));
        assert!(cli.report.is_none());
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["paper_scraper", "-o", "/tmp/pdfs", "-w", "2"]);

        assert_eq!(cli.output_dir.as_deref(), Some("/tmp/pdfs"));
        assert_eq!(cli.workers, Some(2));
    }
}
