//! Year discovery: root page → admitted years → paper tasks.
//!
//! The root page is fetched once; failing to reach it is the only fatal
//! error of a crawl. Each admitted year gets its output directory and its
//! listing is fetched sequentially on the calling task, with every paper
//! link handed to `submit` as soon as the listing is parsed.

use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::error::{Result, ScrapeError};
use crate::models::{PaperTask, YearBucket};
use crate::retry::{RetryPolicy, Settled};
use crate::scrapers::fetcher::PageFetcher;

/// The trailing range `[current_year - span, current_year]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearWindow {
    pub current_year: i32,
    pub span: i32,
}

impl YearWindow {
    pub fn new(current_year: i32, span: i32) -> Self {
        Self { current_year, span }
    }

    /// Oldest admitted year, clamped to `i32::MIN`.
    pub fn earliest(&self) -> i32 {
        self.current_year.saturating_sub(self.span)
    }

    pub fn admits(&self, year: i32) -> bool {
        year >= self.earliest() && year <= self.current_year
    }

    /// Keep only the links whose year falls inside the window.
    pub fn filter(&self, links: Vec<(i32, Url)>) -> Vec<(i32, Url)> {
        links.into_iter().filter(|(y, _)| self.admits(*y)).collect()
    }
}

/// Discover admitted years and submit one [`PaperTask`] per paper link.
///
/// # Errors
///
/// Returns an error only when the root page cannot be fetched within the
/// retry budget. Listing failures are logged and the year is skipped; a
/// rejected submission is logged and discovery continues.
#[instrument(
    level = "info",
    skip_all,
    fields(root = %fetcher.root(), current_year = window.current_year)
)]
pub async fn discover_years<F>(
    fetcher: &PageFetcher,
    policy: &RetryPolicy,
    window: YearWindow,
    output_dir: &Path,
    mut submit: F,
) -> Result<Vec<YearBucket>>
where
    F: FnMut(PaperTask) -> Result<()>,
{
    info!(root = %fetcher.root(), "Connecting to main page");
    let root_report = policy
        .run(fetcher.root().as_str(), move |_| fetcher.year_links())
        .await;
    let year_links = match root_report.settled {
        Settled::Success(links) => links,
        Settled::Skipped(reason) => {
            warn!(%reason, "Main page produced no year links");
            Vec::new()
        }
        Settled::Failed(e) => {
            error!(error = %e, "Error connecting to main page");
            return Err(e);
        }
    };
    info!("Successfully connected to main page");

    let admitted = window.filter(year_links);
    info!(
        admitted = admitted.len(),
        from = window.earliest(),
        to = window.current_year,
        "Admitted years"
    );

    let mut buckets = Vec::with_capacity(admitted.len());
    for (year, year_url) in admitted {
        let directory = output_dir.join(year.to_string());
        if let Err(e) = fs::create_dir_all(&directory).await {
            error!(
                year,
                error = %ScrapeError::persistence(&directory, e),
                "Cannot create year directory; skipping year"
            );
            continue;
        }
        buckets.push(YearBucket {
            year,
            directory: directory.clone(),
        });

        info!(year, url = %year_url, "Processing year");
        let year_url_ref = &year_url;
        let listing = policy
            .run(year_url.as_str(), move |_| fetcher.paper_links(year_url_ref))
            .await;
        let paper_links = match listing.settled {
            Settled::Success(links) => links,
            Settled::Skipped(reason) => {
                warn!(year, %reason, "Year listing skipped");
                continue;
            }
            Settled::Failed(e) => {
                error!(year, error = %e, "Error processing year");
                continue;
            }
        };
        info!(year, count = paper_links.len(), "Found papers");

        for paper_url in paper_links {
            let task = PaperTask {
                detail_url: paper_url.to_string(),
                target_directory: directory.clone(),
            };
            if let Err(e) = submit(task) {
                error!(year, url = %paper_url, error = %e, "Could not queue paper");
            }
        }
    }

    Ok(buckets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScraperConfig;
    use std::collections::BTreeSet;
    use std::time::Duration;
    use wiremock::matchers::path;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_window_bounds() {
        let window = YearWindow::new(2024, 5);
        assert!(window.admits(2019));
        assert!(window.admits(2024));
        assert!(!window.admits(2018));
        assert!(!window.admits(2025));
    }

    #[test]
    fn test_huge_span_does_not_overflow() {
        let window = YearWindow::new(2024, i32::MAX);
        assert!(window.admits(1987));
        assert!(window.admits(2024));
        assert!(!window.admits(2025));

        // A negative pinned year with the largest span would wrap below i32::MIN.
        let window = YearWindow::new(-10, i32::MAX);
        assert_eq!(window.earliest(), i32::MIN);
        assert!(window.admits(i32::MIN));
        assert!(!window.admits(-9));
    }

    #[test]
    fn test_window_admits_exactly_the_range() {
        let window = YearWindow::new(2024, 5);
        let root = Url::parse("https://papers.example.org").unwrap();
        let links: Vec<(i32, Url)> = (1987..=2030)
            .map(|y| (y, root.join(&format!("/paper_files/paper/{y}")).unwrap()))
            .collect();

        let admitted: BTreeSet<i32> = window.filter(links).into_iter().map(|(y, _)| y).collect();
        assert_eq!(admitted, (2019..=2024).collect::<BTreeSet<_>>());
    }

    fn config_for(server: &MockServer) -> ScraperConfig {
        ScraperConfig {
            base_url: server.uri(),
            pacing_delay_ms: 0,
            request_timeout_secs: 5,
            ..ScraperConfig::default()
        }
    }

    async fn mount(server: &MockServer, at: &str, status: u16, body: &str) {
        Mock::given(path(at))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_only_window_years_get_directories_and_tasks() {
        let server = MockServer::start().await;
        let root_html: String = (2019..=2024)
            .map(|y| format!(r#"<a href="/paper_files/paper/{y}">{y}</a>"#))
            .collect();
        mount(&server, "/", 200, &root_html).await;
        for y in 2019..=2024 {
            let href = format!("/paper_files/paper/{y}/hash/p{y}-Abstract-Conference.html");
            let listing =
                format!(r#"<ul class="paper-list"><li><a href="{href}">p</a></li></ul>"#);
            mount(&server, &format!("/paper_files/paper/{y}"), 200, &listing).await;
        }

        let tmp = tempfile::tempdir().unwrap();
        let config = config_for(&server);
        let fetcher = PageFetcher::from_config(&config).unwrap();
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let mut tasks = Vec::new();

        // Four-year span ending in 2024 admits 2020..=2024.
        let buckets = discover_years(
            &fetcher,
            &policy,
            YearWindow::new(2024, 4),
            tmp.path(),
            |task| {
                tasks.push(task);
                Ok(())
            },
        )
        .await
        .unwrap();

        let years: BTreeSet<i32> = buckets.iter().map(|b| b.year).collect();
        assert_eq!(years, (2020..=2024).collect::<BTreeSet<_>>());
        assert!(!tmp.path().join("2019").exists());
        for y in 2020..=2024 {
            assert!(tmp.path().join(y.to_string()).is_dir());
        }

        assert_eq!(tasks.len(), 5);
        for task in &tasks {
            assert!(!task.detail_url.contains("p2019"));
            let year = task.target_directory.file_name().unwrap().to_str().unwrap();
            assert!(task.detail_url.contains(&format!("p{year}-")));
        }
    }

    #[tokio::test]
    async fn test_failing_listing_skips_only_that_year() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/",
            200,
            r#"<a href="/paper_files/paper/2024">24</a><a href="/paper_files/paper/2023">23</a>"#,
        )
        .await;
        mount(&server, "/paper_files/paper/2024", 500, "").await;
        mount(
            &server,
            "/paper_files/paper/2023",
            200,
            r#"<ul class="paper-list"><li><a href="/x-Abstract-Conference.html">x</a></li></ul>"#,
        )
        .await;

        let tmp = tempfile::tempdir().unwrap();
        let config = config_for(&server);
        let fetcher = PageFetcher::from_config(&config).unwrap();
        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let mut tasks = Vec::new();

        let buckets = discover_years(
            &fetcher,
            &policy,
            YearWindow::new(2024, 5),
            tmp.path(),
            |task| {
                tasks.push(task);
                Ok(())
            },
        )
        .await
        .unwrap();

        assert_eq!(buckets.len(), 2);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].target_directory, tmp.path().join("2023"));
    }

    #[tokio::test]
    async fn test_existing_year_directory_is_reused() {
        let server = MockServer::start().await;
        mount(&server, "/", 200, r#"<a href="/paper_files/paper/2024">24</a>"#).await;
        mount(
            &server,
            "/paper_files/paper/2024",
            200,
            r#"<ul class="paper-list"><li><a href="/y-Abstract-Conference.html">y</a></li></ul>"#,
        )
        .await;

        let tmp = tempfile::tempdir().unwrap();
        let existing = tmp.path().join("2024");
        std::fs::create_dir_all(&existing).unwrap();
        std::fs::write(existing.join("Earlier Run.pdf"), b"%PDF old").unwrap();

        let config = config_for(&server);
        let fetcher = PageFetcher::from_config(&config).unwrap();
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let mut tasks = Vec::new();

        let buckets = discover_years(
            &fetcher,
            &policy,
            YearWindow::new(2024, 0),
            tmp.path(),
            |task| {
                tasks.push(task);
                Ok(())
            },
        )
        .await
        .unwrap();

        assert_eq!(
            buckets,
            vec![YearBucket {
                year: 2024,
                directory: existing.clone(),
            }]
        );
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].target_directory, existing);
        assert_eq!(std::fs::read(existing.join("Earlier Run.pdf")).unwrap(), b"%PDF old");
    }

    #[tokio::test]
    async fn test_unreachable_root_is_fatal() {
        let server = MockServer::start().await;
        mount(&server, "/", 503, "").await;

        let tmp = tempfile::tempdir().unwrap();
        let config = config_for(&server);
        let fetcher = PageFetcher::from_config(&config).unwrap();
        let policy = RetryPolicy::new(3, Duration::from_millis(1));

        let result = discover_years(
            &fetcher,
            &policy,
            YearWindow::new(2024, 5),
            tmp.path(),
            |_| Ok(()),
        )
        .await;

        assert!(matches!(
            result,
            Err(ScrapeError::ExhaustedRetries { attempts: 3, .. })
        ));
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }
}
