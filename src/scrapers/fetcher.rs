//! HTTP GET of archive pages with pacing, status mapping and parsing.
//!
//! One [`PageFetcher`] is shared by discovery and every worker; it owns the
//! connection-pooled `reqwest::Client`, the site root, and the compiled
//! [`LinkSelectors`]. Methods return tagged [`Attempt`]s so the
//! [`crate::retry::RetryPolicy`] can decide what to do next.

use reqwest::{Client, Response, StatusCode};
use std::time::Instant;
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::ScraperConfig;
use crate::error::{Result, ScrapeError};
use crate::rate_limit::RateLimiter;
use crate::retry::Attempt;
use crate::scrapers::links::{DetailPage, LinkSelectors};

#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    limiter: RateLimiter,
    root: Url,
    selectors: LinkSelectors,
}

/// Build the shared HTTP client from the run configuration.
pub fn build_client(config: &ScraperConfig) -> Result<Client> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| ScrapeError::Config(format!("failed to build HTTP client: {e}")))
}

/// Turn a response into an error unless its status is 2xx.
///
/// HTTP 429 becomes [`Attempt::RateLimited`], other statuses [`Attempt::Failed`].
pub fn check_status<T>(
    url: &str,
    response: Response,
) -> std::result::Result<Response, Attempt<T>> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(Attempt::RateLimited(ScrapeError::RateLimited {
            url: url.to_string(),
            message: status.to_string(),
        }));
    }
    Err(Attempt::Failed(ScrapeError::Status {
        url: url.to_string(),
        status: status.as_u16(),
    }))
}

/// Carry a non-success attempt over to a different payload type.
fn retag<T, U>(attempt: Attempt<U>) -> Attempt<T> {
    match attempt {
        Attempt::Success(_) => Attempt::Skipped("empty response".to_string()),
        Attempt::Skipped(reason) => Attempt::Skipped(reason),
        Attempt::Failed(e) => Attempt::Failed(e),
        Attempt::RateLimited(e) => Attempt::RateLimited(e),
    }
}

impl PageFetcher {
    pub fn new(
        client: Client,
        limiter: RateLimiter,
        root: Url,
        selectors: LinkSelectors,
    ) -> Self {
        Self {
            client,
            limiter,
            root,
            selectors,
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Result<Self> {
        Ok(Self::new(
            build_client(config)?,
            RateLimiter::new(config.pacing_delay()),
            config.root_url()?,
            LinkSelectors::new(&config.layout)?,
        ))
    }

    pub fn root(&self) -> &Url {
        &self.root
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn limiter(&self) -> RateLimiter {
        self.limiter
    }

    /// One paced GET returning the response body as text.
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub async fn fetch_html(&self, url: &Url) -> Attempt<String> {
        self.limiter.pause().await;
        let t0 = Instant::now();

        let response = match self.client.get(url.clone()).send().await {
            Ok(r) => r,
            Err(e) => return Attempt::Failed(ScrapeError::request(url.as_str(), e)),
        };
        let response = match check_status(url.as_str(), response) {
            Ok(r) => r,
            Err(attempt) => return attempt,
        };
        match response.text().await {
            Ok(body) => {
                debug!(
                    bytes = body.len(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "fetched page"
                );
                Attempt::Success(body)
            }
            Err(e) => Attempt::Failed(ScrapeError::request(url.as_str(), e)),
        }
    }

    /// Year links found on the root page.
    pub async fn year_links(&self) -> Attempt<Vec<(i32, Url)>> {
        match self.fetch_html(&self.root).await {
            Attempt::Success(html) => {
                let links = self.selectors.year_links(&html, &self.root);
                info!(count = links.len(), "Indexed year links");
                Attempt::Success(links)
            }
            other => retag(other),
        }
    }

    /// Paper detail links in a year listing.
    pub async fn paper_links(&self, year_url: &Url) -> Attempt<Vec<Url>> {
        match self.fetch_html(year_url).await {
            Attempt::Success(html) => {
                Attempt::Success(self.selectors.paper_links(&html, &self.root))
            }
            other => retag(other),
        }
    }

    /// Title and PDF link of a paper detail page.
    pub async fn detail_page(&self, page_url: &Url) -> Attempt<DetailPage> {
        match self.fetch_html(page_url).await {
            Attempt::Success(html) => {
                Attempt::Success(self.selectors.detail_page(&html, page_url, &self.root))
            }
            other => retag(other),
        }
    }
}
