//! HTML link extraction for the three page kinds of the archive.
//!
//! | Page | Selector | Result |
//! |------|----------|--------|
//! | Root | `a[href^="<year prefix>"]` | one URL per distinct year |
//! | Year listing | `<paper list> [href$="<paper suffix>"]` | paper detail URLs |
//! | Paper detail | `a[href$="<pdf suffix>"]` | first PDF URL plus page title |
//!
//! Relative links are resolved against the site root. Empty selector results
//! are normal (the site's markup drifts); they never raise errors here.

use itertools::Itertools;
use scraper::{Html, Selector};
use url::Url;

use crate::config::SiteLayout;
use crate::error::{Result, ScrapeError};
use crate::utils::extract_year;

/// What a paper detail page offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailPage {
    /// Human-readable title used to name the PDF.
    pub title: String,
    pub pdf_url: Option<Url>,
}

/// Compiled selectors for one [`SiteLayout`].
#[derive(Debug, Clone)]
pub struct LinkSelectors {
    year: Selector,
    paper: Selector,
    pdf: Selector,
    title: Selector,
}

fn compile(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::Config(format!("bad selector {css:?}: {e}")))
}

impl LinkSelectors {
    pub fn new(layout: &SiteLayout) -> Result<Self> {
        Ok(Self {
            year: compile(&format!(r#"a[href^="{}"]"#, layout.year_path_prefix))?,
            paper: compile(&format!(
                r#"{}[href$="{}"]"#,
                layout.paper_list_selector, layout.paper_suffix
            ))?,
            pdf: compile(&format!(r#"a[href$="{}"]"#, layout.pdf_suffix))?,
            title: compile("title")?,
        })
    }

    /// Year index links on the root page, first occurrence of each year wins.
    ///
    /// Links without a four-digit year are dropped.
    pub fn year_links(&self, html: &str, root: &Url) -> Vec<(i32, Url)> {
        let document = Html::parse_document(html);
        document
            .select(&self.year)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| {
                let year = extract_year(href)?;
                let url = root.join(href).ok()?;
                Some((year, url))
            })
            .unique_by(|(year, _)| *year)
            .collect()
    }

    /// Paper detail links in a year listing, de-duplicated.
    pub fn paper_links(&self, html: &str, root: &Url) -> Vec<Url> {
        let document = Html::parse_document(html);
        document
            .select(&self.paper)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| root.join(href).ok())
            .unique()
            .collect()
    }

    /// First PDF link and the title of a paper detail page.
    pub fn detail_page(&self, html: &str, page_url: &Url, root: &Url) -> DetailPage {
        let document = Html::parse_document(html);
        let pdf_url = document
            .select(&self.pdf)
            .filter_map(|a| a.value().attr("href"))
            .find_map(|href| root.join(href).ok());

        let title = document
            .select(&self.title)
            .next()
            .map(|t| t.text().collect::<String>())
            .map(|t| t.split_whitespace().join(" "))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| title_from_url(page_url));

        DetailPage { title, pdf_url }
    }
}

/// Fallback name: the decoded last path segment without its extension.
fn title_from_url(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut s| s.next_back())
        .filter(|s| !s.is_empty())
        .unwrap_or("untitled");
    let decoded = urlencoding::decode(segment)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    match decoded.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => decoded,
    }
}
