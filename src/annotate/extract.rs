//! Title and abstract extraction from downloaded PDFs.

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::error::{Result, ScrapeError};
use crate::models::PaperRecord;

/// Turns a PDF on disk into plain text.
///
/// Implementations are expected to block (PDF parsing is CPU bound), so
/// [`extract_records`] runs them on the blocking thread pool.
pub trait TextExtractor: Send + Sync + 'static {
    fn extract_text(&self, path: &Path) -> Result<String>;
}

/// Split extracted text into `(title, abstract)`.
///
/// The title is the first line. The abstract is every following non-blank
/// line up to the first blank one, joined with single spaces.
pub fn split_title_and_abstract(text: &str) -> (String, String) {
    let mut lines = text.lines();
    let title = lines.next().unwrap_or_default().trim().to_string();
    let abstract_text = lines
        .map(str::trim)
        .take_while(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (title, abstract_text)
}

/// Every `<root>/<year>/*.pdf`, sorted by path.
///
/// Files directly under `root`, non-PDF files and in-progress `.part`
/// downloads are ignored.
///
/// # Errors
///
/// Returns [`ScrapeError::Persistence`] if `root` or one of its
/// subdirectories cannot be listed.
pub async fn collect_pdfs(root: &Path) -> Result<Vec<PathBuf>> {
    let mut pdfs = Vec::new();
    let mut years = fs::read_dir(root)
        .await
        .map_err(|e| ScrapeError::persistence(root, e))?;

    while let Some(entry) = years
        .next_entry()
        .await
        .map_err(|e| ScrapeError::persistence(root, e))?
    {
        let year_dir = entry.path();
        if !year_dir.is_dir() {
            continue;
        }
        let mut files = fs::read_dir(&year_dir)
            .await
            .map_err(|e| ScrapeError::persistence(&year_dir, e))?;
        while let Some(file) = files
            .next_entry()
            .await
            .map_err(|e| ScrapeError::persistence(&year_dir, e))?
        {
            let path = file.path();
            let is_pdf = path.extension().is_some_and(|ext| ext == "pdf");
            if is_pdf && path.is_file() {
                pdfs.push(path);
            }
        }
    }

    pdfs.sort();
    Ok(pdfs)
}

/// Extract a [`PaperRecord`] from every PDF under `root`.
///
/// Up to `concurrency` PDFs are parsed at once. A PDF that fails to
/// extract is logged and left out. Records come back in path order.
///
/// # Errors
///
/// Fails only when the directory tree itself cannot be listed.
#[instrument(level = "info", skip_all, fields(root = %root.display()))]
pub async fn extract_records<E: TextExtractor>(
    extractor: Arc<E>,
    root: &Path,
    concurrency: usize,
) -> Result<Vec<PaperRecord>> {
    let pdfs = collect_pdfs(root).await?;
    info!(count = pdfs.len(), "Extracting text from PDFs");

    let records: Vec<Option<PaperRecord>> = stream::iter(pdfs)
        .map(|path| {
            let extractor = Arc::clone(&extractor);
            async move {
                let job_path = path.clone();
                let extracted =
                    tokio::task::spawn_blocking(move || extractor.extract_text(&job_path)).await;
                let text = match extracted {
                    Ok(Ok(text)) => text,
                    Ok(Err(e)) => {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "Error extracting PDF; skipping"
                        );
                        return None;
                    }
                    Err(e) => {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "Extraction task aborted; skipping"
                        );
                        return None;
                    }
                };

                let (title, abstract_text) = split_title_and_abstract(&text);
                let year = path
                    .parent()
                    .and_then(Path::file_name)
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Some(PaperRecord {
                    year,
                    title,
                    abstract_text,
                    file_path: path,
                })
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let records: Vec<PaperRecord> = records.into_iter().flatten().collect();
    info!(extracted = records.len(), "Extraction complete");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Treats every "PDF" as UTF-8 text; files starting with `broken` fail.
    struct PlainText;

    impl TextExtractor for PlainText {
        fn extract_text(&self, path: &Path) -> Result<String> {
            let text =
                std::fs::read_to_string(path).map_err(|e| ScrapeError::persistence(path, e))?;
            if text.starts_with("broken") {
                return Err(ScrapeError::Parse(format!("unreadable PDF {}", path.display())));
            }
            Ok(text)
        }
    }

    #[test]
    fn test_split_stops_at_first_blank_line() {
        let text = "  Attention Is All You Need \nWe propose\n  a new architecture.\n\n\
                    Introduction\nmore";
        let (title, abstract_text) = split_title_and_abstract(text);
        assert_eq!(title, "Attention Is All You Need");
        assert_eq!(abstract_text, "We propose a new architecture.");
    }

    #[test]
    fn test_split_empty_text() {
        assert_eq!(split_title_and_abstract(""), (String::new(), String::new()));
        assert_eq!(
            split_title_and_abstract("Only a title"),
            ("Only a title".to_string(), String::new())
        );
    }

    #[tokio::test]
    async fn test_collect_pdfs_only_year_pdfs() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("2024")).unwrap();
        std::fs::create_dir_all(root.join("2023")).unwrap();
        std::fs::write(root.join("stray.pdf"), "x").unwrap();
        std::fs::write(root.join("2024").join("b.pdf"), "x").unwrap();
        std::fs::write(root.join("2024").join("a.pdf"), "x").unwrap();
        std::fs::write(root.join("2024").join("notes.txt"), "x").unwrap();
        std::fs::write(root.join("2024").join(".c.00ff.part"), "x").unwrap();
        std::fs::write(root.join("2023").join("z.pdf"), "x").unwrap();

        let pdfs = collect_pdfs(root).await.unwrap();
        assert_eq!(
            pdfs,
            vec![
                root.join("2023").join("z.pdf"),
                root.join("2024").join("a.pdf"),
                root.join("2024").join("b.pdf"),
            ]
        );
    }

    #[tokio::test]
    async fn test_collect_pdfs_missing_root() {
        let tmp = tempfile::tempdir().unwrap();
        let result = collect_pdfs(&tmp.path().join("nope")).await;
        assert!(matches!(result, Err(ScrapeError::Persistence { .. })));
    }

    #[tokio::test]
    async fn test_failing_pdf_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let year = tmp.path().join("2022");
        std::fs::create_dir_all(&year).unwrap();
        std::fs::write(year.join("good.pdf"), "Good Title\nShort abstract.\n\nBody").unwrap();
        std::fs::write(year.join("bad.pdf"), "broken bytes").unwrap();

        let records = extract_records(Arc::new(PlainText), tmp.path(), 4).await.unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.year, "2022");
        assert_eq!(record.title, "Good Title");
        assert_eq!(record.abstract_text, "Short abstract.");
        assert_eq!(record.file_path, year.join("good.pdf"));
    }
}
