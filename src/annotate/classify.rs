//! Research-area classification of extracted papers through a language model.
//!
//! The model is reached through [`ModelClient`]; [`Classifier`] adds the
//! prompt, reply parsing and the rate-limit backoff of
//! [`RetryPolicy::run_with_backoff`]:
//!
//! | Model outcome | Attempt | Effect |
//! |---------------|---------|--------|
//! | quota / HTTP 429 | `RateLimited` | sleep, double the delay, retry |
//! | malformed JSON | `Failed` | retry without sleeping |
//! | other transport error | `Skipped` | stop, record `Error` |
//! | well-formed JSON | `Success` | done |
//!
//! A paper whose classification never completes is recorded as
//! [`Classification::error`] rather than dropped.

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::error::{Result, ScrapeError};
use crate::models::{Category, Classification, PaperRecord};
use crate::retry::{Attempt, RetryPolicy, RetryReport, Settled};
use crate::utils::{looks_truncated, truncate_for_log};

/// One request to a language model.
///
/// Implementations report quota exhaustion as [`ScrapeError::RateLimited`];
/// every other error is treated as terminal for the paper.
pub trait ModelClient {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Abstract used when the caller has none.
const NO_ABSTRACT: &str = "No abstract available";

/// Build the classification prompt for one paper.
pub fn classification_prompt(title: &str, abstract_text: &str) -> String {
    let labels = Category::LABELS
        .iter()
        .map(Category::label)
        .collect::<Vec<_>>()
        .join(", ");
    let abstract_text = if abstract_text.trim().is_empty() {
        NO_ABSTRACT
    } else {
        abstract_text
    };
    format!(
        "Classify the following research paper into one of these categories: {labels}.\n\
         Also, extract the authors' names. If unknown, return \"Unknown\".\n\n\
         Respond in JSON format:\n\
         {{\"Category\": \"Selected Category\", \"Authors\": \"Author1, Author2, ...\"}}\n\n\
         Title: \"{title}\"\n\
         Abstract: \"{abstract_text}\""
    )
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(rename = "Category")]
    category: Option<String>,
    #[serde(rename = "Authors")]
    authors: Option<String>,
}

/// Strip a surrounding Markdown code fence, if the model added one.
fn unfence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Interpret one model reply.
///
/// Malformed JSON is `Failed` so the policy asks again. A category outside
/// the closed set becomes [`Category::Unknown`] and missing or blank
/// authors become `"Unknown"`.
pub fn parse_classification(reply: &str) -> Attempt<Classification> {
    let parsed: Reply = match serde_json::from_str(unfence(reply)) {
        Ok(parsed) => parsed,
        Err(e) => {
            if looks_truncated(&e) {
                warn!(error = %e, "EOF while parsing model reply");
            }
            warn!(
                error = %e,
                response_preview = %truncate_for_log(reply, 300),
                "Model returned non-conforming JSON"
            );
            return Attempt::Failed(ScrapeError::Parse(format!("invalid model reply: {e}")));
        }
    };

    let category = parsed
        .category
        .as_deref()
        .map(Category::from_label)
        .unwrap_or(Category::Unknown);
    let authors = parsed
        .authors
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    Attempt::Success(Classification { category, authors })
}

pub struct Classifier<M> {
    client: M,
    policy: RetryPolicy,
}

impl<M: ModelClient> Classifier<M> {
    pub fn new(client: M, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Classify one paper, keeping the retry bookkeeping.
    #[instrument(level = "info", skip_all, fields(title = %truncate_for_log(title, 80)))]
    pub async fn classify_with_report(
        &self,
        title: &str,
        abstract_text: &str,
    ) -> RetryReport<Classification> {
        let prompt = classification_prompt(title, abstract_text);
        let prompt = prompt.as_str();
        let client = &self.client;

        self.policy
            .run_with_backoff(title, move |_| async move {
                match client.complete(prompt).await {
                    Ok(reply) => parse_classification(&reply),
                    Err(e @ ScrapeError::RateLimited { .. }) => Attempt::RateLimited(e),
                    Err(e) => Attempt::Skipped(e.to_string()),
                }
            })
            .await
    }

    /// Classify one paper; never fails, see [`Classification::error`].
    pub async fn classify(&self, title: &str, abstract_text: &str) -> Classification {
        let report = self.classify_with_report(title, abstract_text).await;
        match report.settled {
            Settled::Success(classification) => {
                info!(
                    category = %classification.category,
                    attempts = report.attempts,
                    "Classified paper"
                );
                classification
            }
            Settled::Skipped(reason) => {
                warn!(%reason, "Error classifying paper");
                Classification::error()
            }
            Settled::Failed(e) => {
                warn!(error = %e, "Max retries reached; recording error");
                Classification::error()
            }
        }
    }
}

/// Classify `records` with up to `concurrency` requests in flight.
///
/// Results are returned in the order of `records`.
pub async fn classify_records<M: ModelClient>(
    classifier: &Classifier<M>,
    records: &[PaperRecord],
    concurrency: usize,
) -> Vec<Classification> {
    let total = records.len();
    info!(total, concurrency, "Starting classification");
    stream::iter(records)
        .map(|record| classifier.classify(&record.title, &record.abstract_text))
        .buffered(concurrency.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Replays canned replies in order; the last one repeats forever.
    struct Scripted {
        replies: Mutex<VecDeque<Result<String>>>,
        calls: AtomicU32,
    }

    fn rate_limited() -> ScrapeError {
        ScrapeError::RateLimited {
            url: "model".into(),
            message: "429 ResourceExhausted".into(),
        }
    }

    fn clone_reply(reply: &Result<String>) -> Result<String> {
        match reply {
            Ok(s) => Ok(s.clone()),
            Err(ScrapeError::RateLimited { .. }) => Err(rate_limited()),
            Err(e) => Err(ScrapeError::Config(e.to_string())),
        }
    }

    impl Scripted {
        fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ModelClient for Scripted {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock().unwrap();
            if replies.len() > 1 {
                replies.pop_front().unwrap()
            } else {
                clone_reply(replies.front().unwrap())
            }
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_secs(10))
    }

    #[test]
    fn test_prompt_lists_every_label() {
        let prompt = classification_prompt("Deep Nets", "");
        for label in Category::LABELS {
            assert!(prompt.contains(label.label()));
        }
        assert!(prompt.contains("Title: \"Deep Nets\""));
        assert!(prompt.contains(NO_ABSTRACT));
    }

    #[test]
    fn test_parse_known_category() {
        let reply = r#"{"Category": "Computer Vision", "Authors": "A. Author, B. Author"}"#;
        match parse_classification(reply) {
            Attempt::Success(c) => {
                assert_eq!(c.category, Category::ComputerVision);
                assert_eq!(c.authors, "A. Author, B. Author");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_out_of_set_category_is_unknown() {
        let reply = "```json\n{\"Category\": \"Quantum Basket Weaving\"}\n```";
        match parse_classification(reply) {
            Attempt::Success(c) => {
                assert_eq!(c.category, Category::Unknown);
                assert_eq!(c.authors, "Unknown");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_malformed_json_is_retryable() {
        assert!(matches!(
            parse_classification(r#"{"Category": "Computer Vis"#),
            Attempt::Failed(ScrapeError::Parse(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_five_rate_limits_end_in_error_after_three_attempts() {
        let classifier = Classifier::new(
            Scripted::new((0..5).map(|_| Err(rate_limited())).collect()),
            policy(),
        );

        let t0 = tokio::time::Instant::now();
        let report = classifier.classify_with_report("Paper", "Abstract").await;

        assert_eq!(report.attempts, 3);
        assert_eq!(
            report.delays,
            vec![
                Duration::from_secs(10),
                Duration::from_secs(20),
                Duration::from_secs(40)
            ]
        );
        assert_eq!(t0.elapsed(), Duration::from_secs(70));
        assert!(matches!(
            report.settled,
            Settled::Failed(ScrapeError::ExhaustedRetries { attempts: 3, .. })
        ));
        assert_eq!(classifier.client.calls(), 3);

        let classification = Classifier::new(
            Scripted::new(vec![Err(rate_limited())]),
            policy(),
        )
        .classify("Paper", "Abstract")
        .await;
        assert_eq!(classification, Classification::error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_reply_retried_without_sleep() {
        let classifier = Classifier::new(
            Scripted::new(vec![
                Ok("not json".into()),
                Ok(r#"{"Category": "Reinforcement Learning", "Authors": "R. Sutton"}"#.into()),
            ]),
            policy(),
        );

        let t0 = tokio::time::Instant::now();
        let report = classifier.classify_with_report("RL", "").await;
        assert_eq!(report.attempts, 2);
        assert!(report.delays.is_empty());
        assert_eq!(t0.elapsed(), Duration::ZERO);
        match report.settled {
            Settled::Success(c) => assert_eq!(c.category, Category::ReinforcementLearning),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_error_is_terminal() {
        let classifier = Classifier::new(
            Scripted::new(vec![Err(ScrapeError::Config("bad api key".into()))]),
            policy(),
        );
        assert_eq!(classifier.classify("Paper", "").await, Classification::error());
        assert_eq!(classifier.client.calls(), 1);
    }

    #[tokio::test]
    async fn test_classify_records_keeps_input_order() {
        let classifier = Classifier::new(
            Scripted::new(vec![
                Ok(r#"{"Category": "Computer Vision", "Authors": "A"}"#.into()),
                Ok(r#"{"Category": "Optimization Algorithms", "Authors": "B"}"#.into()),
            ]),
            policy(),
        );
        let records: Vec<PaperRecord> = ["first", "second"]
            .iter()
            .map(|t| PaperRecord {
                year: "2024".into(),
                title: t.to_string(),
                abstract_text: String::new(),
                file_path: PathBuf::from(format!("2024/{t}.pdf")),
            })
            .collect();

        // One at a time so the scripted replies line up with the records.
        let results = classify_records(&classifier, &records, 1).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].category, Category::ComputerVision);
        assert_eq!(results[1].category, Category::Optimization);
    }
}
