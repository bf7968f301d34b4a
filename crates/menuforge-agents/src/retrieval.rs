//! Knowledge retrieval: grounding client and document-derived corpus
//!
//! The pipeline grounds builder and critique claims in passages retrieved
//! for two canonical topics (menu facts and the style guide). The
//! [`GroundingClient`] is the thin wrapper the controller talks to: it
//! applies the per-step timeout and bounded immediate retries, and degrades
//! to an explicitly recorded ungrounded state when the budget is spent.
//! Empty results are NOT degradation; they simply mean the corpus had
//! nothing relevant.

use crate::error::RetrievalError;
use crate::retry::with_retries;
use crate::services::{Passage, RetrievalService};
use menuforge_model::ContentBlock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Canonical grounding topics the pipeline queries for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroundingTopic {
    /// Item names, prices, customer-facing descriptions
    MenuFacts,
    /// Branding, design, and style guidance
    StyleGuide,
}

impl GroundingTopic {
    /// Both topics, in query order
    pub const ALL: [GroundingTopic; 2] = [GroundingTopic::MenuFacts, GroundingTopic::StyleGuide];

    /// The query issued for this topic
    #[inline]
    #[must_use]
    pub fn query(&self) -> &'static str {
        match self {
            GroundingTopic::MenuFacts => {
                "List all menu items with their name, price, and full customer-facing description."
            }
            GroundingTopic::StyleGuide => {
                "List all branding, design, and style guide details."
            }
        }
    }

    /// Short label for logs and degradation records
    #[inline]
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            GroundingTopic::MenuFacts => "menu facts",
            GroundingTopic::StyleGuide => "style guide",
        }
    }
}

/// Aggregated grounding context passed to builder and critique
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundingContext {
    /// Passages answering the menu-facts query
    pub menu_passages: Vec<Passage>,
    /// Passages answering the style-guide query
    pub style_passages: Vec<Passage>,
    /// Topics whose retrieval failed after the retry budget (ungrounded)
    pub degraded_topics: Vec<GroundingTopic>,
}

impl GroundingContext {
    /// A context with no passages and no degradation
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether any topic proceeded ungrounded after retrieval failure
    #[inline]
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.degraded_topics.is_empty()
    }

    /// Whether there is nothing to ground claims against
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.menu_passages.is_empty() && self.style_passages.is_empty()
    }

    /// First passage mentioning `needle`, menu passages first
    #[must_use]
    pub fn passage_for(&self, needle: &str) -> Option<&Passage> {
        let needle = needle.to_lowercase();
        self.menu_passages
            .iter()
            .chain(self.style_passages.iter())
            .find(|p| p.text.to_lowercase().contains(&needle))
    }
}

/// Thin retrieval client: per-call timeout, bounded retry, then degrade
pub struct GroundingClient {
    service: Arc<dyn RetrievalService>,
    retry_limit: u32,
    timeout: Duration,
}

impl GroundingClient {
    /// Create a client over a retrieval service
    #[must_use]
    pub fn new(service: Arc<dyn RetrievalService>, retry_limit: u32, timeout: Duration) -> Self {
        Self {
            service,
            retry_limit,
            timeout,
        }
    }

    /// Gather grounding for all canonical topics
    ///
    /// Never fails: topics whose retrieval errors out after the retry budget
    /// are recorded in `degraded_topics` and the run proceeds ungrounded for
    /// them.
    pub async fn gather(&self) -> GroundingContext {
        let mut context = GroundingContext::empty();
        for topic in GroundingTopic::ALL {
            match with_retries(topic.label(), self.retry_limit, || self.query_once(topic)).await {
                Ok(passages) => {
                    if passages.is_empty() {
                        tracing::debug!(topic = topic.label(), "no relevant passages");
                    }
                    match topic {
                        GroundingTopic::MenuFacts => context.menu_passages = passages,
                        GroundingTopic::StyleGuide => context.style_passages = passages,
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        topic = topic.label(),
                        %error,
                        "retrieval degraded, proceeding ungrounded"
                    );
                    context.degraded_topics.push(topic);
                }
            }
        }
        context
    }

    async fn query_once(&self, topic: GroundingTopic) -> Result<Vec<Passage>, RetrievalError> {
        match tokio::time::timeout(self.timeout, self.service.query(topic.query())).await {
            Ok(result) => result,
            Err(_) => Err(RetrievalError::Timeout),
        }
    }
}

/// Retrieval over a corpus indexed from the source document's own blocks
///
/// This is the in-process corpus implementation: item records and free-text
/// blocks are indexed at extraction time and ranked by keyword overlap.
#[derive(Debug, Clone, Default)]
pub struct DocumentRetrieval {
    entries: Vec<IndexedPassage>,
}

#[derive(Debug, Clone)]
struct IndexedPassage {
    tokens: BTreeSet<String>,
    passage: Passage,
}

impl DocumentRetrieval {
    /// Index a corpus from extracted content blocks
    #[must_use]
    pub fn from_blocks(blocks: &[ContentBlock]) -> Self {
        let mut entries = Vec::new();
        for block in blocks {
            match block {
                ContentBlock::Text(text) => {
                    entries.push(IndexedPassage {
                        tokens: tokenize(text),
                        passage: Passage::new(text.clone(), 0.0, "document text"),
                    });
                }
                ContentBlock::Item(record) => {
                    let mut text = record.name.clone();
                    if !record.description.is_empty() {
                        text.push_str(". ");
                        text.push_str(&record.description);
                    }
                    if let Some(price) = record.price {
                        text.push_str(&format!(". Price {price}"));
                    }
                    let source = match &record.category {
                        Some(category) => format!("menu item ({category})"),
                        None => "menu item".to_string(),
                    };
                    entries.push(IndexedPassage {
                        tokens: tokenize(&text),
                        passage: Passage::new(text, 0.0, source),
                    });
                }
                ContentBlock::ImageAnchor(_) => {}
            }
        }
        Self { entries }
    }

    /// Number of indexed passages
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the corpus is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait::async_trait]
impl RetrievalService for DocumentRetrieval {
    async fn query(&self, text: &str) -> Result<Vec<Passage>, RetrievalError> {
        let query_tokens = tokenize(text);
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<Passage> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let matched = query_tokens.intersection(&entry.tokens).count();
                if matched == 0 {
                    return None;
                }
                #[allow(clippy::cast_precision_loss)]
                let score = matched as f32 / query_tokens.len() as f32;
                let mut passage = entry.passage.clone();
                passage.score = score;
                Some(passage)
            })
            .collect();

        // Stable sort keeps document order among equal scores.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored)
    }
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 3)
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use menuforge_model::{Currency, ItemRecord, Price};
    use std::sync::atomic::{AtomicU32, Ordering};

    mockall::mock! {
        Retrieval {}

        #[async_trait::async_trait]
        impl RetrievalService for Retrieval {
            async fn query(&self, text: &str) -> Result<Vec<Passage>, RetrievalError>;
        }
    }

    fn sample_blocks() -> Vec<ContentBlock> {
        vec![
            ContentBlock::Text(
                "Brand & Style\nWarm wood tones, navy accents, chalk headers.".to_string(),
            ),
            ContentBlock::Item(
                ItemRecord::named("Crispy Calamari")
                    .with_description("Golden fried calamari with lemon aioli")
                    .with_price(Price::new(1250, Currency::Usd)),
            ),
            ContentBlock::Item(
                ItemRecord::named("Pier 39 Ribeye")
                    .with_description("Dry-aged ribeye with scallion butter")
                    .with_price(Price::new(3800, Currency::Usd))
                    .with_category("Mains"),
            ),
        ]
    }

    #[tokio::test]
    async fn document_corpus_ranks_by_overlap() {
        let corpus = DocumentRetrieval::from_blocks(&sample_blocks());
        let passages = corpus.query("crispy calamari price").await.unwrap();

        assert!(!passages.is_empty());
        assert!(passages[0].text.contains("Crispy Calamari"));
        assert!(passages[0].score > 0.0);
    }

    #[tokio::test]
    async fn document_corpus_empty_result_is_not_an_error() {
        let corpus = DocumentRetrieval::from_blocks(&sample_blocks());
        let passages = corpus.query("submarine propulsion").await.unwrap();
        assert!(passages.is_empty());
    }

    #[tokio::test]
    async fn gather_recovers_from_transient_failure() {
        let mut service = MockRetrieval::new();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        service.expect_query().returning(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(RetrievalError::Transport("connection reset".to_string()))
            } else {
                Ok(vec![Passage::new("menu facts", 1.0, "corpus")])
            }
        });

        let client = GroundingClient::new(Arc::new(service), 2, Duration::from_secs(1));
        let context = client.gather().await;

        assert!(!context.is_degraded());
        assert_eq!(context.menu_passages.len(), 1);
        assert_eq!(context.style_passages.len(), 1);
    }

    #[tokio::test]
    async fn gather_degrades_after_budget_spent() {
        let mut service = MockRetrieval::new();
        service
            .expect_query()
            .returning(|_| Err(RetrievalError::Transport("service down".to_string())));

        let client = GroundingClient::new(Arc::new(service), 1, Duration::from_secs(1));
        let context = client.gather().await;

        assert!(context.is_degraded());
        assert_eq!(context.degraded_topics, GroundingTopic::ALL.to_vec());
        assert!(context.is_empty());
    }

    struct SlowRetrieval(Duration);

    #[async_trait::async_trait]
    impl RetrievalService for SlowRetrieval {
        async fn query(&self, _text: &str) -> Result<Vec<Passage>, RetrievalError> {
            tokio::time::sleep(self.0).await;
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn gather_times_out_slow_service() {
        let client = GroundingClient::new(
            Arc::new(SlowRetrieval(Duration::from_millis(100))),
            0,
            Duration::from_millis(5),
        );
        let context = client.gather().await;
        assert!(context.is_degraded());
    }

    #[test]
    fn passage_for_searches_menu_passages_first() {
        let context = GroundingContext {
            menu_passages: vec![Passage::new("Crispy Calamari. Price $12.50", 1.0, "menu")],
            style_passages: vec![Passage::new("calamari photography notes", 0.5, "style")],
            degraded_topics: Vec::new(),
        };
        let hit = context.passage_for("Calamari").unwrap();
        assert!(hit.text.contains("Price"));
    }
}
