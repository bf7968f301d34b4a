//! Testing utilities for the menuforge workspace
//!
//! Shared fixtures and scripted collaborator implementations for exercising
//! the orchestration loop under failure.

#![allow(missing_docs)]

use menuforge_agents::{
    AnalysisError, AnalysisService, BuildError, BuilderService, CritiqueError, CritiqueService,
    GroundingContext, HeuristicAnalysis, MenuBuilder, MenuCritic, Passage, RetrievalError,
    RetrievalService,
};
use menuforge_core::RunConfig;
use menuforge_extract::Extractor;
use menuforge_model::{
    AnchorId, Artifact, ContentType, Defect, ImageAsset, ImageDescription, Locator, MenuItem,
    SourceDocument, Verdict,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// A proposal with three items, no images, and groundable claims
pub const PROPOSAL_NO_IMAGES: &str = r#"# Harborview Grill - Strategy Proposal

A waterfront bistro concept for the pier district.

## Brand & Style

Warm wood tones, navy accents, hand-drawn chalk headers.

## Menu

### Starters

#### Crispy Calamari

Golden fried calamari with lemon aioli.

Price: $12.50

#### House Salad

Greens, radish, citrus vinaigrette.

Price: $8.00

### Mains

#### Pier 39 Ribeye

Dry-aged ribeye, charred scallion butter.

Price: $38.00
"#;

/// A proposal whose single item references an image anchor
pub const PROPOSAL_WITH_IMAGE: &str = r#"# Harborview Grill - Strategy Proposal

## Brand & Style

Navy and brass, natural light.

## Menu

### Catch of the Day

Seared catch with brown butter.

Price: $24.00

![seared catch plated](images/catch_of_the_day.png)
"#;

/// Ingest a fixture as a Markdown source document
#[must_use]
pub fn document(text: &str) -> SourceDocument {
    SourceDocument::new(text.as_bytes().to_vec(), ContentType::Markdown)
}

/// A run configuration suitable for fast tests
#[must_use]
pub fn test_config(max_iterations: u32) -> RunConfig {
    RunConfig::new(max_iterations, 1_000, 1_000, 2).with_analysis_concurrency(2)
}

/// The document-derived corpus for a fixture, as the controller would build
#[must_use]
pub fn derived_corpus(source: &SourceDocument) -> menuforge_agents::DocumentRetrieval {
    let extraction = Extractor::new()
        .extract(source)
        .expect("fixture must extract");
    menuforge_agents::DocumentRetrieval::from_blocks(&extraction.blocks)
}

/// Retrieval that fails its first `failures` calls, then delegates
pub struct FlakyRetrieval {
    inner: Arc<dyn RetrievalService>,
    remaining: AtomicU32,
}

impl FlakyRetrieval {
    pub fn new(inner: Arc<dyn RetrievalService>, failures: u32) -> Self {
        Self {
            inner,
            remaining: AtomicU32::new(failures),
        }
    }
}

#[async_trait::async_trait]
impl RetrievalService for FlakyRetrieval {
    async fn query(&self, text: &str) -> Result<Vec<Passage>, RetrievalError> {
        if self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(RetrievalError::Transport("connection reset".to_string()));
        }
        self.inner.query(text).await
    }
}

/// Analysis that fails for a set of anchors, delegating otherwise
pub struct FailingAnalysis {
    broken: BTreeSet<AnchorId>,
    inner: HeuristicAnalysis,
}

impl FailingAnalysis {
    pub fn broken_for(anchors: impl IntoIterator<Item = AnchorId>) -> Self {
        Self {
            broken: anchors.into_iter().collect(),
            inner: HeuristicAnalysis::new(),
        }
    }
}

#[async_trait::async_trait]
impl AnalysisService for FailingAnalysis {
    async fn analyze(&self, asset: &ImageAsset) -> Result<ImageDescription, AnalysisError> {
        if self.broken.contains(&asset.anchor) {
            return Err(AnalysisError::Transport("image undecodable".to_string()));
        }
        self.inner.analyze(asset).await
    }
}

/// Builder that drops one item's price until feedback names that item
///
/// With `stubborn`, the price is never restored, so the same blocking defect
/// survives every revision.
pub struct PriceDroppingBuilder {
    inner: MenuBuilder,
    target: String,
    stubborn: bool,
}

impl PriceDroppingBuilder {
    pub fn until_feedback(target: impl Into<String>) -> Self {
        Self {
            inner: MenuBuilder::new(),
            target: target.into(),
            stubborn: false,
        }
    }

    pub fn stubborn(target: impl Into<String>) -> Self {
        Self {
            stubborn: true,
            ..Self::until_feedback(target)
        }
    }

    fn feedback_names_target(&self, feedback: Option<&[Defect]>) -> bool {
        feedback.is_some_and(|defects| {
            defects.iter().any(|d| match &d.locator {
                Locator::Item { name, .. } => name == &self.target,
                _ => false,
            })
        })
    }
}

#[async_trait::async_trait]
impl BuilderService for PriceDroppingBuilder {
    async fn build(
        &self,
        items: &[MenuItem],
        grounding: &GroundingContext,
        prior_feedback: Option<&[Defect]>,
        version: u64,
    ) -> Result<Artifact, BuildError> {
        let resolved = !self.stubborn && self.feedback_names_target(prior_feedback);
        if resolved {
            return self.inner.build(items, grounding, prior_feedback, version).await;
        }
        let altered: Vec<MenuItem> = items
            .iter()
            .cloned()
            .map(|mut item| {
                if item.name == self.target {
                    item.price = None;
                }
                item
            })
            .collect();
        self.inner.build(&altered, grounding, prior_feedback, version).await
    }
}

/// Critique that fails its first `failures` calls, then delegates
pub struct FlakyCritique {
    inner: MenuCritic,
    remaining: AtomicU32,
}

impl FlakyCritique {
    pub fn new(failures: u32) -> Self {
        Self {
            inner: MenuCritic::new(),
            remaining: AtomicU32::new(failures),
        }
    }
}

#[async_trait::async_trait]
impl CritiqueService for FlakyCritique {
    async fn review(
        &self,
        artifact: &Artifact,
        items: &[MenuItem],
        grounding: &GroundingContext,
    ) -> Result<Verdict, CritiqueError> {
        if self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(CritiqueError::Transport("review backend unavailable".to_string()));
        }
        self.inner.review(artifact, items, grounding).await
    }
}
