//! Multimodal analysis front-end
//!
//! [`AnalysisRunner`] drives per-image analysis calls: one invocation per
//! distinct anchor id, memoized for the run's lifetime, issued with bounded
//! parallelism and a per-call timeout. Failures never abort the run; the
//! affected anchor degrades to an explicitly recorded placeholder.

use crate::error::AnalysisError;
use crate::retry::with_retries;
use crate::services::AnalysisService;
use dashmap::DashMap;
use indexmap::IndexMap;
use menuforge_model::{AnchorId, ImageAsset, ImageDescription};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Result of the analysis phase
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    /// One entry per distinct anchor: analyzed or placeholder
    pub descriptions: IndexMap<AnchorId, ImageDescription>,
    /// Anchors that degraded to placeholders
    pub degraded: Vec<AnchorId>,
}

/// Memoized, concurrency-bounded analysis driver
pub struct AnalysisRunner {
    service: Arc<dyn AnalysisService>,
    memo: DashMap<AnchorId, ImageDescription>,
    semaphore: Arc<Semaphore>,
    timeout: Duration,
    retry_limit: u32,
}

impl AnalysisRunner {
    /// Create a runner over an analysis service
    #[must_use]
    pub fn new(
        service: Arc<dyn AnalysisService>,
        concurrency: usize,
        timeout: Duration,
        retry_limit: u32,
    ) -> Self {
        Self {
            service,
            memo: DashMap::new(),
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            timeout,
            retry_limit,
        }
    }

    /// Resolve a description for every asset
    ///
    /// Completes only once every distinct anchor has either an analyzed
    /// description or a recorded placeholder. Never fails.
    pub async fn describe_all(&self, assets: &[ImageAsset]) -> AnalysisOutcome {
        let mut seen = BTreeSet::new();
        let distinct: Vec<&ImageAsset> = assets
            .iter()
            .filter(|asset| seen.insert(asset.anchor.clone()))
            .collect();

        let results =
            futures::future::join_all(distinct.iter().map(|asset| self.describe_one(asset))).await;

        let mut outcome = AnalysisOutcome::default();
        for (anchor, description, degraded) in results {
            if degraded {
                outcome.degraded.push(anchor.clone());
            }
            outcome.descriptions.insert(anchor, description);
        }
        outcome
    }

    async fn describe_one(&self, asset: &ImageAsset) -> (AnchorId, ImageDescription, bool) {
        let anchor = asset.anchor.clone();
        if let Some(hit) = self.memo.get(&anchor) {
            let description = hit.value().clone();
            drop(hit);
            return (anchor, description, false);
        }

        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore is never closed");

        match with_retries("image analysis", self.retry_limit, || self.analyze_once(asset)).await
        {
            Ok(description) => {
                self.memo.insert(anchor.clone(), description.clone());
                (anchor, description, false)
            }
            Err(error) => {
                tracing::warn!(anchor = %anchor, %error, "analysis degraded to placeholder");
                (anchor.clone(), ImageDescription::placeholder(anchor), true)
            }
        }
    }

    async fn analyze_once(&self, asset: &ImageAsset) -> Result<ImageDescription, AnalysisError> {
        match tokio::time::timeout(self.timeout, self.service.analyze(asset)).await {
            Ok(result) => result,
            Err(_) => Err(AnalysisError::Timeout),
        }
    }
}

/// Analysis over the descriptive names the image preprocessing step emits
///
/// The preprocessing step names extracted files after the dish they depict
/// (`pier_39_ribeye.png`), so the filename plus the anchor's alt text carry
/// enough signal for tags and a caption.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAnalysis;

impl HeuristicAnalysis {
    /// Create a new analyzer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl AnalysisService for HeuristicAnalysis {
    async fn analyze(&self, asset: &ImageAsset) -> Result<ImageDescription, AnalysisError> {
        let file = asset
            .reference
            .rsplit('/')
            .next()
            .unwrap_or(&asset.reference);
        let stem = file.split('.').next().unwrap_or(file);
        let tokens: Vec<String> = stem
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();

        if tokens.is_empty() && asset.alt.trim().is_empty() {
            return Err(AnalysisError::NoSignal(asset.reference.clone()));
        }

        let tags: BTreeSet<String> = tokens.iter().cloned().collect();
        let caption = if asset.alt.trim().is_empty() {
            title_case(&tokens)
        } else {
            asset.alt.trim().to_string()
        };
        Ok(ImageDescription::analyzed(asset.anchor.clone(), tags, caption))
    }
}

fn title_case(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|t| {
            let mut chars = t.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
