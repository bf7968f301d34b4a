//! Capability contracts
//!
//! Each capability the pipeline consumes is an explicit trait, independently
//! substitutable and mockable. There is no dynamic tool dispatch: the
//! controller is handed one implementation of each at construction time, and
//! every call is a pure function of its declared inputs.

use crate::error::{AnalysisError, BuildError, CritiqueError, RetrievalError};
use crate::retrieval::GroundingContext;
use menuforge_model::{Artifact, Defect, ImageAsset, ImageDescription, MenuItem, Verdict};
use serde::{Deserialize, Serialize};

/// A ranked grounding passage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Passage text
    pub text: String,
    /// Relevance score (higher ranks first)
    pub score: f32,
    /// Where the passage came from (block kind, section title, ...)
    pub source: String,
}

impl Passage {
    /// Create a new passage
    #[inline]
    #[must_use]
    pub fn new(text: impl Into<String>, score: f32, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            score,
            source: source.into(),
        }
    }
}

/// Answers grounding queries against an indexed corpus
#[async_trait::async_trait]
pub trait RetrievalService: Send + Sync {
    /// Query the corpus; ranked passages, best first
    ///
    /// An empty result means the corpus has nothing relevant — that is not
    /// an error.
    ///
    /// # Errors
    /// [`RetrievalError`] only on transport/service failure
    async fn query(&self, text: &str) -> Result<Vec<Passage>, RetrievalError>;
}

/// Produces a semantic description for an image asset
#[async_trait::async_trait]
pub trait AnalysisService: Send + Sync {
    /// Analyze one asset
    ///
    /// Idempotent given the same asset; the runner memoizes per anchor for
    /// the run's lifetime.
    ///
    /// # Errors
    /// [`AnalysisError`] on failure; the orchestration degrades the affected
    /// item to a placeholder description rather than aborting
    async fn analyze(&self, asset: &ImageAsset) -> Result<ImageDescription, AnalysisError>;
}

/// Synthesizes a versioned artifact from menu items and grounding context
#[async_trait::async_trait]
pub trait BuilderService: Send + Sync {
    /// Build artifact version `version`
    ///
    /// # Contract
    /// - every item appears exactly once (no duplication, no omission)
    /// - blocking defects in `prior_feedback` must be attempted
    /// - the manifest declares all required affordance markers
    ///
    /// # Errors
    /// [`BuildError`] when inputs are structurally invalid (fatal)
    async fn build(
        &self,
        items: &[MenuItem],
        grounding: &GroundingContext,
        prior_feedback: Option<&[Defect]>,
        version: u64,
    ) -> Result<Artifact, BuildError>;
}

/// Reviews an artifact version against the critique checklist
#[async_trait::async_trait]
pub trait CritiqueService: Send + Sync {
    /// Review an artifact
    ///
    /// Deterministic: the same artifact and inputs yield an identical
    /// verdict.
    ///
    /// # Errors
    /// [`CritiqueError`] only on transport failure, never as a verdict
    async fn review(
        &self,
        artifact: &Artifact,
        items: &[MenuItem],
        grounding: &GroundingContext,
    ) -> Result<Verdict, CritiqueError>;
}
