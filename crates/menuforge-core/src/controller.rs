//! Orchestration controller
//!
//! A single controller task drives the state machine
//! `INIT -> EXTRACTING -> ANALYZING -> BUILDING -> REVIEWING ->
//! {REVISING -> BUILDING | DONE_PASSED | DONE_EXHAUSTED}`, owning the retry
//! budget and routing critique feedback back to the builder. It is the only
//! writer of [`OrchestrationState`]; every agent receives per-iteration
//! inputs by value or reference, never shared mutable state.

use crate::cancel::CancelToken;
use crate::config::{ConfigError, RunConfig};
use crate::state::{
    Degradation, IterationRecord, OrchestrationState, Phase, RunStatus, StateError,
};
use menuforge_agents::{
    with_retries, AnalysisRunner, AnalysisService, BuildError, BuilderService, CritiqueError,
    CritiqueService, DocumentRetrieval, GroundingClient, GroundingContext, HeuristicAnalysis,
    MenuBuilder, MenuCritic, RetrievalService,
};
use menuforge_extract::{ExtractError, Extractor};
use menuforge_model::{Artifact, Defect, MenuItem, SourceDocument, Verdict};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Instrument as _;
use ulid::Ulid;

/// Errors that abort a run
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Configuration failed validation
    #[error("configuration invalid: {0}")]
    Config(#[from] ConfigError),

    /// Document structure could not be extracted
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    /// Builder inputs were structurally invalid
    #[error("build failed: {0}")]
    Build(#[from] BuildError),

    /// No trustworthy verdict after the retry budget
    #[error("critique failed after retries: {0}")]
    Critique(#[from] CritiqueError),

    /// External cancellation between states
    #[error("run cancelled during {0:?}")]
    Cancelled(Phase),

    /// Internal state machine violation
    #[error(transparent)]
    State(#[from] StateError),
}

impl RunError {
    /// The state in which the run failed, for user-visible reports
    #[must_use]
    pub fn failed_phase(&self) -> Option<Phase> {
        match self {
            RunError::Config(_) => Some(Phase::Init),
            RunError::Extraction(_) => Some(Phase::Extracting),
            RunError::Build(_) => Some(Phase::Building),
            RunError::Critique(_) => Some(Phase::Reviewing),
            RunError::Cancelled(phase) => Some(*phase),
            RunError::State(_) => None,
        }
    }
}

/// Run summary surfaced to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique run identifier
    pub run_id: String,
    /// Terminal status
    pub final_status: RunStatus,
    /// Build-review cycles performed
    pub iterations_used: u32,
    /// Defects still open at termination (empty when passed)
    pub unresolved_defects: Vec<Defect>,
}

/// Full report of a finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Summary for the caller
    pub summary: RunSummary,
    /// Final (best) artifact, present whenever at least one build succeeded
    pub artifact: Option<Artifact>,
    /// Every (artifact, verdict) pair, for audit
    pub history: Vec<IterationRecord>,
    /// Degradations absorbed during the run
    pub degradations: Vec<Degradation>,
}

/// The orchestration controller
///
/// Capabilities default to the in-process implementations; each can be
/// swapped independently, which is how tests inject failing collaborators.
pub struct Orchestrator {
    config: RunConfig,
    retrieval: Option<Arc<dyn RetrievalService>>,
    analysis: Arc<dyn AnalysisService>,
    builder: Arc<dyn BuilderService>,
    critique: Arc<dyn CritiqueService>,
}

impl Orchestrator {
    /// Create a controller with default capability implementations
    ///
    /// Without an explicit retrieval service, the grounding corpus is
    /// derived from the source document's own extracted blocks.
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            retrieval: None,
            analysis: Arc::new(HeuristicAnalysis::new()),
            builder: Arc::new(MenuBuilder::new()),
            critique: Arc::new(MenuCritic::new()),
        }
    }

    /// With an external retrieval service
    #[inline]
    #[must_use]
    pub fn with_retrieval(mut self, retrieval: Arc<dyn RetrievalService>) -> Self {
        self.retrieval = Some(retrieval);
        self
    }

    /// With an analysis service
    #[inline]
    #[must_use]
    pub fn with_analysis(mut self, analysis: Arc<dyn AnalysisService>) -> Self {
        self.analysis = analysis;
        self
    }

    /// With a builder service
    #[inline]
    #[must_use]
    pub fn with_builder(mut self, builder: Arc<dyn BuilderService>) -> Self {
        self.builder = builder;
        self
    }

    /// With a critique service
    #[inline]
    #[must_use]
    pub fn with_critique(mut self, critique: Arc<dyn CritiqueService>) -> Self {
        self.critique = critique;
        self
    }

    /// Run configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Drive one document through the full pipeline
    ///
    /// # Errors
    /// Returns [`RunError`] on fatal failures (extraction, build, persistent
    /// critique failure, cancellation). Exhaustion is NOT an error: the
    /// report carries [`RunStatus::Exhausted`] plus the best artifact.
    pub async fn run(
        &self,
        document: &SourceDocument,
        cancel: &CancelToken,
    ) -> Result<RunReport, RunError> {
        self.config.validate()?;
        let run_id = Ulid::new().to_string();
        let span = tracing::info_span!(
            "run",
            run_id = %run_id,
            document = %document.hash().short()
        );
        self.drive(run_id, document, cancel).instrument(span).await
    }

    async fn drive(
        &self,
        run_id: String,
        document: &SourceDocument,
        cancel: &CancelToken,
    ) -> Result<RunReport, RunError> {
        let mut state = OrchestrationState::new();

        self.enter(&mut state, Phase::Extracting, cancel)?;
        let extraction = match Extractor::new().extract(document) {
            Ok(extraction) => extraction,
            Err(error) => {
                tracing::error!(%error, "extraction failed, aborting");
                state.fail();
                return Err(error.into());
            }
        };
        tracing::info!(
            blocks = extraction.blocks.len(),
            assets = extraction.assets.len(),
            "document extracted"
        );

        self.enter(&mut state, Phase::Analyzing, cancel)?;
        let retrieval: Arc<dyn RetrievalService> = match &self.retrieval {
            Some(service) => service.clone(),
            None => Arc::new(DocumentRetrieval::from_blocks(&extraction.blocks)),
        };
        let grounding_client = GroundingClient::new(
            retrieval,
            self.config.per_step_retry_limit,
            self.config.retrieval_timeout(),
        );
        let analysis_runner = AnalysisRunner::new(
            self.analysis.clone(),
            self.config.analysis_concurrency,
            self.config.analysis_timeout(),
            self.config.per_step_retry_limit,
        );

        // In-flight analysis is abandoned on cancellation, not awaited.
        let (outcome, grounding) = tokio::select! {
            () = cancel.cancelled() => {
                tracing::warn!("run cancelled, discarding in-flight analysis");
                state.fail();
                return Err(RunError::Cancelled(Phase::Analyzing));
            }
            pair = async {
                tokio::join!(
                    analysis_runner.describe_all(&extraction.assets),
                    grounding_client.gather()
                )
            } => pair,
        };
        for anchor in &outcome.degraded {
            state.record_degradation(Degradation::AnalysisPlaceholder {
                anchor: anchor.clone(),
            });
        }
        for topic in &grounding.degraded_topics {
            state.record_degradation(Degradation::RetrievalDegraded { topic: *topic });
        }

        let mut feedback: Option<Vec<Defect>> = None;
        loop {
            self.enter(&mut state, Phase::Building, cancel)?;
            // Menu items are derived views: rebuilt fresh every iteration.
            let items = MenuItem::derive(&extraction.blocks, &outcome.descriptions);
            let version = u64::from(state.iteration()) + 1;
            let artifact = match self
                .build_once(&items, &grounding, feedback.as_deref(), version)
                .await
            {
                Ok(artifact) => artifact,
                Err(error) => {
                    tracing::error!(%error, "build failed, aborting");
                    state.fail();
                    return Err(error.into());
                }
            };
            if let Some(prior) = feedback.as_deref() {
                let blocking = prior.iter().filter(|d| d.is_blocking()).count();
                if artifact.manifest().acknowledged_defects < blocking {
                    tracing::warn!(
                        acknowledged = artifact.manifest().acknowledged_defects,
                        blocking,
                        "builder did not acknowledge all blocking defects"
                    );
                }
            }

            self.enter(&mut state, Phase::Reviewing, cancel)?;
            let verdict = match with_retries("critique", self.config.per_step_retry_limit, || {
                self.review_once(&artifact, &items, &grounding)
            })
            .await
            {
                Ok(verdict) => verdict,
                Err(error) => {
                    tracing::error!(%error, "no trustworthy verdict available, aborting");
                    state.fail();
                    return Err(error.into());
                }
            };
            tracing::info!(
                version = artifact.version(),
                pass = verdict.pass(),
                blocking = verdict.blocking().count(),
                "iteration reviewed"
            );
            state.record_iteration(artifact, verdict.clone());

            if verdict.pass() {
                state.advance(Phase::DonePassed)?;
                break;
            }
            if state.iteration() < self.config.max_iterations {
                self.enter(&mut state, Phase::Revising, cancel)?;
                feedback = Some(verdict.defects().to_vec());
            } else {
                tracing::warn!(
                    iterations = state.history().len(),
                    "iteration budget spent, returning best artifact with warning"
                );
                state.advance(Phase::DoneExhausted)?;
                break;
            }
        }

        let unresolved_defects = match state.status() {
            RunStatus::Passed => Vec::new(),
            _ => state
                .history()
                .last()
                .map(|record| record.verdict.defects().to_vec())
                .unwrap_or_default(),
        };
        #[allow(clippy::cast_possible_truncation)]
        let iterations_used = state.history().len() as u32;

        Ok(RunReport {
            summary: RunSummary {
                run_id,
                final_status: state.status(),
                iterations_used,
                unresolved_defects,
            },
            artifact: state.best_artifact().cloned(),
            history: state.history().to_vec(),
            degradations: state.degradations().to_vec(),
        })
    }

    /// Advance to a non-terminal phase, honoring cancellation between states
    fn enter(
        &self,
        state: &mut OrchestrationState,
        to: Phase,
        cancel: &CancelToken,
    ) -> Result<(), RunError> {
        if cancel.is_cancelled() {
            let at = state.phase();
            tracing::warn!(phase = ?at, "run cancelled between states");
            state.fail();
            return Err(RunError::Cancelled(at));
        }
        state.advance(to).map_err(RunError::from)
    }

    /// One build call with timeout; transient failures get immediate retries
    async fn build_once(
        &self,
        items: &[MenuItem],
        grounding: &GroundingContext,
        feedback: Option<&[Defect]>,
        version: u64,
    ) -> Result<Artifact, BuildError> {
        let mut attempt: u32 = 0;
        loop {
            let result = match tokio::time::timeout(
                self.config.review_timeout(),
                self.builder.build(items, grounding, feedback, version),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(BuildError::Timeout),
            };
            match result {
                Err(error @ (BuildError::Timeout | BuildError::Transport(_)))
                    if attempt < self.config.per_step_retry_limit =>
                {
                    attempt += 1;
                    tracing::warn!(%error, attempt, "transient build failure, retrying");
                }
                other => return other,
            }
        }
    }

    async fn review_once(
        &self,
        artifact: &Artifact,
        items: &[MenuItem],
        grounding: &GroundingContext,
    ) -> Result<Verdict, CritiqueError> {
        match tokio::time::timeout(
            self.config.review_timeout(),
            self.critique.review(artifact, items, grounding),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(CritiqueError::Timeout),
        }
    }
}
