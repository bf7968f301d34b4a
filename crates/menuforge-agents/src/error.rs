//! Error types for the agent layer
//!
//! The taxonomy mirrors each component's failure policy:
//! - retrieval and critique failures are transport-level and retryable
//! - analysis failures degrade per-asset to a placeholder
//! - build failures are structural and fatal to the run

/// Retrieval service failures
///
/// An empty result set is NOT an error; callers must treat "no relevant
/// passage" and "service unreachable" differently.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// Transport/service failure
    #[error("retrieval transport failure: {0}")]
    Transport(String),

    /// Call exceeded its deadline
    #[error("retrieval call timed out")]
    Timeout,
}

/// Multimodal analysis failures (recoverable per-asset)
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Transport/service failure
    #[error("analysis transport failure: {0}")]
    Transport(String),

    /// Call exceeded its deadline
    #[error("analysis call timed out")]
    Timeout,

    /// Asset carries nothing the analyzer can describe
    #[error("asset has no descriptive signal: {0}")]
    NoSignal(String),
}

/// Builder agent failures (fatal: synthesis inputs are structurally invalid)
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The item list was empty
    #[error("cannot build an artifact from an empty item list")]
    NoItems,

    /// Assembled content violated artifact invariants
    #[error("artifact assembly failed: {0}")]
    Artifact(#[from] menuforge_model::ArtifactError),

    /// Transport failure of a remote builder
    #[error("builder transport failure: {0}")]
    Transport(String),

    /// Call exceeded its deadline
    #[error("build call timed out")]
    Timeout,
}

/// Critique agent failures
///
/// Only transport-level failures are errors; a bad artifact is a failing
/// [`menuforge_model::Verdict`], never an error.
#[derive(Debug, thiserror::Error)]
pub enum CritiqueError {
    /// Transport/service failure
    #[error("critique transport failure: {0}")]
    Transport(String),

    /// Call exceeded its deadline
    #[error("critique call timed out")]
    Timeout,
}
