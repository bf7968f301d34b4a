//! Menuforge Core - Orchestration Controller
//!
//! The state machine driving the pipeline:
//! - Extracts the proposal into the normalized content model
//! - Runs image analysis and grounding retrieval with bounded parallelism
//! - Drives the build -> critique -> revise loop within the iteration budget
//! - Records every degradation and retains every artifact version for audit
//!
//! # Example
//!
//! ```rust,ignore
//! use menuforge_core::{CancelToken, Orchestrator, RunConfig};
//! use menuforge_model::{ContentType, SourceDocument};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RunConfig::new(3, 5_000, 10_000, 2);
//! let orchestrator = Orchestrator::new(config);
//!
//! let document = SourceDocument::new(std::fs::read("proposal.md")?, ContentType::Markdown);
//! let report = orchestrator.run(&document, &CancelToken::new()).await?;
//!
//! println!("{} after {} iterations", report.summary.final_status, report.summary.iterations_used);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cancel;
pub mod config;
pub mod controller;
pub mod state;
pub mod store;

pub use cancel::CancelToken;
pub use config::{ConfigError, RunConfig};
pub use controller::{Orchestrator, RunError, RunReport, RunSummary};
pub use state::{
    allowed_transitions, validate_transition, Degradation, IterationRecord, OrchestrationState,
    Phase, RunStatus, StateError,
};
pub use store::{ArtifactStore, FsArtifactStore, StoreError};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the pipeline
    pub use crate::{
        ArtifactStore, CancelToken, FsArtifactStore, Orchestrator, Phase, RunConfig, RunError,
        RunReport, RunStatus,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
