//! Menuforge Agents
//!
//! The specialized agents of the pipeline and the capability contracts they
//! implement:
//!
//! - [`RetrievalService`] / [`GroundingClient`] / [`DocumentRetrieval`]:
//!   grounding queries with bounded retry, degrading to explicitly recorded
//!   ungrounded state
//! - [`AnalysisService`] / [`AnalysisRunner`] / [`HeuristicAnalysis`]:
//!   per-image analysis, memoized and concurrency-bounded, degrading
//!   per-asset to placeholders
//! - [`BuilderService`] / [`MenuBuilder`]: artifact synthesis
//! - [`CritiqueService`] / [`MenuCritic`]: checklist review
//!
//! Every agent call is a pure function of its declared inputs; no agent
//! holds cross-iteration mutable state.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod analysis;
mod builder;
mod critique;
mod error;
mod retrieval;
mod retry;
mod services;

pub use analysis::{AnalysisOutcome, AnalysisRunner, HeuristicAnalysis};
pub use builder::{escape_html, MenuBuilder};
pub use critique::MenuCritic;
pub use error::{AnalysisError, BuildError, CritiqueError, RetrievalError};
pub use retrieval::{DocumentRetrieval, GroundingClient, GroundingContext, GroundingTopic};
pub use retry::with_retries;
pub use services::{
    AnalysisService, BuilderService, CritiqueService, Passage, RetrievalService,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
