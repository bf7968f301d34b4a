//! Menuforge Data Model
//!
//! Typed messages passed between the pipeline's agents:
//!
//! - [`SourceDocument`]: immutable ingested proposal bytes
//! - [`ContentBlock`] / [`ItemRecord`]: normalized extraction output
//! - [`ImageAsset`] / [`ImageDescription`]: per-anchor image analysis
//! - [`MenuItem`]: canonical item, re-derived fresh each iteration
//! - [`Artifact`]: versioned synthesized document with manifest
//! - [`Defect`] / [`Verdict`]: structured critique feedback
//! - [`ContentHash`]: Blake3 content addressing
//!
//! There is no shared conversational memory anywhere in the pipeline; every
//! agent call is a pure function of values defined here.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod artifact;
mod content;
mod document;
mod hash;
mod verdict;

pub use artifact::{Affordance, Artifact, ArtifactError, Manifest};
pub use content::{
    ContentBlock, Currency, ItemRecord, MenuItem, Price, PriceError, UNNAMED_ITEM,
};
pub use document::{
    AnchorId, ContentType, DescriptionSource, ImageAsset, ImageDescription, SourceDocument,
};
pub use hash::{ContentHash, HashError};
pub use verdict::{Defect, DefectCategory, Locator, Severity, Verdict};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
