//! Menuforge Extraction Pipeline
//!
//! Turns an ingested proposal document into the normalized content model:
//!
//! - [`Extractor`]: deterministic Markdown-structure extractor
//! - [`Extraction`]: ordered content blocks plus referenced image assets
//! - [`ExtractError`]: fatal structural failures
//!
//! Extraction failures abort the run; partial item records do not — they are
//! retained best-effort and left to the critique agent to flag.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod pipeline;

pub use error::ExtractError;
pub use pipeline::{Extraction, Extractor};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
