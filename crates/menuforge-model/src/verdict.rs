//! Critique verdicts and structured defects
//!
//! The critique agent communicates through [`Defect`]s rather than free
//! text, so the controller can route feedback and test termination
//! independently of any agent implementation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Defect classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefectCategory {
    /// A required field of an item is absent from the artifact
    MissingField,
    /// Artifact contradicts the grounding context
    Inconsistent,
    /// Claim has no supporting grounding passage
    Ungrounded,
    /// A required interactive marker is absent
    AffordanceMissing,
    /// Anything else (cosmetic/structural nits)
    Other,
}

/// Whether a defect forces a failing verdict
///
/// Ordering: `Blocking < Advisory`, so sorting puts blocking defects first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    /// By itself forces `Verdict::pass == false`
    Blocking,
    /// Reported but does not fail the verdict
    Advisory,
}

/// Reference into the artifact a defect is anchored to
///
/// Ordering follows position in the artifact: the document head, then the
/// manifest, then items in content order.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Locator {
    /// The document as a whole
    Document,
    /// The artifact manifest
    Manifest,
    /// A specific menu entry
    Item {
        /// Zero-based position of the entry in the artifact
        position: usize,
        /// Entry name, for human-readable reports
        name: String,
    },
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Document => write!(f, "document"),
            Locator::Manifest => write!(f, "manifest"),
            Locator::Item { position, name } => write!(f, "item #{position} ({name})"),
        }
    }
}

/// A single finding from the critique checklist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defect {
    /// Classification
    pub category: DefectCategory,
    /// Blocking or advisory
    pub severity: Severity,
    /// Where in the artifact the defect was found
    pub locator: Locator,
    /// Short human-readable note
    pub note: String,
}

impl Defect {
    /// Create a blocking defect
    #[inline]
    #[must_use]
    pub fn blocking(category: DefectCategory, locator: Locator, note: impl Into<String>) -> Self {
        Self {
            category,
            severity: Severity::Blocking,
            locator,
            note: note.into(),
        }
    }

    /// Create an advisory defect
    #[inline]
    #[must_use]
    pub fn advisory(category: DefectCategory, locator: Locator, note: impl Into<String>) -> Self {
        Self {
            category,
            severity: Severity::Advisory,
            locator,
            note: note.into(),
        }
    }

    /// Whether the defect is blocking
    #[inline]
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Blocking
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:?}/{:?}] {}: {}",
            self.severity, self.category, self.locator, self.note
        )
    }
}

/// The critique agent's structured review result
///
/// # Invariants
/// - `pass` is true iff no blocking defect exists
/// - Defects are ordered blocking-first, then by locator position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pass: bool,
    defects: Vec<Defect>,
}

impl Verdict {
    /// Build a verdict from raw defects, normalizing order and deriving
    /// `pass`
    #[must_use]
    pub fn from_defects(mut defects: Vec<Defect>) -> Self {
        defects.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| a.locator.cmp(&b.locator))
        });
        let pass = !defects.iter().any(Defect::is_blocking);
        Self { pass, defects }
    }

    /// A clean passing verdict
    #[inline]
    #[must_use]
    pub fn passing() -> Self {
        Self {
            pass: true,
            defects: Vec::new(),
        }
    }

    /// Whether the artifact passed review
    #[inline]
    #[must_use]
    pub fn pass(&self) -> bool {
        self.pass
    }

    /// All defects, in normalized order
    #[inline]
    #[must_use]
    pub fn defects(&self) -> &[Defect] {
        &self.defects
    }

    /// Blocking defects only
    pub fn blocking(&self) -> impl Iterator<Item = &Defect> {
        self.defects.iter().filter(|d| d.is_blocking())
    }
}
