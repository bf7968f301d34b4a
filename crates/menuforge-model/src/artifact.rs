//! Versioned artifacts and their manifests
//!
//! An [`Artifact`] is one synthesized version of the interactive menu
//! document. Versions start at 1 and increase monotonically; prior versions
//! are retained for audit history and never mutated. The manifest declares
//! the embedded assets and the interactive affordance markers whose presence
//! the critique agent checks.

use crate::document::AnchorId;
use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Interactive affordances every artifact must declare
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Affordance {
    /// In-place editing of item text
    EditableFields,
    /// Read-aloud trigger per item
    TextToSpeech,
    /// Save / export of the document
    SaveExport,
}

impl Affordance {
    /// All required affordances, in manifest order
    pub const ALL: [Affordance; 3] = [
        Affordance::EditableFields,
        Affordance::TextToSpeech,
        Affordance::SaveExport,
    ];

    /// Structural marker the affordance must appear as in artifact content
    #[inline]
    #[must_use]
    pub fn marker(&self) -> &'static str {
        match self {
            Affordance::EditableFields => "data-affordance=\"edit\"",
            Affordance::TextToSpeech => "data-affordance=\"speak\"",
            Affordance::SaveExport => "data-affordance=\"export\"",
        }
    }

    /// Human-readable label
    #[inline]
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Affordance::EditableFields => "editable fields",
            Affordance::TextToSpeech => "text-to-speech",
            Affordance::SaveExport => "save/export",
        }
    }
}

/// Asset ids and structural markers declared by the builder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Anchor ids of assets embedded in the content
    pub assets: Vec<AnchorId>,
    /// Affordance markers the builder claims to have emitted
    pub affordances: BTreeSet<Affordance>,
    /// Names of the menu entries rendered, in content order
    pub item_names: Vec<String>,
    /// Number of prior-feedback defects the builder attempted to resolve
    pub acknowledged_defects: usize,
}

impl Manifest {
    /// Create an empty manifest
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// One synthesized version of the menu document
///
/// # Invariants
/// - `version >= 1`
/// - `hash` is always the Blake3 digest of `content`
/// - Immutable after construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    version: u64,
    content: String,
    manifest: Manifest,
    hash: ContentHash,
}

impl Artifact {
    /// Create a new artifact version
    ///
    /// # Errors
    /// Returns error if `version` is zero or `content` is empty
    pub fn new(version: u64, content: String, manifest: Manifest) -> Result<Self, ArtifactError> {
        if version == 0 {
            return Err(ArtifactError::InvalidVersion(version));
        }
        if content.trim().is_empty() {
            return Err(ArtifactError::EmptyContent);
        }
        let hash = ContentHash::compute(content.as_bytes());
        Ok(Self {
            version,
            content,
            manifest,
            hash,
        })
    }

    /// Version number (starts at 1)
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Serialized document content
    #[inline]
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Manifest of embedded assets and markers
    #[inline]
    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Content hash (artifact identity)
    #[inline]
    #[must_use]
    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// Whether the affordance is declared in the manifest AND its structural
    /// marker is present in the content
    #[must_use]
    pub fn declares_affordance(&self, affordance: Affordance) -> bool {
        self.manifest.affordances.contains(&affordance)
            && self.content.contains(affordance.marker())
    }
}

/// Errors related to artifact construction
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// Versions are 1-based
    #[error("artifact versions start at 1, got {0}")]
    InvalidVersion(u64),

    /// Content must not be empty
    #[error("artifact content is empty")]
    EmptyContent,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_with_all_affordances() -> Manifest {
        Manifest {
            affordances: Affordance::ALL.into_iter().collect(),
            ..Manifest::new()
        }
    }

    fn content_with_all_markers() -> String {
        let mut s = String::from("<html><body>");
        for affordance in Affordance::ALL {
            s.push_str(&format!("<button {}></button>", affordance.marker()));
        }
        s.push_str("</body></html>");
        s
    }

    #[test]
    fn artifact_rejects_version_zero() {
        let result = Artifact::new(0, "<html/>".to_string(), Manifest::new());
        assert!(matches!(result, Err(ArtifactError::InvalidVersion(0))));
    }

    #[test]
    fn artifact_rejects_empty_content() {
        let result = Artifact::new(1, "   ".to_string(), Manifest::new());
        assert!(matches!(result, Err(ArtifactError::EmptyContent)));
    }

    #[test]
    fn artifact_hash_tracks_content() {
        let a = Artifact::new(1, "<html>a</html>".to_string(), Manifest::new()).unwrap();
        let b = Artifact::new(2, "<html>a</html>".to_string(), Manifest::new()).unwrap();
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn declares_affordance_needs_manifest_and_marker() {
        // Marker present in content but not declared in manifest
        let undeclared =
            Artifact::new(1, content_with_all_markers(), Manifest::new()).unwrap();
        assert!(!undeclared.declares_affordance(Affordance::TextToSpeech));

        // Declared in manifest but marker missing from content
        let unmarked = Artifact::new(
            1,
            "<html>no markers</html>".to_string(),
            manifest_with_all_affordances(),
        )
        .unwrap();
        assert!(!unmarked.declares_affordance(Affordance::TextToSpeech));

        // Both
        let complete = Artifact::new(
            1,
            content_with_all_markers(),
            manifest_with_all_affordances(),
        )
        .unwrap();
        for affordance in Affordance::ALL {
            assert!(complete.declares_affordance(affordance));
        }
    }

    #[test]
    fn affordance_markers_are_distinct() {
        let markers: BTreeSet<_> = Affordance::ALL.iter().map(|a| a.marker()).collect();
        assert_eq!(markers.len(), Affordance::ALL.len());
    }
}
