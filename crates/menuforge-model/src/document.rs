//! Source documents, image assets, and image descriptions
//!
//! A [`SourceDocument`] is the immutable input to a run. Image assets are
//! owned by the document and addressed by [`AnchorId`]; each successfully
//! analyzed asset yields exactly one [`ImageDescription`]. Failed analyses
//! are tracked as explicit placeholders, never dropped.

use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identifier tying an image asset to the anchor that referenced it
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnchorId(String);

impl AnchorId {
    /// Create a new anchor id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The anchor id as a string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AnchorId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Source content types the extraction pipeline accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    /// Markdown-structured proposal
    Markdown,
    /// Plain text (parsed with the same structural rules)
    PlainText,
}

impl ContentType {
    /// Resolve a MIME string to a supported content type
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "text/markdown" | "text/x-markdown" => Some(Self::Markdown),
            "text/plain" => Some(Self::PlainText),
            _ => None,
        }
    }
}

/// An ingested proposal document
///
/// # Invariants
/// - Immutable once constructed
/// - `hash` is always the Blake3 digest of `bytes`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    bytes: Vec<u8>,
    content_type: ContentType,
    hash: ContentHash,
}

impl SourceDocument {
    /// Ingest raw bytes as a source document
    #[must_use]
    pub fn new(bytes: Vec<u8>, content_type: ContentType) -> Self {
        let hash = ContentHash::compute(&bytes);
        Self {
            bytes,
            content_type,
            hash,
        }
    }

    /// Raw document bytes
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared content type
    #[inline]
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Content hash of the raw bytes
    #[inline]
    #[must_use]
    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// UTF-8 view of the document bytes
    ///
    /// # Errors
    /// Returns the underlying error if the bytes are not valid UTF-8
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.bytes)
    }
}

/// Binary reference to an image owned by the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    /// Anchor this asset was referenced from
    pub anchor: AnchorId,
    /// Location of the binary (relative path or URI)
    pub reference: String,
    /// Alt text captured at the anchor site
    pub alt: String,
}

impl ImageAsset {
    /// Create a new image asset
    #[inline]
    #[must_use]
    pub fn new(anchor: AnchorId, reference: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            anchor,
            reference: reference.into(),
            alt: alt.into(),
        }
    }
}

/// How an image description was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DescriptionSource {
    /// Produced by the multimodal analysis agent
    Analyzed,
    /// Stand-in recorded after a failed or timed-out analysis
    Placeholder,
}

/// Semantic description of one image asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescription {
    /// Anchor the description belongs to
    pub anchor: AnchorId,
    /// Tag set (deterministically ordered)
    pub tags: BTreeSet<String>,
    /// Human-readable caption
    pub caption: String,
    /// Provenance of the description
    pub source: DescriptionSource,
}

impl ImageDescription {
    /// Create a description produced by analysis
    #[inline]
    #[must_use]
    pub fn analyzed(anchor: AnchorId, tags: BTreeSet<String>, caption: impl Into<String>) -> Self {
        Self {
            anchor,
            tags,
            caption: caption.into(),
            source: DescriptionSource::Analyzed,
        }
    }

    /// Create the stand-in recorded when analysis fails for an asset
    #[inline]
    #[must_use]
    pub fn placeholder(anchor: AnchorId) -> Self {
        Self {
            anchor,
            tags: BTreeSet::new(),
            caption: "Image description unavailable".to_string(),
            source: DescriptionSource::Placeholder,
        }
    }

    /// Whether this description is a placeholder
    #[inline]
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.source == DescriptionSource::Placeholder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_hash_tracks_bytes() {
        let a = SourceDocument::new(b"proposal A".to_vec(), ContentType::Markdown);
        let b = SourceDocument::new(b"proposal A".to_vec(), ContentType::Markdown);
        let c = SourceDocument::new(b"proposal B".to_vec(), ContentType::Markdown);

        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn document_text_requires_utf8() {
        let doc = SourceDocument::new(vec![0xff, 0xfe], ContentType::PlainText);
        assert!(doc.text().is_err());

        let doc = SourceDocument::new(b"ok".to_vec(), ContentType::PlainText);
        assert_eq!(doc.text().unwrap(), "ok");
    }

    #[test]
    fn content_type_from_mime() {
        assert_eq!(ContentType::from_mime("text/markdown"), Some(ContentType::Markdown));
        assert_eq!(ContentType::from_mime("text/plain"), Some(ContentType::PlainText));
        assert_eq!(ContentType::from_mime("application/pdf"), None);
    }

    #[test]
    fn placeholder_is_tracked_explicitly() {
        let desc = ImageDescription::placeholder(AnchorId::new("img-1"));
        assert!(desc.is_placeholder());
        assert!(desc.tags.is_empty());

        let analyzed = ImageDescription::analyzed(
            AnchorId::new("img-1"),
            BTreeSet::from(["seafood".to_string()]),
            "Grilled salmon on a plate",
        );
        assert!(!analyzed.is_placeholder());
    }
}
