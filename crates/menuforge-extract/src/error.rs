//! Extraction errors

/// Errors from the extraction pipeline
///
/// All variants are fatal to a run: if the proposal's structure cannot be
/// located there is nothing for the downstream agents to work with. Partial
/// or ambiguous records are NOT errors; they are retained best-effort for
/// the critique agent to flag.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// Document bytes are not valid UTF-8
    #[error("document is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),

    /// Document contains no content at all
    #[error("document is empty")]
    EmptyDocument,

    /// No menu section marker could be located
    #[error("no menu section found in document")]
    NoMenuSection,

    /// A menu section exists but holds no item records
    #[error("menu section contains no item records")]
    NoItems,
}
