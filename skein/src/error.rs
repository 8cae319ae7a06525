//! Error types for skein.

use thiserror::Error;

/// Result type for skein operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for skein operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Malformed cache file or corpus structure. Fatal for the file/run.
    #[error("Format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// XML transport error from the cache codec.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Malformed XML attribute in a cache file.
    #[error("XML attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    /// Corpus interchange parse error (JSONL document stream).
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// Logic invariant violation: duplicate canonical identity or an
    /// ordering collision between distinct pairs. A defect, never masked.
    #[error("Consistency error: {0}")]
    Consistency(String),
}

impl Error {
    /// Create a format error.
    #[must_use]
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create a corpus error.
    #[must_use]
    pub fn corpus(msg: impl Into<String>) -> Self {
        Self::Corpus(msg.into())
    }

    /// Create a consistency error.
    #[must_use]
    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::Consistency(msg.into())
    }
}
