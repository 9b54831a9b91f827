//! Error types for the PDF layer.
//!
//! Uses [`thiserror`] for error derivation. [`BackendError`] covers document
//! loading, content decoding and working-copy writes.

use thiserror::Error;

/// Error type for PDF reading and annotation.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Error from PDF parsing (structure, syntax, object resolution).
    #[error("PDF parse error: {0}")]
    Parse(String),

    /// Error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A page index outside the document was requested.
    #[error("page {index} is out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },

    /// The working copy no longer lines up with the pristine source.
    #[error("page {index} of the working copy does not match the pristine source")]
    PageMismatch { index: usize },

    /// Error raised by lopdf itself.
    #[error("lopdf error: {0}")]
    Lopdf(#[from] lopdf::Error),
}
