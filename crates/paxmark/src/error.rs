//! Error types for the paxmark workflow.
//!
//! [`Error`] is what every public operation of this crate returns; the
//! session store has its own [`StoreError`] so that a failed decrypt can be
//! told apart from a broken PDF.

use paxmark_core::TransitionError;
use paxmark_pdf::BackendError;
use thiserror::Error;

/// Errors raised while reading or writing the encrypted session file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The token is malformed or its signature does not verify.
    #[error("cannot decrypt session file: {0}")]
    Decrypt(String),

    #[error("session JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The key file does not hold a url-safe base64 encoded 32-byte key.
    #[error("invalid key file: {0}")]
    Key(String),
}

/// Error type for paxmark operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A status change was refused for one reservation.
    #[error("reservation {reservation_id}: {source}")]
    Transition {
        reservation_id: String,
        source: TransitionError,
    },

    #[error("reservation {0} is not part of this flight")]
    UnknownReservation(String),

    /// No manifest in the output folder carries the flight.
    #[error("no manifest contains rows for {0}")]
    NoWorkingSource(String),
}
