//! PDF backend for paxmark.
//!
//! Reads positioned text out of manifest PDFs with [`lopdf`] and writes
//! status marks onto a working copy, leaving the pristine file untouched.

pub mod annotate;
pub mod cmap;
pub mod error;
pub mod font;
pub mod source;
pub mod text_layer;

pub use annotate::{
    MarkStyle, PassengerMark, TOTALS_LABEL, TotalsOutcome, WorkingCopy, working_path_for,
};
pub use error::BackendError;
pub use source::{PageSource, SourceDocument};
pub use text_layer::PageFrame;
