//! paxmark-core: Backend-independent passenger manifest types and algorithms.
//!
//! This crate turns positioned text fragments into logical lines and
//! passenger records, tracks per-passenger status with reversible headcount
//! accounting, and compares snapshots to detect unsaved edits. It knows
//! nothing about PDF files or persistence.

pub mod error;
pub mod fragment;
pub mod geometry;
pub mod lines;
pub mod normalize;
pub mod parser;
pub mod snapshot;
pub mod status;

pub use error::{ParseFailure, TransitionError};
pub use fragment::PositionedFragment;
pub use geometry::BBox;
pub use lines::{LineOptions, LogicalLine, reconstruct};
pub use normalize::{ARROW, normalize};
pub use parser::{
    KNOWN_SITES, PassengerRecord, Route, has_reservation_like_token, normalize_phone,
    parse_passenger_line, printed_status,
};
pub use snapshot::{Snapshot, SnapshotEntry, flight_totals, is_dirty, snapshot};
pub use status::{DisplayToken, Headcount, MAX_PASSENGER_COUNT, PassengerStatus, StatusValue};
