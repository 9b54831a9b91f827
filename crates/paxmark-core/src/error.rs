//! Error types for paxmark-core.
//!
//! [`ParseFailure`] reports why a line is not a passenger row, and
//! [`TransitionError`] reports a rejected status change.

use std::fmt;

use crate::status::{MAX_PASSENGER_COUNT, StatusValue};

/// A line could not be parsed into a passenger record.
///
/// Callers scanning a page treat this as "not a passenger row" and skip it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// No reservation id at the start of the line.
    MissingHeader,
    /// No run of four headcount digits after the reservation id.
    MissingHeadcount,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailure::MissingHeader => write!(f, "line does not start with a reservation id"),
            ParseFailure::MissingHeadcount => write!(f, "line has no headcount digits"),
        }
    }
}

impl std::error::Error for ParseFailure {}

/// A status transition was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The passenger already carries a status; unset it first.
    AlreadySet(StatusValue),
    /// The passenger has no status to unset.
    NotSet,
    /// A submitted headcount exceeds the allowed maximum.
    CountOutOfRange {
        /// Category name ("male", "female" or "child").
        category: &'static str,
        value: u32,
    },
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionError::AlreadySet(status) => {
                write!(f, "status already set to {}", status.code())
            }
            TransitionError::NotSet => write!(f, "no status is set"),
            TransitionError::CountOutOfRange { category, value } => write!(
                f,
                "{category} count {value} is out of range (0..={MAX_PASSENGER_COUNT})"
            ),
        }
    }
}

impl std::error::Error for TransitionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_failure_display() {
        assert_eq!(
            ParseFailure::MissingHeader.to_string(),
            "line does not start with a reservation id"
        );
        assert_eq!(
            ParseFailure::MissingHeadcount.to_string(),
            "line has no headcount digits"
        );
    }

    #[test]
    fn transition_error_display() {
        assert_eq!(
            TransitionError::AlreadySet(StatusValue::NoShow).to_string(),
            "status already set to NS"
        );
        assert_eq!(TransitionError::NotSet.to_string(), "no status is set");
        assert_eq!(
            TransitionError::CountOutOfRange {
                category: "male",
                value: 21
            }
            .to_string(),
            "male count 21 is out of range (0..=20)"
        );
    }

    #[test]
    fn errors_implement_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(TransitionError::NotSet);
        assert!(err.to_string().contains("no status"));
        let err: Box<dyn std::error::Error> = Box::new(ParseFailure::MissingHeader);
        assert!(err.to_string().contains("reservation id"));
    }
}
