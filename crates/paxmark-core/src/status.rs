//! Per-passenger attendance status and headcount accounting.
//!
//! [`PassengerStatus`] holds the status value together with the original
//! and current headcounts. The original is fixed when the passenger is first
//! observed; transitions only ever touch the current side.

use std::fmt;
use std::ops::AddAssign;

use crate::error::TransitionError;
use crate::normalize::ARROW;

/// Largest count accepted for a single category in a cancellation.
pub const MAX_PASSENGER_COUNT: u32 = 20;

/// Attendance status of a passenger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StatusValue {
    /// No status; current headcount equals the original.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = ""))]
    None,
    /// Passenger did not show up.
    #[cfg_attr(feature = "serde", serde(rename = "NS"))]
    NoShow,
    /// Booking cancelled, fully or partially.
    #[cfg_attr(feature = "serde", serde(rename = "CXL"))]
    Cancelled,
    /// Cancellation reported by the customer support desk.
    #[cfg_attr(feature = "serde", serde(rename = "CXL-CS"))]
    CancelledReported,
}

impl StatusValue {
    /// Wire code used in session files and document labels.
    pub fn code(&self) -> &'static str {
        match self {
            StatusValue::None => "",
            StatusValue::NoShow => "NS",
            StatusValue::Cancelled => "CXL",
            StatusValue::CancelledReported => "CXL-CS",
        }
    }

    /// Parse a wire code. Unknown codes yield `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "" => Some(StatusValue::None),
            "NS" => Some(StatusValue::NoShow),
            "CXL" => Some(StatusValue::Cancelled),
            "CXL-CS" => Some(StatusValue::CancelledReported),
            _ => None,
        }
    }

    pub fn is_set(&self) -> bool {
        *self != StatusValue::None
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            StatusValue::Cancelled | StatusValue::CancelledReported
        )
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Male, female, child and total counts of one booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Headcount {
    pub male: u32,
    pub female: u32,
    pub child: u32,
    pub total: u32,
}

impl Headcount {
    pub const ZERO: Headcount = Headcount {
        male: 0,
        female: 0,
        child: 0,
        total: 0,
    };

    /// Headcount whose total is the sum of the three categories.
    pub fn new(male: u32, female: u32, child: u32) -> Self {
        Self {
            male,
            female,
            child,
            total: male + female + child,
        }
    }

    /// Headcount with a total as printed, which may differ from the sum.
    pub fn printed(male: u32, female: u32, child: u32, total: u32) -> Self {
        Self {
            male,
            female,
            child,
            total,
        }
    }

    /// Sum of the three categories, ignoring `total`.
    pub fn category_sum(&self) -> u32 {
        self.male + self.female + self.child
    }

    /// The four counts in display order.
    pub fn as_array(&self) -> [u32; 4] {
        [self.male, self.female, self.child, self.total]
    }

    fn same_categories(&self, other: &Headcount) -> bool {
        self.male == other.male && self.female == other.female && self.child == other.child
    }
}

impl AddAssign for Headcount {
    fn add_assign(&mut self, rhs: Headcount) {
        self.male += rhs.male;
        self.female += rhs.female;
        self.child += rhs.child;
        self.total += rhs.total;
    }
}

/// One headcount cell as shown to the user: `after` or `before→after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayToken {
    pub before: Option<u32>,
    pub after: u32,
}

impl DisplayToken {
    /// A plain value with no change.
    pub fn literal(value: u32) -> Self {
        Self {
            before: None,
            after: value,
        }
    }

    /// `before→after` when the values differ, otherwise a literal.
    pub fn change(before: u32, after: u32) -> Self {
        if before == after {
            Self::literal(after)
        } else {
            Self {
                before: Some(before),
                after,
            }
        }
    }

    /// The no-show pattern: `before→0` for positive counts, `0` otherwise.
    pub fn zeroed(before: u32) -> Self {
        if before > 0 {
            Self {
                before: Some(before),
                after: 0,
            }
        } else {
            Self::literal(0)
        }
    }

    /// Decode the after value of a rendered token.
    ///
    /// Takes the text right of the arrow when present, otherwise the whole
    /// token. Anything that is not a number decodes to 0.
    pub fn decode_after(text: &str) -> u32 {
        let tail = match text.rsplit_once(ARROW) {
            Some((_, after)) => after,
            None => text,
        };
        tail.trim().parse().unwrap_or(0)
    }

    /// Decode the before value of a rendered token (the literal when no arrow).
    pub fn decode_before(text: &str) -> u32 {
        let head = match text.split_once(ARROW) {
            Some((before, _)) => before,
            None => text,
        };
        head.trim().parse().unwrap_or(0)
    }
}

impl fmt::Display for DisplayToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.before {
            Some(before) => write!(f, "{before}{ARROW}{}", self.after),
            None => write!(f, "{}", self.after),
        }
    }
}

/// Status of one passenger plus its original/current headcount pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassengerStatus {
    status: StatusValue,
    original: Headcount,
    current: Headcount,
}

impl PassengerStatus {
    /// A freshly observed passenger with no status.
    pub fn observed(headcount: Headcount) -> Self {
        Self {
            status: StatusValue::None,
            original: headcount,
            current: headcount,
        }
    }

    /// A freshly observed passenger whose row already carries a printed
    /// status. `NS` starts as a no-show, `CXL` as a total cancellation.
    pub fn with_printed_status(headcount: Headcount, printed: StatusValue) -> Self {
        let mut status = Self::observed(headcount);
        if printed.is_set() {
            status.status = printed;
            status.current = Headcount::ZERO;
        }
        status
    }

    /// Rebuild a status from persisted values.
    ///
    /// A `None` status ignores `current` so that current equals original.
    pub fn restored(status: StatusValue, original: Headcount, current: Headcount) -> Self {
        let current = if status.is_set() { current } else { original };
        Self {
            status,
            original,
            current,
        }
    }

    pub fn status(&self) -> StatusValue {
        self.status
    }

    pub fn original(&self) -> Headcount {
        self.original
    }

    pub fn current(&self) -> Headcount {
        self.current
    }

    /// Mark the passenger as a no-show; all current counts become zero.
    pub fn mark_no_show(&mut self) -> Result<(), TransitionError> {
        self.ensure_unset()?;
        self.original = self.current;
        self.current = Headcount::ZERO;
        self.status = StatusValue::NoShow;
        Ok(())
    }

    /// Cancel the booking, leaving `male`/`female`/`child` travelling.
    ///
    /// Submitting the original counts, or all zeros, cancels the whole
    /// booking and sets every current count to zero.
    pub fn mark_cancelled(
        &mut self,
        reported: bool,
        male: u32,
        female: u32,
        child: u32,
    ) -> Result<(), TransitionError> {
        self.ensure_unset()?;
        for (category, value) in [("male", male), ("female", female), ("child", child)] {
            if value > MAX_PASSENGER_COUNT {
                return Err(TransitionError::CountOutOfRange { category, value });
            }
        }
        let after = Headcount::new(male, female, child);
        self.original = self.current;
        self.current = if after.same_categories(&self.original) || after.category_sum() == 0 {
            Headcount::ZERO
        } else {
            after
        };
        self.status = if reported {
            StatusValue::CancelledReported
        } else {
            StatusValue::Cancelled
        };
        Ok(())
    }

    fn ensure_unset(&self) -> Result<(), TransitionError> {
        if self.status.is_set() {
            Err(TransitionError::AlreadySet(self.status))
        } else {
            Ok(())
        }
    }

    /// Clear the status, replacing both headcounts with a freshly parsed one.
    pub fn unset(&mut self, fresh: Headcount) -> Result<(), TransitionError> {
        if !self.status.is_set() {
            return Err(TransitionError::NotSet);
        }
        *self = Self::observed(fresh);
        Ok(())
    }

    /// Whether every travelling count is zero under a set status.
    pub fn is_total_loss(&self) -> bool {
        self.status.is_set()
            && (self.current.category_sum() == 0
                || (self.status.is_cancellation() && self.current.same_categories(&self.original)))
    }

    /// Render male, female, child and total tokens.
    pub fn display_tokens(&self) -> [DisplayToken; 4] {
        let orig = self.original.as_array();
        if !self.status.is_set() {
            return self.current.as_array().map(DisplayToken::literal);
        }
        if self.is_total_loss() {
            return orig.map(DisplayToken::zeroed);
        }
        let cur = self.current;
        [
            DisplayToken::change(orig[0], cur.male),
            DisplayToken::change(orig[1], cur.female),
            DisplayToken::change(orig[2], cur.child),
            DisplayToken::change(orig[3], cur.category_sum()),
        ]
    }

    /// Headcount decoded back from the rendered tokens.
    pub fn displayed_after(&self) -> Headcount {
        let [m, f, c, t] = self.display_tokens().map(|t| DisplayToken::decode_after(&t.to_string()));
        Headcount::printed(m, f, c, t)
    }
}
