//! Baseline snapshots used to detect unsaved edits.

use std::collections::BTreeMap;

use crate::status::{DisplayToken, Headcount, PassengerStatus, StatusValue};

/// Status and decoded after values of one reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub status: StatusValue,
    pub after: Headcount,
}

/// Reservation id to visible state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: BTreeMap<String, SnapshotEntry>,
}

impl Snapshot {
    pub fn get(&self, reservation_id: &str) -> Option<&SnapshotEntry> {
        self.entries.get(reservation_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SnapshotEntry)> {
        self.entries.iter()
    }
}

/// Capture the visible state of every row.
///
/// After values are decoded from the rendered display tokens, so the
/// snapshot compares exactly what a user would see. Rows sharing a
/// reservation id collapse to the last one.
pub fn snapshot<'a, I>(rows: I) -> Snapshot
where
    I: IntoIterator<Item = (&'a str, &'a PassengerStatus)>,
{
    let entries = rows
        .into_iter()
        .map(|(resv, status)| {
            let [male, female, child, total] = status
                .display_tokens()
                .map(|token| DisplayToken::decode_after(&token.to_string()));
            (
                resv.to_string(),
                SnapshotEntry {
                    status: status.status(),
                    after: Headcount::printed(male, female, child, total),
                },
            )
        })
        .collect();
    Snapshot { entries }
}

/// Whether the current state differs from the baseline.
pub fn is_dirty(current: &Snapshot, baseline: &Snapshot) -> bool {
    current != baseline
}

/// Flight-wide totals: sums of the decoded after values.
pub fn flight_totals(snapshot: &Snapshot) -> Headcount {
    let mut totals = Headcount::ZERO;
    for entry in snapshot.entries.values() {
        totals += entry.after;
    }
    totals
}
