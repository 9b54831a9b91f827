//! Writing a session back to disk.
//!
//! A commit brings the working copy in line with the session and then
//! saves the session file:
//!
//! 1. pages with cleared statuses, and the totals page when the flight
//!    totals moved, are reset to pristine;
//! 2. passengers of other flights saved for the same manifest are marked
//!    again on the reset pages;
//! 3. every passenger with a status is marked if its page was reset, its
//!    visible state changed, or the working copy was just created;
//! 4. the totals row is checked again on a fresh or reset totals page;
//! 5. the PDF is saved, then the session file, then the baseline is retaken.

use std::collections::BTreeSet;
use std::path::PathBuf;

use paxmark_core::flight_totals;
use paxmark_pdf::{MarkStyle, PassengerMark, TotalsOutcome, WorkingCopy};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::session::{EditSession, SessionEntry};
use crate::store::SessionStore;

/// How much of the working copy a commit rewrites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommitMode {
    /// Touch only what changed since the last commit.
    #[default]
    Incremental,
    /// Reset every page holding a row of the flight and mark all of its
    /// statuses again. The working copy is edited in place.
    Rebuild,
}

/// What a commit wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitReport {
    pub working_copy: PathBuf,
    pub session_file: PathBuf,
    pub pages_reset: Vec<usize>,
    pub passengers_marked: usize,
    /// Marks of other flights drawn again on reset pages.
    pub other_flights_marked: usize,
    /// `None` when the totals row was left alone.
    pub totals: Option<TotalsOutcome>,
}

/// Apply the session to its working copy and persist it.
///
/// Resetting the totals page when the flight totals move also clears marks
/// other flights left on that page; their passenger marks are redrawn from
/// their session files, their totals rows are not.
pub fn commit(
    session: &mut EditSession,
    store: &SessionStore,
    style: MarkStyle,
    mode: CommitMode,
) -> Result<CommitReport, Error> {
    let mut copy = WorkingCopy::open(session.source_path(), style)?;
    let fresh = copy.is_new();

    let current = session.snapshot();
    let totals = flight_totals(&current);
    let totals_moved = totals != flight_totals(session.baseline());
    let totals_page = session.totals_page();

    let mut reset: BTreeSet<usize> = session.unset_pages().clone();
    if totals_moved {
        reset.extend(totals_page);
    }
    if mode == CommitMode::Rebuild {
        reset.extend(session.entries().iter().map(SessionEntry::page_index));
    }
    let mut others = 0;
    if !fresh && !reset.is_empty() {
        for &page in &reset {
            copy.reset_page(page)?;
        }
        others = remark_other_flights(&mut copy, session, store, &reset)?;
    }

    let mut marked = 0;
    for entry in session.entries() {
        let status = entry.status.status();
        if !status.is_set() {
            continue;
        }
        let resv = entry.reservation_id();
        let changed = current.get(resv) != session.baseline().get(resv);
        if !(fresh || changed || reset.contains(&entry.page_index())) {
            continue;
        }
        let found = copy.mark_passenger(&PassengerMark {
            page_index: entry.page_index(),
            reservation_id: resv,
            status,
            after: entry.status.current(),
        })?;
        if found {
            marked += 1;
        }
    }

    let totals_outcome = match totals_page {
        Some(page) if fresh || reset.contains(&page) => {
            let outcome = copy.mark_totals(page, totals)?;
            if outcome == TotalsOutcome::RowNotFound {
                warn!(page = page + 1, "totals row not found on last page of flight");
            }
            Some(outcome)
        }
        _ => None,
    };

    copy.save()?;

    let session_file = session.session_path();
    store.save(&session_file, &session.to_session_file())?;
    session.rebaseline();

    info!(
        flight = session.flight(),
        marked,
        pages_reset = reset.len(),
        "commit complete"
    );
    Ok(CommitReport {
        working_copy: copy.path().to_path_buf(),
        session_file,
        pages_reset: if fresh { Vec::new() } else { reset.into_iter().collect() },
        passengers_marked: marked,
        other_flights_marked: others,
        totals: totals_outcome,
    })
}

/// Mark passengers of other flights that sit on `pages` again.
fn remark_other_flights(
    copy: &mut WorkingCopy,
    session: &EditSession,
    store: &SessionStore,
    pages: &BTreeSet<usize>,
) -> Result<usize, Error> {
    let files = match store.load_other_flights(
        &session.status_dir(),
        session.source_path(),
        session.flight(),
    ) {
        Ok(files) => files,
        Err(e) => {
            warn!("cannot list session files of other flights: {e}");
            return Ok(0);
        }
    };

    let mut marked = 0;
    for file in &files {
        for saved in file.passengers().filter(|p| p.status.is_set()) {
            for &page in pages {
                if !copy.has_reservation(page, &saved.resv)? {
                    continue;
                }
                if copy.mark_passenger(&PassengerMark {
                    page_index: page,
                    reservation_id: &saved.resv,
                    status: saved.status,
                    after: saved.after(),
                })? {
                    marked += 1;
                }
                break;
            }
        }
        debug!(flight = %file.flight, "redrew marks of other flight");
    }
    Ok(marked)
}
