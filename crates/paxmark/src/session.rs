//! Editing state for one flight.
//!
//! An [`EditSession`] owns the rows found for a flight, their statuses, the
//! baseline snapshot the dirty flag is measured against, and the pages that
//! must be reset to pristine on the next commit. Switching flights means
//! dropping the session and opening a new one.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::Datelike;
use paxmark_core::{
    Headcount, PassengerRecord, PassengerStatus, Snapshot, TransitionError, flight_totals,
    is_dirty, snapshot,
};
use paxmark_pdf::{PageSource, SourceDocument};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::flights::flight_label;
use crate::search::{SearchHit, find_flight, locate_row};
use crate::store::{
    PassengerEntry, SessionFile, SessionStore, StoredRecord, latest_session_file, session_path,
    status_dir,
};

/// One passenger row and its status.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEntry {
    pub record: PassengerRecord,
    pub status: PassengerStatus,
}

impl SessionEntry {
    fn from_hit(hit: SearchHit) -> Self {
        Self {
            status: PassengerStatus::with_printed_status(hit.record.headcount, hit.printed),
            record: hit.record,
        }
    }

    pub fn reservation_id(&self) -> &str {
        &self.record.reservation_id
    }

    pub fn page_index(&self) -> usize {
        self.record.page_index
    }
}

/// Rows of one flight plus unsaved-change tracking.
#[derive(Debug, Clone)]
pub struct EditSession {
    flight: String,
    source_path: PathBuf,
    entries: Vec<SessionEntry>,
    baseline: Snapshot,
    unset_pages: BTreeSet<usize>,
}

impl EditSession {
    /// A session over rows already found in `source_path`.
    pub fn new(flight: impl Into<String>, source_path: impl Into<PathBuf>, hits: Vec<SearchHit>) -> Self {
        let mut session = Self {
            flight: flight.into(),
            source_path: source_path.into(),
            entries: hits.into_iter().map(SessionEntry::from_hit).collect(),
            baseline: Snapshot::default(),
            unset_pages: BTreeSet::new(),
        };
        session.rebaseline();
        session
    }

    /// Search `folder` for a flight list entry and restore its saved state.
    ///
    /// Returns the session with the pristine document it was built from.
    /// A session file that cannot be read is logged and ignored.
    pub fn open(
        folder: &Path,
        entry: &str,
        store: &SessionStore,
    ) -> Result<(Self, SourceDocument), Error> {
        let flight = flight_label(entry);
        let (source, hits) =
            find_flight(folder, &flight)?.ok_or_else(|| Error::NoWorkingSource(flight.clone()))?;
        let mut session = Self::new(flight, source.path(), hits);
        session.restore_from(store);
        Ok((session, source))
    }

    pub fn flight(&self) -> &str {
        &self.flight
    }

    /// Path of the pristine manifest.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn entries(&self) -> &[SessionEntry] {
        &self.entries
    }

    pub fn entry(&self, reservation_id: &str) -> Option<&SessionEntry> {
        self.entries
            .iter()
            .find(|e| e.record.reservation_id == reservation_id)
    }

    fn entry_mut(&mut self, reservation_id: &str) -> Result<&mut SessionEntry, Error> {
        self.entries
            .iter_mut()
            .find(|e| e.record.reservation_id == reservation_id)
            .ok_or_else(|| Error::UnknownReservation(reservation_id.to_string()))
    }

    /// Pages to restore from the pristine source on the next commit.
    pub fn unset_pages(&self) -> &BTreeSet<usize> {
        &self.unset_pages
    }

    /// Last page holding a row of this flight; its totals row is marked.
    pub fn totals_page(&self) -> Option<usize> {
        self.entries.iter().map(SessionEntry::page_index).max()
    }

    pub fn set_no_show(&mut self, reservation_id: &str) -> Result<(), Error> {
        let entry = self.entry_mut(reservation_id)?;
        entry
            .status
            .mark_no_show()
            .map_err(|source| transition(reservation_id, source))?;
        info!(resv = reservation_id, "set NS");
        Ok(())
    }

    /// Cancel a booking, keeping `male`/`female`/`child` travelling.
    pub fn set_cancelled(
        &mut self,
        reservation_id: &str,
        reported: bool,
        male: u32,
        female: u32,
        child: u32,
    ) -> Result<(), Error> {
        let entry = self.entry_mut(reservation_id)?;
        entry
            .status
            .mark_cancelled(reported, male, female, child)
            .map_err(|source| transition(reservation_id, source))?;
        info!(
            resv = reservation_id,
            status = %entry.status.status(),
            male,
            female,
            child,
            "set cancellation"
        );
        Ok(())
    }

    /// Clear a status by re-reading the row from the pristine source.
    ///
    /// Returns `Ok(false)` with a warning when the row's page is missing or
    /// no longer yields the row; the entry is then left untouched.
    pub fn unset<S: PageSource>(&mut self, source: &S, reservation_id: &str) -> Result<bool, Error> {
        let entry = self.entry_mut(reservation_id)?;
        if !entry.status.status().is_set() {
            return Err(transition(reservation_id, TransitionError::NotSet));
        }
        let page = entry.page_index();
        if page >= source.page_count() {
            warn!(
                resv = reservation_id,
                page = page + 1,
                pages = source.page_count(),
                "page is out of range, status kept"
            );
            return Ok(false);
        }
        let fresh = match locate_row(source, page, reservation_id) {
            Ok(Some(fresh)) => fresh,
            Ok(None) => {
                warn!(resv = reservation_id, page = page + 1, "row not found on page, status kept");
                return Ok(false);
            }
            Err(e) => {
                warn!(resv = reservation_id, page = page + 1, "cannot read page: {e}");
                return Ok(false);
            }
        };
        entry
            .status
            .unset(fresh.headcount)
            .map_err(|source| transition(reservation_id, source))?;
        entry.record = fresh;
        self.unset_pages.insert(page);
        info!(resv = reservation_id, page = page + 1, "status cleared");
        Ok(true)
    }

    /// Clear several statuses; failures are logged and skipped.
    pub fn unset_all<S, R>(&mut self, source: &S, reservation_ids: &[R]) -> usize
    where
        S: PageSource,
        R: AsRef<str>,
    {
        let mut cleared = 0;
        for resv in reservation_ids {
            match self.unset(source, resv.as_ref()) {
                Ok(true) => cleared += 1,
                Ok(false) => {}
                Err(e) => warn!("{e}"),
            }
        }
        cleared
    }

    /// Apply saved records, matching passengers by name. Returns how many
    /// rows were restored.
    pub fn restore(&mut self, file: &SessionFile) -> usize {
        let mut restored = 0;
        for saved in file.passengers() {
            let Some(entry) = self.entries.iter_mut().find(|e| e.record.name == saved.name) else {
                debug!(name = %saved.name, "saved record has no matching row");
                continue;
            };
            entry.status = saved.to_status(entry.record.headcount);
            restored += 1;
        }
        self.rebaseline();
        restored
    }

    /// Restore from the newest session file for this flight, if any.
    pub fn restore_from(&mut self, store: &SessionStore) -> usize {
        let dir = self.status_dir();
        let path = match latest_session_file(&dir, &self.flight) {
            Ok(Some(path)) => path,
            Ok(None) => {
                debug!(dir = %dir.display(), flight = %self.flight, "no session file");
                return 0;
            }
            Err(e) => {
                warn!(dir = %dir.display(), "cannot list session files: {e}");
                return 0;
            }
        };
        match store.load(&path) {
            Ok(file) => {
                let restored = self.restore(&file);
                info!(path = %path.display(), restored, "restored session");
                restored
            }
            Err(e) => {
                warn!(path = %path.display(), "session not restored: {e}");
                0
            }
        }
    }

    /// Folder holding this manifest's session files.
    pub fn status_dir(&self) -> PathBuf {
        let folder = self.source_path.parent().unwrap_or(Path::new(""));
        let name = self
            .source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        status_dir(folder, &name, chrono::Local::now().year())
    }

    /// Path the next save writes to.
    pub fn session_path(&self) -> PathBuf {
        session_path(&self.status_dir(), &self.flight)
    }

    pub fn snapshot(&self) -> Snapshot {
        snapshot(
            self.entries
                .iter()
                .map(|e| (e.record.reservation_id.as_str(), &e.status)),
        )
    }

    pub fn baseline(&self) -> &Snapshot {
        &self.baseline
    }

    /// Whether anything changed since the last search, restore or commit.
    pub fn is_dirty(&self) -> bool {
        is_dirty(&self.snapshot(), &self.baseline)
    }

    /// Take the current state as the new baseline and forget page resets.
    pub fn rebaseline(&mut self) {
        self.baseline = self.snapshot();
        self.unset_pages.clear();
    }

    /// Flight-wide after totals.
    pub fn totals(&self) -> Headcount {
        flight_totals(&self.snapshot())
    }

    /// The session file describing the current state.
    pub fn to_session_file(&self) -> SessionFile {
        let mut file = SessionFile::new(&self.flight, &self.source_path);
        file.records = self
            .entries
            .iter()
            .map(|e| {
                StoredRecord::Passenger(PassengerEntry::from_status(
                    &e.record.reservation_id,
                    &e.record.name,
                    &e.status,
                ))
            })
            .collect();
        file.set_aggregate(self.totals());
        file
    }
}

fn transition(reservation_id: &str, source: TransitionError) -> Error {
    Error::Transition {
        reservation_id: reservation_id.to_string(),
        source,
    }
}
