//! Flight search over the manifest folder.

use std::fs;
use std::path::{Path, PathBuf};

use paxmark_core::{
    LineOptions, PassengerRecord, StatusValue, has_reservation_like_token, normalize,
    parse_passenger_line, printed_status, reconstruct,
};
use paxmark_pdf::{BackendError, PageSource, SourceDocument};
use tracing::{debug, info, warn};

use crate::error::Error;

/// Marker every searchable manifest carries in its file name.
pub const ARCHIVE_MARKER: &str = "保管用";
/// Marker of working copies, which are never searched.
pub const WORKING_MARKER: &str = "_marked";

/// One passenger row found for a flight.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub record: PassengerRecord,
    /// Status printed on the row itself.
    pub printed: StatusValue,
}

/// Manifest PDFs in `folder`, sorted by path.
pub fn candidate_sources(folder: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut found = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let lower = name.to_lowercase();
        if lower.ends_with(".pdf") && name.contains(ARCHIVE_MARKER) && !lower.contains(WORKING_MARKER)
        {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Normalized logical lines of one page, top to bottom.
pub fn page_lines<S: PageSource>(source: &S, page_index: usize) -> Result<Vec<String>, BackendError> {
    let fragments = source.fragments(page_index)?;
    Ok(reconstruct(&fragments, &LineOptions::default())
        .iter()
        .map(|line| normalize(&line.text()))
        .collect())
}

/// Every row of `flight` in a document.
///
/// A row must mention the flight label and hold a reservation-like token;
/// rows that still fail to parse are skipped.
pub fn scan_source<S: PageSource>(source: &S, flight: &str) -> Result<Vec<SearchHit>, BackendError> {
    let mut hits = Vec::new();
    for page_index in 0..source.page_count() {
        for line in page_lines(source, page_index)? {
            if !line.contains(flight) || !has_reservation_like_token(&line) {
                continue;
            }
            match parse_passenger_line(&line, page_index) {
                Ok(record) => {
                    debug!(page = page_index + 1, resv = %record.reservation_id, "row found");
                    hits.push(SearchHit {
                        printed: printed_status(&line),
                        record,
                    });
                }
                Err(e) => debug!(page = page_index + 1, %line, "skipped row: {e}"),
            }
        }
    }
    Ok(hits)
}

/// The first manifest in `folder` carrying rows for `flight`.
///
/// Files that cannot be opened are logged and skipped.
pub fn find_flight(
    folder: &Path,
    flight: &str,
) -> Result<Option<(SourceDocument, Vec<SearchHit>)>, Error> {
    for path in candidate_sources(folder)? {
        let source = match SourceDocument::open(&path) {
            Ok(source) => source,
            Err(e) => {
                warn!(path = %path.display(), "cannot open manifest: {e}");
                continue;
            }
        };
        let hits = match scan_source(&source, flight) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(path = %path.display(), "cannot read manifest: {e}");
                continue;
            }
        };
        if !hits.is_empty() {
            info!(path = %path.display(), %flight, rows = hits.len(), "manifest selected");
            return Ok(Some((source, hits)));
        }
    }
    Ok(None)
}

/// Re-read the row of `reservation_id` on one page of the pristine source.
///
/// `Ok(None)` means the page holds no parsable line containing the id.
pub fn locate_row<S: PageSource>(
    source: &S,
    page_index: usize,
    reservation_id: &str,
) -> Result<Option<PassengerRecord>, BackendError> {
    let resv = normalize(reservation_id);
    let lines = page_lines(source, page_index)?;
    let Some(line) = lines.iter().find(|line| line.contains(&resv)) else {
        return Ok(None);
    };
    Ok(parse_passenger_line(line, page_index).ok())
}
