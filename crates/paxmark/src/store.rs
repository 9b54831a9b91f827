//! Encrypted per-flight session files.
//!
//! A session file lives at
//! `<pdf folder>/status_data/<YYYY-MM-DD>/<flight>_status.json` and holds a
//! Fernet token whose plaintext is the JSON [`SessionFile`]. The date comes
//! from the manifest file name; names without one use `status_data` itself.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, OnceLock};

use paxmark_core::{Headcount, PassengerStatus, StatusValue};
use paxmark_pdf::TOTALS_LABEL;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cipher::FernetKey;
use crate::error::StoreError;

/// Default location of the key file.
pub const DEFAULT_KEY_FILE: &str = "status_key.key";
/// Folder under the manifest folder holding session files.
pub const STATUS_DIR: &str = "status_data";
/// Suffix of every session file name.
pub const SESSION_SUFFIX: &str = "_status.json";
/// Status code of the flight-wide aggregate record.
pub const AGGREGATE_STATUS: &str = "合計";

static FILE_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})[.\-](\d{1,2})").expect("valid regex"));

/// Counts keyed the way session files spell them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    #[serde(rename = "男", default)]
    pub male: u32,
    #[serde(rename = "女", default)]
    pub female: u32,
    #[serde(rename = "子供", default)]
    pub child: u32,
    #[serde(rename = "合計", default)]
    pub total: u32,
}

impl From<Headcount> for CategoryCounts {
    fn from(h: Headcount) -> Self {
        Self {
            male: h.male,
            female: h.female,
            child: h.child,
            total: h.total,
        }
    }
}

impl From<CategoryCounts> for Headcount {
    fn from(c: CategoryCounts) -> Self {
        Headcount::printed(c.male, c.female, c.child, c.total)
    }
}

/// Original and after counts of a passenger carrying a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deduction {
    pub orig: CategoryCounts,
    pub after: CategoryCounts,
}

/// One passenger in a session file. Top-level counts are after values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassengerEntry {
    pub resv: String,
    pub name: String,
    pub status: StatusValue,
    pub male: u32,
    pub female: u32,
    pub child: u32,
    pub total: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cxl_deduction: Option<Deduction>,
}

impl PassengerEntry {
    /// Record the visible state of one passenger.
    pub fn from_status(resv: &str, name: &str, status: &PassengerStatus) -> Self {
        let after = status.displayed_after();
        let cxl_deduction = status.status().is_set().then(|| Deduction {
            orig: status.original().into(),
            after: after.into(),
        });
        Self {
            resv: resv.to_string(),
            name: name.to_string(),
            status: status.status(),
            male: after.male,
            female: after.female,
            child: after.child,
            total: after.total,
            cxl_deduction,
        }
    }

    /// Travelling counts as saved.
    pub fn after(&self) -> Headcount {
        Headcount::printed(self.male, self.female, self.child, self.total)
    }

    /// Rebuild the status of a passenger whose row parsed to `parsed`.
    pub fn to_status(&self, parsed: Headcount) -> PassengerStatus {
        let original = self
            .cxl_deduction
            .map(|d| Headcount::from(d.orig))
            .unwrap_or(parsed);
        match self.status {
            StatusValue::None => PassengerStatus::observed(parsed),
            StatusValue::NoShow => {
                PassengerStatus::restored(StatusValue::NoShow, original, Headcount::ZERO)
            }
            StatusValue::Cancelled | StatusValue::CancelledReported => {
                let after = match self.cxl_deduction {
                    Some(d) => Headcount::new(d.after.male, d.after.female, d.after.child),
                    None => Headcount::new(self.male, self.female, self.child),
                };
                let unchanged = after.male == original.male
                    && after.female == original.female
                    && after.child == original.child;
                let current = if unchanged || after.category_sum() == 0 {
                    Headcount::ZERO
                } else {
                    after
                };
                PassengerStatus::restored(self.status, original, current)
            }
        }
    }
}

/// The flight-wide totals record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateEntry {
    pub resv: String,
    #[serde(default)]
    pub name: String,
    pub status: String,
    pub orig: CategoryCounts,
    pub after: CategoryCounts,
}

impl AggregateEntry {
    pub fn new(totals: Headcount) -> Self {
        Self {
            resv: TOTALS_LABEL.to_string(),
            name: String::new(),
            status: AGGREGATE_STATUS.to_string(),
            orig: CategoryCounts::default(),
            after: totals.into(),
        }
    }
}

/// A session file record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredRecord {
    Passenger(PassengerEntry),
    Aggregate(AggregateEntry),
}

/// Plaintext content of a session file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFile {
    #[serde(rename = "便名")]
    pub flight: String,
    #[serde(default)]
    pub pdf_path: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub records: Vec<StoredRecord>,
}

impl SessionFile {
    /// An empty file stamped with the current local time.
    pub fn new(flight: &str, pdf_path: &Path) -> Self {
        Self {
            flight: flight.to_string(),
            pdf_path: pdf_path.display().to_string(),
            timestamp: chrono::Local::now()
                .naive_local()
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string(),
            records: Vec::new(),
        }
    }

    pub fn passengers(&self) -> impl Iterator<Item = &PassengerEntry> {
        self.records.iter().filter_map(|r| match r {
            StoredRecord::Passenger(p) => Some(p),
            StoredRecord::Aggregate(_) => None,
        })
    }

    pub fn aggregate(&self) -> Option<&AggregateEntry> {
        self.records.iter().find_map(|r| match r {
            StoredRecord::Aggregate(a) if a.resv == TOTALS_LABEL => Some(a),
            _ => None,
        })
    }

    /// Replace any aggregate record with one carrying `totals`.
    pub fn set_aggregate(&mut self, totals: Headcount) {
        self.records.retain(|r| match r {
            StoredRecord::Aggregate(a) => a.resv != TOTALS_LABEL,
            StoredRecord::Passenger(p) => p.resv != TOTALS_LABEL,
        });
        self.records
            .push(StoredRecord::Aggregate(AggregateEntry::new(totals)));
    }
}

/// Folder holding the session files for a manifest.
///
/// A `M-D` or `M.D` pair in the file name selects `<year>-MM-DD`.
pub fn status_dir(pdf_folder: &Path, pdf_file_name: &str, year: i32) -> PathBuf {
    let base = pdf_folder.join(STATUS_DIR);
    match FILE_DATE.captures(pdf_file_name) {
        Some(caps) => base.join(format!("{year}-{:0>2}-{:0>2}", &caps[1], &caps[2])),
        None => base,
    }
}

/// Session file path for a flight inside a status folder.
pub fn session_path(dir: &Path, flight: &str) -> PathBuf {
    dir.join(format!("{flight}{SESSION_SUFFIX}"))
}

/// The session file to restore for a flight.
///
/// The exact `<flight>_status.json` wins; otherwise the most recently
/// modified file starting with the flight label is used.
pub fn latest_session_file(dir: &Path, flight: &str) -> Result<Option<PathBuf>, StoreError> {
    let exact = session_path(dir, flight);
    if exact.is_file() {
        return Ok(Some(exact));
    }
    if !dir.is_dir() {
        return Ok(None);
    }
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with(flight) || !name.ends_with(SESSION_SUFFIX) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
            newest = Some((modified, entry.path()));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

/// Reads and writes session files with a lazily loaded key.
#[derive(Debug)]
pub struct SessionStore {
    key_path: PathBuf,
    key: OnceLock<FernetKey>,
}

impl SessionStore {
    pub fn new(key_path: impl Into<PathBuf>) -> Self {
        Self {
            key_path: key_path.into(),
            key: OnceLock::new(),
        }
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    /// The key, read from the key file or generated and written there once.
    fn key(&self) -> Result<&FernetKey, StoreError> {
        if let Some(key) = self.key.get() {
            return Ok(key);
        }
        let key = if self.key_path.exists() {
            FernetKey::decode(&fs::read_to_string(&self.key_path)?)?
        } else {
            let key = FernetKey::generate();
            if let Some(parent) = self.key_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(&self.key_path, key.encode())?;
            info!(path = %self.key_path.display(), "generated session key");
            key
        };
        Ok(self.key.get_or_init(|| key))
    }

    /// Decrypt and parse a session file.
    pub fn load(&self, path: &Path) -> Result<SessionFile, StoreError> {
        let token = fs::read(path)?;
        let plain = self.key()?.decrypt(&token)?;
        let file = serde_json::from_slice(&plain)?;
        debug!(path = %path.display(), "loaded session file");
        Ok(file)
    }

    /// Session files in `dir` saved for other flights of the manifest
    /// `pdf_path`, newest per flight. Unreadable files are logged and skipped.
    pub fn load_other_flights(
        &self,
        dir: &Path,
        pdf_path: &Path,
        flight: &str,
    ) -> Result<Vec<SessionFile>, StoreError> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut newest: BTreeMap<String, SessionFile> = BTreeMap::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_session = path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().ends_with(SESSION_SUFFIX));
            if !is_session {
                continue;
            }
            let file = match self.load(&path) {
                Ok(file) => file,
                Err(e) => {
                    warn!(path = %path.display(), "skipping session file: {e}");
                    continue;
                }
            };
            let same_pdf = Path::new(&file.pdf_path).file_name() == pdf_path.file_name();
            if file.flight == flight || !same_pdf {
                continue;
            }
            let replace = newest
                .get(&file.flight)
                .is_none_or(|kept| file.timestamp > kept.timestamp);
            if replace {
                newest.insert(file.flight.clone(), file);
            }
        }
        Ok(newest.into_values().collect())
    }

    /// Encrypt and write a session file, creating its folder.
    pub fn save(&self, path: &Path, file: &SessionFile) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(file)?;
        let token = self.key()?.encrypt(json.as_bytes())?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, token)?;
        fs::rename(&tmp, path)?;
        info!(path = %path.display(), records = file.records.len(), "saved session file");
        Ok(())
    }
}
