//! The flight-label list and label normalization.

use std::fs;
use std::io;
use std::path::Path;

use paxmark_core::normalize;

/// Default location of the flight list.
pub const DEFAULT_FLIGHT_LIST: &str = "出力便名リスト.txt";

/// Non-blank lines of a flight list, trimmed, in file order.
pub fn parse_flight_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read the flight list file.
pub fn load_flight_list(path: impl AsRef<Path>) -> io::Result<Vec<String>> {
    Ok(parse_flight_list(&fs::read_to_string(path)?))
}

/// The label that manifest rows carry for a flight entry.
///
/// Entries are written per coach (`262号車`) while rows carry the flight
/// (`262便`).
pub fn flight_label(entry: &str) -> String {
    let label = normalize(entry);
    match label.strip_suffix("号車") {
        Some(stem) => format!("{stem}便"),
        None => label,
    }
}
