use std::fmt::Display;
use std::path::Path;

use paxmark::paxmark_pdf::SourceDocument;
use paxmark::{CommitMode, CommitReport, Config, EditSession, SessionStore, commit};

/// Print `Error: {e}` to stderr and yield exit code 1.
pub fn fail(e: impl Display) -> i32 {
    eprintln!("Error: {e}");
    1
}

/// Load the configuration with user-friendly error messages.
pub fn load_config(path: &Path) -> Result<Config, i32> {
    if !path.exists() {
        eprintln!("Error: config file not found: {}", path.display());
        return Err(1);
    }
    Config::load(path).map_err(fail)
}

/// Search the output folder for a flight and restore its saved state.
pub fn open_session(
    config: &Config,
    store: &SessionStore,
    flight: &str,
) -> Result<(EditSession, SourceDocument), i32> {
    EditSession::open(&config.output_folder, flight, store).map_err(fail)
}

/// Commit the session and print what was written.
pub fn commit_session(
    session: &mut EditSession,
    store: &SessionStore,
    config: &Config,
    mode: CommitMode,
) -> Result<CommitReport, i32> {
    let report = commit(session, store, config.marking.style(), mode).map_err(fail)?;
    print_report(&report);
    Ok(report)
}

fn print_report(report: &CommitReport) {
    println!("working copy: {}", report.working_copy.display());
    println!("session file: {}", report.session_file.display());
    if !report.pages_reset.is_empty() {
        let pages: Vec<String> = report
            .pages_reset
            .iter()
            .map(|p| (p + 1).to_string())
            .collect();
        println!("pages reset: {}", pages.join(","));
    }
    println!("passengers marked: {}", report.passengers_marked);
    if report.other_flights_marked > 0 {
        println!("other flights marked: {}", report.other_flights_marked);
    }
    if let Some(totals) = report.totals {
        println!("totals: {totals:?}");
    }
}
