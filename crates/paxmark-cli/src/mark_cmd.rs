use std::path::Path;

use paxmark::{CommitMode, SessionStore};
use tracing::info;

use crate::cli::StatusArg;
use crate::shared::{commit_session, fail, load_config, open_session};

pub fn run(
    config_path: &Path,
    flight: &str,
    reservations: &[String],
    status: StatusArg,
    travelling: [u32; 3],
    dry_run: bool,
) -> Result<(), i32> {
    let config = load_config(config_path)?;
    let store = SessionStore::new(&config.key_path);
    let (mut session, _source) = open_session(&config, &store, flight)?;

    let [male, female, child] = travelling;
    for resv in reservations {
        let applied = match status {
            StatusArg::Ns => session.set_no_show(resv),
            StatusArg::Cxl => session.set_cancelled(resv, false, male, female, child),
            StatusArg::CxlCs => session.set_cancelled(resv, true, male, female, child),
        };
        applied.map_err(fail)?;
        if let Some(entry) = session.entry(resv) {
            let tokens = entry.status.display_tokens().map(|t| t.to_string());
            println!("{}\t{resv}\t{}", entry.status.status(), tokens.join("\t"));
        }
    }

    if dry_run {
        info!(flight = session.flight(), "dry run, nothing written");
        return Ok(());
    }
    commit_session(&mut session, &store, &config, CommitMode::Incremental)?;
    Ok(())
}
