use std::path::Path;

use paxmark::{CommitMode, SessionStore};
use tracing::info;

use crate::shared::{commit_session, fail, load_config, open_session};

pub fn run(
    config_path: &Path,
    flight: &str,
    reservations: &[String],
    dry_run: bool,
) -> Result<(), i32> {
    let config = load_config(config_path)?;
    let store = SessionStore::new(&config.key_path);
    let (mut session, source) = open_session(&config, &store, flight)?;

    let mut cleared = 0;
    for resv in reservations {
        if session.unset(&source, resv).map_err(fail)? {
            cleared += 1;
        } else {
            eprintln!("Warning: {resv} kept its status, row not found in source");
        }
    }
    println!("cleared: {cleared}");

    if dry_run || cleared == 0 {
        info!(flight = session.flight(), cleared, "nothing written");
        return Ok(());
    }
    commit_session(&mut session, &store, &config, CommitMode::Incremental)?;
    Ok(())
}
