use std::path::Path;

use paxmark::{CommitMode, SessionStore};

use crate::shared::{commit_session, load_config, open_session};

pub fn run(config_path: &Path, flight: &str, rebuild: bool) -> Result<(), i32> {
    let config = load_config(config_path)?;
    let store = SessionStore::new(&config.key_path);
    let (mut session, _source) = open_session(&config, &store, flight)?;

    let mode = if rebuild {
        CommitMode::Rebuild
    } else {
        CommitMode::Incremental
    };
    commit_session(&mut session, &store, &config, mode)?;
    Ok(())
}
