use std::path::Path;

use paxmark::{flight_label, load_flight_list};

use crate::shared::load_config;

pub fn run(config_path: &Path) -> Result<(), i32> {
    let config = load_config(config_path)?;
    let flights = load_flight_list(&config.flight_list).map_err(|e| {
        eprintln!(
            "Error: cannot read flight list {}: {e}",
            config.flight_list.display()
        );
        1
    })?;

    for entry in &flights {
        println!("{entry}\t{}", flight_label(entry));
    }
    Ok(())
}
