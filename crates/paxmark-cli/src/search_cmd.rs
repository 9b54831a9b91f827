use std::path::Path;

use paxmark::{EditSession, SessionEntry, SessionStore};

use crate::cli::OutputFormat;
use crate::shared::{load_config, open_session};

pub fn run(config_path: &Path, flight: &str, format: &OutputFormat) -> Result<(), i32> {
    let config = load_config(config_path)?;
    let store = SessionStore::new(&config.key_path);
    let (session, _source) = open_session(&config, &store, flight)?;

    match format {
        OutputFormat::Text => write_text(&session),
        OutputFormat::Json => write_json(&session),
    }
}

fn write_text(session: &EditSession) -> Result<(), i32> {
    println!("status\tresv\tname\tmale\tfemale\tchild\ttotal\tphone\tflight\tpage");
    for entry in session.entries() {
        let [male, female, child, total] = entry.status.display_tokens();
        println!(
            "{}\t{}\t{}\t{male}\t{female}\t{child}\t{total}\t{}\t{}\t{}",
            entry.status.status(),
            entry.reservation_id(),
            entry.record.name,
            entry.record.phone.as_deref().unwrap_or(""),
            entry.record.flight.as_deref().unwrap_or(""),
            entry.page_index() + 1,
        );
    }
    let totals = session.totals();
    println!(
        "合計\t\t\t{}\t{}\t{}\t{}\t\t{}\t",
        totals.male,
        totals.female,
        totals.child,
        totals.total,
        session.flight()
    );
    Ok(())
}

fn entry_json(entry: &SessionEntry) -> serde_json::Value {
    let tokens = entry.status.display_tokens().map(|t| t.to_string());
    let original = entry.status.original();
    let current = entry.status.current();
    serde_json::json!({
        "status": entry.status.status().code(),
        "resv": entry.reservation_id(),
        "name": entry.record.name,
        "phone": entry.record.phone,
        "flight": entry.record.flight,
        "page": entry.page_index() + 1,
        "display": tokens,
        "original": original.as_array(),
        "current": current.as_array(),
    })
}

fn write_json(session: &EditSession) -> Result<(), i32> {
    let rows: Vec<serde_json::Value> = session.entries().iter().map(entry_json).collect();
    let output = serde_json::json!({
        "flight": session.flight(),
        "source": session.source_path().display().to_string(),
        "rows": rows,
        "totals": session.totals().as_array(),
    });
    let json = serde_json::to_string_pretty(&output).map_err(|e| {
        eprintln!("Error: failed to serialize JSON: {e}");
        1
    })?;
    println!("{json}");
    Ok(())
}
