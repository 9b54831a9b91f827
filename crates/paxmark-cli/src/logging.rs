use std::env;
use std::io;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Variable holding the log filter, e.g. `debug` or `paxmark=trace`.
pub const LOG_ENV: &str = "PAXMARK_LOG";

/// Send log records to stderr, filtered by `PAXMARK_LOG` (default `info`).
pub fn init() {
    let filter = env::var(LOG_ENV).unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .init();
}
