//! paxmark: track no-shows and cancellations on passenger manifest PDFs.
//!
//! This is the public API facade crate. It re-exports the building blocks
//! from paxmark-core and paxmark-pdf and adds the workflow around them.
//!
//! # Architecture
//!
//! - **paxmark-core**: line reconstruction, row parsing, status accounting
//! - **paxmark-pdf**: fragment extraction and working-copy annotation
//! - **paxmark** (this crate): configuration, flight search, edit sessions,
//!   encrypted session files and commits
//!
//! # Example
//!
//! ```ignore
//! let config = Config::load("config.json")?;
//! let store = SessionStore::new(&config.key_path);
//! let (mut session, _source) = EditSession::open(&config.output_folder, "262号車", &store)?;
//! session.set_no_show("9J-123456")?;
//! commit(&mut session, &store, config.marking.style(), CommitMode::Incremental)?;
//! ```

pub mod cipher;
pub mod commit;
pub mod config;
pub mod error;
pub mod flights;
pub mod search;
pub mod session;
pub mod store;

#[cfg(test)]
mod testing;

pub use paxmark_core;
pub use paxmark_pdf;

pub use commit::{CommitMode, CommitReport, commit};
pub use config::{Config, DEFAULT_CONFIG, MarkingConfig};
pub use error::{Error, StoreError};
pub use flights::{DEFAULT_FLIGHT_LIST, flight_label, load_flight_list, parse_flight_list};
pub use search::{SearchHit, candidate_sources, find_flight, scan_source};
pub use session::{EditSession, SessionEntry};
pub use store::{SessionFile, SessionStore};
