use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Search flight manifests and mark no-shows and cancellations.
#[derive(Debug, Parser)]
#[command(name = "paxmark", about, version)]
pub struct Cli {
    /// Path to config.json
    #[arg(long, global = true, value_name = "PATH", default_value = paxmark::DEFAULT_CONFIG)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the flights in the flight list
    Flights,

    /// Show the rows of a flight with their current status
    Search {
        /// Flight list entry (e.g. '262号車') or flight label (e.g. '262便')
        #[arg(value_name = "FLIGHT")]
        flight: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Set a status on reservations and commit
    Mark {
        #[arg(value_name = "FLIGHT")]
        flight: String,

        /// Reservation numbers
        #[arg(value_name = "RESV", required = true)]
        reservations: Vec<String>,

        #[arg(long, value_enum)]
        status: StatusArg,

        /// Travelling male count after a cancellation
        #[arg(long, default_value_t = 0)]
        male: u32,

        /// Travelling female count after a cancellation
        #[arg(long, default_value_t = 0)]
        female: u32,

        /// Travelling child count after a cancellation
        #[arg(long, default_value_t = 0)]
        child: u32,

        /// Apply and report without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Clear the status of reservations and commit
    Unset {
        #[arg(value_name = "FLIGHT")]
        flight: String,

        /// Reservation numbers
        #[arg(value_name = "RESV", required = true)]
        reservations: Vec<String>,

        /// Apply and report without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Write the saved state of a flight to its working copy
    Commit {
        #[arg(value_name = "FLIGHT")]
        flight: String,

        /// Reset the flight's pages and mark every status again
        #[arg(long)]
        rebuild: bool,
    },
}

/// Output format for row listings.
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Status to set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// No-show
    Ns,
    /// Cancellation
    Cxl,
    /// Cancellation with report
    CxlCs,
}
