mod cli;
mod commit_cmd;
mod flights_cmd;
mod logging;
mod mark_cmd;
mod search_cmd;
mod shared;
mod unset_cmd;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();
    logging::init();

    let result = match cli.command {
        cli::Commands::Flights => flights_cmd::run(&cli.config),
        cli::Commands::Search {
            ref flight,
            ref format,
        } => search_cmd::run(&cli.config, flight, format),
        cli::Commands::Mark {
            ref flight,
            ref reservations,
            status,
            male,
            female,
            child,
            dry_run,
        } => mark_cmd::run(
            &cli.config,
            flight,
            reservations,
            status,
            [male, female, child],
            dry_run,
        ),
        cli::Commands::Unset {
            ref flight,
            ref reservations,
            dry_run,
        } => unset_cmd::run(&cli.config, flight, reservations, dry_run),
        cli::Commands::Commit { ref flight, rebuild } => commit_cmd::run(&cli.config, flight, rebuild),
    };

    if let Err(code) = result {
        std::process::exit(code);
    }
}
