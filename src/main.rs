mod app;
mod cli;
mod clock;
mod config;
mod constants;
mod domain;
mod engine;
mod error;
mod history;
mod ledger;
mod logging;
mod recovery;
mod store;
mod time_format;

use clap::Parser;

use crate::{cli::Cli, config::Config, constants::FILE_PATHS};

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(command) => {
            logging::init_cli_logging();
            let config = Config::load();
            if let Err(e) = cli::run_command(command, &config) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            let log_path = store::get_state_dir().join(FILE_PATHS.log);
            if let Err(e) = logging::init_tui_logging(&log_path) {
                eprintln!("Warning: could not open log file {}: {}", log_path.display(), e);
            }
            let config = Config::load();
            if let Err(e) = app::run_ui(&config) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
