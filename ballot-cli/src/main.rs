use std::process;

use clap::Parser;

mod cli;
mod exit_codes;
mod logging;
mod report;
mod supervisor;

use cli::Cli;
use exit_codes::{EXIT_ERROR, EXIT_SUCCESS};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let exit_code = match supervisor::run(&cli) {
        Ok(finish) => {
            tracing::debug!(?finish, "run finished");
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            EXIT_ERROR
        }
    };
    process::exit(exit_code);
}
