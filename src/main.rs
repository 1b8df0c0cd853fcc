//! tsplant CLI entry point.

use clap::Parser;
use colored::Colorize;
use tsplant::cli::{self, Cli, EXIT_ERROR};
use tsplant::logging;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.log_level.as_deref()) {
        eprintln!("{} invalid log level: {}", "warning:".yellow().bold(), e);
    }

    let exit_code = match cli::run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
