//! dupeguard - content-addressed duplicate file finder
//!
//! Entry point for the dupeguard CLI application.

use clap::Parser;
use dupeguard::{
    cli::Cli,
    config::ConfigError,
    duplicates::FinderError,
    error::{ExitCode, StructuredError},
    logging::init_logging,
};

fn main() {
    let cli = Cli::parse();
    let json_errors = cli.json_errors;
    init_logging(cli.verbose, cli.quiet);

    match dupeguard::run_app(cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            // Root and configuration problems are fatal before any scan.
            let exit_code = if err.downcast_ref::<ConfigError>().is_some()
                || err.downcast_ref::<FinderError>().is_some_and(|e| {
                    matches!(e, FinderError::PathNotFound(_) | FinderError::NotADirectory(_))
                }) {
                ExitCode::ConfigError
            } else {
                ExitCode::GeneralError
            };

            if json_errors {
                let structured = StructuredError::new(&err, exit_code);
                if let Ok(json) = serde_json::to_string_pretty(&structured) {
                    eprintln!("{}", json);
                } else {
                    eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err);
                }
            } else {
                eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err);
            }

            std::process::exit(exit_code.as_i32());
        }
    }
}
