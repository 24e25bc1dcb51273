// CLI binary entry point for opustags

mod cli;

use clap::Parser;
use opustags::Status;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::cli::Config;

fn main() {
    let config = match Config::try_parse() {
        Ok(config) => config,
        Err(e) => {
            let _ = e.print();
            process::exit(if e.use_stderr() {
                Status::BadArguments.exit_code()
            } else {
                Status::Ok.exit_code()
            });
        }
    };

    init_logging(config.verbose);

    if let Err(err) = cli::commands::run(&config) {
        eprintln!("opustags: {:#}", err);
        process::exit(cli::exit_code(&err));
    }
}

/// Log to stderr; RUST_LOG takes precedence over --verbose
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
