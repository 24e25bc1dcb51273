// CLI module for opustags
//
// Argument parsing, file handling and printing. Only compiled into the
// binary; the library does the stream processing.

pub mod commands;
pub mod config;
pub mod output;

pub use config::Config;

use opustags::{Error, Status};

/// Exit code for a failed run, taken from the first library error found in
/// the context chain. Anything else is reported as a standard error.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<Error>())
        .map_or(Status::StandardError, Error::status)
        .exit_code()
}
