// CLI configuration
use clap::Parser;
use opustags::{EditPolicy, Error};

use crate::cli::output::OutputFormat;

/// Suffix of the side file used by --in-place when none is given
pub const DEFAULT_IN_PLACE_SUFFIX: &str = ".otmp";

/// opustags - view and edit Ogg Opus comments
#[derive(Parser, Debug)]
#[command(name = "opustags")]
#[command(about = "View and edit the comments of Ogg Opus files", long_about = None)]
#[command(version)]
pub struct Config {
    /// Input file, or - for standard input
    #[arg(value_name = "INPUT")]
    pub input: Option<String>,

    /// Write the edited stream to FILE, or - for standard output
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<String>,

    /// Write to INPUT with SUFFIX appended, then replace INPUT with it
    #[arg(
        short = 'i',
        long,
        value_name = "SUFFIX",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = DEFAULT_IN_PLACE_SUFFIX
    )]
    pub in_place: Option<String>,

    /// Replace the output file if it already exists
    #[arg(short = 'y', long)]
    pub overwrite: bool,

    /// Delete comments named NAME, or only those equal to NAME=VALUE
    #[arg(short, long = "delete", value_name = "NAME[=VALUE]")]
    pub delete: Vec<String>,

    /// Add a comment
    #[arg(short, long = "add", value_name = "NAME=VALUE")]
    pub add: Vec<String>,

    /// Replace every NAME comment with NAME=VALUE
    #[arg(short, long = "set", value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    /// Delete all the existing comments
    #[arg(short = 'D', long)]
    pub delete_all: bool,

    /// Replace all comments with NAME=VALUE lines read from standard input
    #[arg(short = 'S', long)]
    pub set_all: bool,

    /// Format of printed comments
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Verbose mode (debug logging on stderr)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Reject option combinations that make no sense
    pub fn validate(&self) -> Result<(), Error> {
        let input = self
            .input
            .as_deref()
            .ok_or_else(|| Error::BadArguments("no input file specified".into()))?;
        if input.is_empty() {
            return Err(Error::BadArguments("input file name is empty".into()));
        }
        if self.in_place.is_some() && self.output.is_some() {
            return Err(Error::BadArguments("cannot combine --in-place and --output".into()));
        }
        if self.in_place.as_deref() == Some("") {
            return Err(Error::BadArguments("--in-place suffix cannot be empty".into()));
        }
        if self.in_place.is_some() && input == "-" {
            return Err(Error::BadArguments("cannot modify standard input in place".into()));
        }
        if self.set_all && input == "-" {
            return Err(Error::BadArguments(
                "cannot read the input from standard input with --set-all".into(),
            ));
        }
        if self.output.as_deref() == Some("") {
            return Err(Error::BadArguments("output file name is empty".into()));
        }
        for comment in self.add.iter().chain(&self.set) {
            if !comment.contains('=') {
                return Err(Error::BadArguments(format!(
                    "invalid comment '{}': expected NAME=VALUE",
                    comment
                )));
            }
        }
        Ok(())
    }

    /// Input path, once [`validate`](Self::validate) passed
    pub fn input_path(&self) -> &str {
        self.input.as_deref().unwrap_or("-")
    }

    /// Turn the edit options into a policy. `--set NAME=VALUE` deletes NAME
    /// before adding the new value.
    pub fn edit_policy(&self, set_all: Option<Vec<Vec<u8>>>) -> EditPolicy {
        let set_keys = self
            .set
            .iter()
            .map(|c| c.split_once('=').map_or(c.as_str(), |(key, _)| key));
        EditPolicy {
            to_delete: self
                .delete
                .iter()
                .map(String::as_str)
                .chain(set_keys)
                .map(|s| s.as_bytes().to_vec())
                .collect(),
            to_add: self
                .add
                .iter()
                .chain(&self.set)
                .map(|s| s.as_bytes().to_vec())
                .collect(),
            delete_all: self.delete_all,
            set_all,
        }
    }
}
