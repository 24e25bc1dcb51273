// CLI command implementation
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use opustags::Error;
use tracing::debug;

use crate::cli::config::{Config, DEFAULT_IN_PLACE_SUFFIX};
use crate::cli::output::{read_comments, OutputFormatter};

/// Where the edited stream goes
#[derive(Debug, PartialEq, Eq)]
enum Destination {
    /// Nothing is written, comments are printed
    Print,
    Stdout,
    File { target: PathBuf, partial: PathBuf },
}

/// Run with the process's standard streams
pub fn run(config: &Config) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    execute(config, stdin.lock(), stdout.lock())
}

pub fn execute<I: BufRead, O: Write>(config: &Config, mut stdin: I, mut stdout: O) -> Result<()> {
    config.validate()?;

    let set_all = if config.set_all {
        Some(read_comments(&mut stdin).context("could not read comments from standard input")?)
    } else {
        None
    };
    let policy = config.edit_policy(set_all);
    let destination = destination(config)?;
    debug!(?destination, "resolved destination");

    let input_path = config.input_path();
    let input: Box<dyn Read + '_> = if input_path == "-" {
        Box::new(&mut stdin)
    } else {
        let file = File::open(input_path).with_context(|| format!("could not open '{}'", input_path))?;
        Box::new(BufReader::new(file))
    };

    match destination {
        Destination::Print => {
            let tags = opustags::inspect(input, &policy)
                .with_context(|| format!("could not read the comments of '{}'", input_path))?;
            OutputFormatter::new(config.format).output_comments(&tags, &mut stdout)?;
        }
        Destination::Stdout => {
            opustags::rewrite(input, BufWriter::new(&mut stdout), &policy)
                .with_context(|| format!("could not rewrite '{}'", input_path))?;
        }
        Destination::File { target, partial } => {
            let (guard, output) = PartialFile::create(&target, partial)?;
            opustags::rewrite(input, output, &policy)
                .with_context(|| format!("could not rewrite '{}'", input_path))?;
            guard.commit()?;
        }
    }
    Ok(())
}

fn destination(config: &Config) -> Result<Destination> {
    let input = config.input_path();

    if let Some(suffix) = &config.in_place {
        return Ok(Destination::File {
            target: PathBuf::from(input),
            partial: PathBuf::from(format!("{}{}", input, suffix)),
        });
    }

    match config.output.as_deref() {
        None => Ok(Destination::Print),
        Some("-") => Ok(Destination::Stdout),
        Some(output) => {
            let target = PathBuf::from(output);
            if target.exists() {
                if same_file(Path::new(input), &target) {
                    return Err(Error::BadArguments(format!(
                        "cannot write to the input file '{}', use --in-place instead",
                        output
                    ))
                    .into());
                }
                if !config.overwrite {
                    return Err(Error::BadArguments(format!(
                        "'{}' already exists, use -y to overwrite",
                        output
                    ))
                    .into());
                }
            }
            Ok(Destination::File {
                target,
                partial: PathBuf::from(format!("{}{}", output, DEFAULT_IN_PLACE_SUFFIX)),
            })
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Guard over an output file written on the side. The side file is moved
/// onto its destination by [`commit`](Self::commit); dropping the guard
/// before that removes it.
struct PartialFile {
    target: PathBuf,
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn create(target: &Path, path: PathBuf) -> Result<(Self, BufWriter<File>)> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| format!("could not create '{}'", path.display()))?;
        let guard = PartialFile {
            target: target.to_path_buf(),
            path,
            committed: false,
        };
        // Keep the permissions of a file being replaced
        if let Ok(metadata) = fs::metadata(target) {
            fs::set_permissions(&guard.path, metadata.permissions())
                .with_context(|| format!("could not set permissions on '{}'", guard.path.display()))?;
        }
        Ok((guard, BufWriter::new(file)))
    }

    fn commit(mut self) -> Result<()> {
        fs::rename(&self.path, &self.target).with_context(|| {
            format!(
                "could not move '{}' to '{}'",
                self.path.display(),
                self.target.display()
            )
        })?;
        self.committed = true;
        debug!(target = %self.target.display(), "output committed");
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}
