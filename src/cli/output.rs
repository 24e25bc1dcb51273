// Printing and reading comments for the CLI

use std::io::{self, BufRead, Write};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use clap::ValueEnum;
use opustags::utils::encoding::decode_lossy;
use opustags::OpusTags;
use serde::Serialize;
use tracing::warn;

/// Output format for printed comments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One NAME=VALUE per line
    #[default]
    Text,
    /// JSON object with vendor, comments and extra data
    Json,
}

#[derive(Serialize)]
struct CommentHeaderView {
    vendor: String,
    comments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extra_data: Option<String>,
}

/// Format and output comments
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn output_comments(&self, tags: &OpusTags, writer: &mut impl Write) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => self.output_text(tags, writer)?,
            OutputFormat::Json => self.output_json(tags, writer)?,
        }
        writer.flush()
    }

    /// Raw bytes, one comment per line
    fn output_text(&self, tags: &OpusTags, writer: &mut impl Write) -> io::Result<()> {
        for comment in &tags.comments {
            if comment.contains(&b'\n') {
                warn!(
                    comment = %decode_lossy(comment),
                    "comment contains a line feed, printed output is ambiguous"
                );
            }
            writer.write_all(comment)?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }

    fn output_json(&self, tags: &OpusTags, writer: &mut impl Write) -> io::Result<()> {
        let view = CommentHeaderView {
            vendor: decode_lossy(&tags.vendor),
            comments: tags.comments.iter().map(|c| decode_lossy(c)).collect(),
            extra_data: (!tags.extra_data.is_empty()).then(|| BASE64.encode(&tags.extra_data)),
        };
        serde_json::to_writer_pretty(&mut *writer, &view)?;
        writeln!(writer)
    }
}

/// Read replacement comments, one NAME=VALUE per line.
///
/// Empty lines are skipped; lines without `=` are skipped with a warning.
pub fn read_comments<R: BufRead>(reader: R) -> io::Result<Vec<Vec<u8>>> {
    let mut comments = Vec::new();
    for (number, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        if !line.contains(&b'=') {
            warn!(line = number + 1, "skipping malformed comment, expected NAME=VALUE");
            continue;
        }
        comments.push(line);
    }
    Ok(comments)
}
