// Single-pass rewrite of an Ogg Opus stream
//
// Start: first page, OpusHead, validated and written on its own page
// Tags:  second page, OpusTags, decoded, edited, re-encoded
// Copy:  every other page forwarded byte for byte until end of input

use std::io::{self, Read, Write};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::ogg::{OggReader, OggWriter, Packet};
use crate::opus::{validate_identification_header, OpusTags};

/// Edits to apply to the comment list.
///
/// Comments are raw `KEY=value` byte strings; deletions are `KEY` or
/// `KEY=value` selectors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditPolicy {
    pub to_delete: Vec<Vec<u8>>,
    pub to_add: Vec<Vec<u8>>,
    pub delete_all: bool,
    /// Replacement for the whole comment list
    pub set_all: Option<Vec<Vec<u8>>>,
}

impl EditPolicy {
    /// Replace or delete first, then append the additions in order
    pub fn apply(&self, tags: &mut OpusTags) {
        if let Some(comments) = &self.set_all {
            tags.comments = comments.clone();
        } else if self.delete_all {
            tags.comments.clear();
        } else {
            for selector in &self.to_delete {
                tags.delete_matching(selector);
            }
        }
        for comment in &self.to_add {
            tags.add(comment.clone());
        }
    }
}

enum State {
    Start,
    Tags { serial: u32, next_sequence: u32 },
    Copy { tags: OpusTags, last_eos: bool },
    Done { tags: OpusTags },
}

/// Rewrite the stream from `input` into `output` with the comment header
/// edited by `policy`. Returns the comments as written.
///
/// On error, `output` may hold a partial stream; it is up to the caller to
/// discard it.
pub fn rewrite<R: Read, W: Write>(input: R, output: W, policy: &EditPolicy) -> Result<OpusTags> {
    let mut reader = OggReader::new(input);
    let mut writer = OggWriter::new(output);
    let tags = run(&mut reader, Some(&mut writer), policy)?;
    writer.flush()?;
    Ok(tags)
}

/// Read the headers only, apply `policy` in memory and return the result.
/// Nothing past the comment header is read.
pub fn inspect<R: Read>(input: R, policy: &EditPolicy) -> Result<OpusTags> {
    let mut reader = OggReader::new(input);
    run::<R, io::Sink>(&mut reader, None, policy)
}

fn run<R: Read, W: Write>(
    reader: &mut OggReader<R>,
    mut writer: Option<&mut OggWriter<W>>,
    policy: &EditPolicy,
) -> Result<OpusTags> {
    let mut state = State::Start;
    loop {
        state = match state {
            State::Start => {
                let page = reader.read_page().map_err(missing_headers)?;
                if !page.header.is_bos() {
                    return Err(Error::ogg(
                        "first page lacks the beginning-of-stream flag",
                    ));
                }
                let serial = page.header.bitstream_serial;
                let sequence = page.header.page_sequence;

                let mut next_sequence = sequence.wrapping_add(1);
                reader.read_header_packet(|packet| {
                    validate_identification_header(packet.data)?;
                    if let Some(writer) = writer.as_deref_mut() {
                        next_sequence = writer.write_header_packet(serial, sequence, packet)?;
                    }
                    Ok(())
                })?;
                ensure_single_packet(reader)?;
                State::Tags {
                    serial,
                    next_sequence,
                }
            }
            State::Tags {
                serial,
                next_sequence,
            } => {
                reader.read_page().map_err(missing_headers)?;
                let (mut tags, eos) =
                    reader.read_header_packet(|packet| Ok((OpusTags::parse(packet.data)?, packet.eos)))?;
                ensure_single_packet(reader)?;
                debug!(comments = tags.comments.len(), extra = tags.extra_data.len(), "parsed comment header");

                policy.apply(&mut tags);
                let Some(writer) = writer.as_deref_mut() else {
                    return Ok(tags);
                };

                let rendered = tags.render()?;
                let packet = Packet {
                    eos,
                    ..Packet::header(&rendered, 1)
                };
                let after = writer.write_header_packet(serial, next_sequence, &packet)?;
                if let Some(page) = reader.page() {
                    let unedited_after = page.header.page_sequence.wrapping_add(1);
                    if after != unedited_after {
                        warn!(
                            expected = unedited_after,
                            actual = after,
                            "comment header page count changed; following pages keep their sequence numbers"
                        );
                    }
                }
                State::Copy {
                    tags,
                    last_eos: eos,
                }
            }
            State::Copy { tags, last_eos } => match reader.read_page() {
                Ok(page) => {
                    let eos = page.header.is_eos();
                    if let Some(writer) = writer.as_deref_mut() {
                        writer.write_page(page)?;
                    }
                    State::Copy {
                        tags,
                        last_eos: eos,
                    }
                }
                Err(Error::EndOfFile) => {
                    if !last_eos {
                        warn!("stream ended without an end-of-stream page");
                    }
                    State::Done { tags }
                }
                Err(e) => return Err(e),
            },
            State::Done { tags } => return Ok(tags),
        };
    }
}

fn missing_headers(err: Error) -> Error {
    match err {
        Error::EndOfFile => Error::ogg("stream ended before both Opus header packets were read"),
        other => other,
    }
}

/// Header pages must carry nothing but their packet, or the rest of the
/// page would be lost when the packet is written on a fresh page.
fn ensure_single_packet<R: Read>(reader: &OggReader<R>) -> Result<()> {
    if reader.has_pending_packets() {
        return Err(Error::ogg("header page holds more than one packet"));
    }
    Ok(())
}
