use std::collections::HashMap;
use std::io::Write;

use ::ogg::writing::{PacketWriteEndInfo, PacketWriter};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::ogg::page::{OggPage, Packet};
use crate::ogg::OGG_MAX_SEGMENTS;

/// Writes header packets on pages of their own and forwards other pages
/// untouched.
///
/// Header pages are laced, flagged and checksummed by the `ogg` crate's
/// packet writer, which numbers the pages of each stream from 0.
pub struct OggWriter<W: Write> {
    packets: PacketWriter<'static, W>,
    /// Sequence number the next header page of each stream gets
    next_sequence: HashMap<u32, u32>,
}

impl<W: Write> OggWriter<W> {
    pub fn new(output: W) -> Self {
        OggWriter {
            packets: PacketWriter::new(output),
            next_sequence: HashMap::new(),
        }
    }

    /// Frame `packet` on fresh pages of stream `serial`, numbered from
    /// `sequence`, and write them out.
    ///
    /// The packet is flushed on its own: it never shares a page with
    /// another packet. Packets longer than 255 lacing values spill over
    /// continuation pages, and pages on which the packet does not end get
    /// granule position -1. Returns the sequence number the next page
    /// should use.
    ///
    /// Header pages of a stream are numbered consecutively from 0 and only
    /// the first one begins the stream; a `sequence` or `bos` flag that
    /// breaks this is an Ogg error.
    pub fn write_header_packet(&mut self, serial: u32, sequence: u32, packet: &Packet<'_>) -> Result<u32> {
        let expected = self.next_sequence.get(&serial).copied().unwrap_or(0);
        if sequence != expected {
            return Err(Error::ogg(format!(
                "header page of stream {:#010x} numbered {}, expected {}",
                serial, sequence, expected
            )));
        }
        if packet.bos != (expected == 0) {
            return Err(Error::ogg(format!(
                "beginning-of-stream flag {} on header page {} of stream {:#010x}",
                if packet.bos { "set" } else { "missing" },
                sequence,
                serial
            )));
        }

        let end = if packet.eos {
            PacketWriteEndInfo::EndStream
        } else {
            PacketWriteEndInfo::EndPage
        };
        self.packets
            .write_packet(packet.data.to_vec(), serial, end, packet.granule_position)?;

        let pages = page_count(packet.data.len());
        let next = sequence.wrapping_add(pages);
        self.next_sequence.insert(serial, next);
        debug!(
            serial,
            packet_no = packet.packet_no,
            size = packet.data.len(),
            pages,
            "wrote header packet"
        );
        Ok(next)
    }

    /// Write a page verbatim, header first, then body
    pub fn write_page(&mut self, page: &OggPage) -> Result<()> {
        let output = self.packets.inner_mut();
        output.write_all(&page.header.to_bytes())?;
        output.write_all(&page.data)?;
        trace!(
            serial = page.header.bitstream_serial,
            sequence = page.header.page_sequence,
            "wrote page"
        );
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.packets.inner_mut().flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.packets.into_inner()
    }
}

/// Pages taken by a packet of `size` bytes: one lacing value per full
/// 255 bytes plus the closing one, at most 255 lacing values per page.
fn page_count(size: usize) -> u32 {
    (size / 255 + 1).div_ceil(OGG_MAX_SEGMENTS) as u32
}
