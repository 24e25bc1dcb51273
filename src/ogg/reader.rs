use std::collections::VecDeque;
use std::io::Read;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::ogg::page::{OggPage, Packet};
use crate::ogg::OGG_GRANULE_NONE;

/// A packet reassembled by the reader, owned until handed out
#[derive(Debug)]
struct PendingPacket {
    data: Vec<u8>,
    bos: bool,
    eos: bool,
    granule_position: u64,
    packet_no: u64,
}

impl PendingPacket {
    fn view(&self) -> Packet<'_> {
        Packet {
            data: &self.data,
            bos: self.bos,
            eos: self.eos,
            granule_position: self.granule_position,
            packet_no: self.packet_no,
        }
    }
}

/// Pulls pages from a byte source and rebuilds the packets of a single
/// logical stream.
///
/// The stream is bound to the serial number of the first
/// beginning-of-stream page read. Packet reconstruction is only used for
/// the header packets; once those are consumed, callers keep calling
/// [`read_page`](Self::read_page) and forward the raw pages.
pub struct OggReader<R: Read> {
    input: R,
    page: Option<OggPage>,
    page_fed: bool,
    serial: Option<u32>,
    partial: Option<Vec<u8>>,
    ready: VecDeque<PendingPacket>,
    packet_no: u64,
}

impl<R: Read> OggReader<R> {
    pub fn new(input: R) -> Self {
        OggReader {
            input,
            page: None,
            page_fed: false,
            serial: None,
            partial: None,
            ready: VecDeque::new(),
            packet_no: 0,
        }
    }

    /// Read the next page, which stays available through
    /// [`page`](Self::page) until the following call.
    ///
    /// Fails with [`Error::EndOfFile`] once the input is exhausted on a page
    /// boundary.
    pub fn read_page(&mut self) -> Result<&OggPage> {
        let page = OggPage::read(&mut self.input)?.ok_or(Error::EndOfFile)?;
        trace!(
            serial = page.header.bitstream_serial,
            sequence = page.header.page_sequence,
            size = page.data.len(),
            "read page"
        );
        if self.serial.is_none() && page.header.is_bos() {
            debug!(serial = page.header.bitstream_serial, "bound to logical stream");
            self.serial = Some(page.header.bitstream_serial);
        }
        self.page_fed = false;
        Ok(self.page.insert(page))
    }

    /// The page returned by the last successful [`read_page`](Self::read_page)
    pub fn page(&self) -> Option<&OggPage> {
        self.page.as_ref()
    }

    /// Hand the next packet of the stream to `inspect`.
    ///
    /// The packet starts in the current page. When it continues past the
    /// end of that page, the following pages are read until it completes,
    /// and the last one of them becomes the current page. The view given to
    /// `inspect` cannot outlive the call; its result is returned as is.
    pub fn read_header_packet<T, F>(&mut self, inspect: F) -> Result<T>
    where
        F: FnOnce(&Packet<'_>) -> Result<T>,
    {
        if !self.page_fed {
            self.feed_page()?;
        }
        loop {
            if let Some(packet) = self.ready.pop_front() {
                debug!(
                    packet_no = packet.packet_no,
                    size = packet.data.len(),
                    "extracted header packet"
                );
                return inspect(&packet.view());
            }
            if self.partial.is_none() {
                return Err(Error::ogg("no packet could be extracted from the current page"));
            }
            debug!("header packet continues on the next page");
            match self.read_page() {
                Ok(_) => {}
                Err(Error::EndOfFile) => {
                    return Err(Error::ogg("stream ended in the middle of a packet"));
                }
                Err(e) => return Err(e),
            }
            self.feed_page()?;
        }
    }

    /// Whether the pages fed so far hold data beyond the packets already
    /// handed out.
    pub fn has_pending_packets(&self) -> bool {
        !self.ready.is_empty() || self.partial.is_some()
    }

    /// Split the current page into packets, completing the one carried over
    /// from the previous page if any.
    fn feed_page(&mut self) -> Result<()> {
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| Error::ogg("no page has been read yet"))?;
        self.page_fed = true;

        match self.serial {
            None => return Err(Error::ogg("no beginning-of-stream page was found")),
            Some(serial) if serial != page.header.bitstream_serial => {
                return Err(Error::ogg(format!(
                    "page {} belongs to stream {:#010x}, expected {:#010x}",
                    page.header.page_sequence, page.header.bitstream_serial, serial
                )));
            }
            Some(_) => {}
        }

        if page.header.is_continuation() && self.partial.is_none() {
            return Err(Error::ogg(format!(
                "page {} continues a packet that was never started",
                page.header.page_sequence
            )));
        }
        if !page.header.is_continuation() && self.partial.is_some() {
            return Err(Error::ogg(format!(
                "page {} interrupts an unfinished packet",
                page.header.page_sequence
            )));
        }

        // Only the packet ending last on a page gets its granule position
        // and end-of-stream flag.
        let last_end = page.header.segment_table.iter().rposition(|&l| l < 255);

        let mut offset = 0;
        for (index, &lacing) in page.header.segment_table.iter().enumerate() {
            let end = offset + lacing as usize;
            self.partial
                .get_or_insert_with(Vec::new)
                .extend_from_slice(&page.data[offset..end]);
            offset = end;

            if lacing < 255 {
                let data = self.partial.take().unwrap_or_default();
                let is_last = Some(index) == last_end;
                self.ready.push_back(PendingPacket {
                    data,
                    bos: self.packet_no == 0,
                    eos: is_last && page.header.is_eos(),
                    granule_position: if is_last {
                        page.header.granule_position
                    } else {
                        OGG_GRANULE_NONE
                    },
                    packet_no: self.packet_no,
                });
                self.packet_no += 1;
            }
        }
        Ok(())
    }
}
