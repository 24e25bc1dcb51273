// Ogg container framing
//
// OGG File Structure:
// - OGG Page Header (27 bytes)
//   - Capture Pattern: "OggS" (4 bytes)
//   - Version: 0 (1 byte)
//   - Header Type: 1=continuation, 2=bos, 4=eos (1 byte)
//   - Granule Position (8 bytes)
//   - Bitstream Serial Number (4 bytes)
//   - Page Sequence Number (4 bytes)
//   - CRC Checksum (4 bytes)
//   - Number of Page Segments (1 byte)
//   - Segment Table (variable)
// - Page body: the segments, back to back
//
// A packet is a run of segments ending with one shorter than 255 bytes,
// and may continue from one page onto the next. Checksums are computed and
// verified by the `ogg` crate.

pub mod page;
pub mod reader;
pub mod writer;

pub use page::{OggPage, OggPageHeader, Packet};
pub use reader::OggReader;
pub use writer::OggWriter;

// OGG signature
pub const OGG_SIGNATURE: &[u8; 4] = b"OggS";

pub const OGG_HEADER_TYPE_CONTINUATION: u8 = 0x01;
pub const OGG_HEADER_TYPE_BOS: u8 = 0x02; // Beginning of Stream
pub const OGG_HEADER_TYPE_EOS: u8 = 0x04; // End of Stream

/// Fixed part of a page header, before the segment table
pub const OGG_PAGE_HEADER_SIZE: usize = 27;

/// Most segments a single page can carry
pub const OGG_MAX_SEGMENTS: usize = 255;

/// Granule position of a page on which no packet ends
pub const OGG_GRANULE_NONE: u64 = u64::MAX;
