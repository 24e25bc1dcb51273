use std::io::Read;

use ::ogg::reading::PageParser;

use crate::error::{Error, Result};
use crate::ogg::{
    OGG_HEADER_TYPE_BOS, OGG_HEADER_TYPE_CONTINUATION, OGG_HEADER_TYPE_EOS, OGG_PAGE_HEADER_SIZE,
    OGG_SIGNATURE,
};
use crate::utils::io::read_full;

/// OGG Page Header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OggPageHeader {
    pub version: u8,
    pub header_type: u8,
    pub granule_position: u64,
    pub bitstream_serial: u32,
    pub page_sequence: u32,
    pub crc: u32,
    pub segment_table: Vec<u8>,
}

/// OGG Page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OggPage {
    pub header: OggPageHeader,
    pub data: Vec<u8>,
}

/// Borrowed view of one packet.
///
/// The bytes belong to whoever produced the view; copy them out to keep
/// them past the call that handed the view over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet<'a> {
    pub data: &'a [u8],
    pub bos: bool,
    pub eos: bool,
    pub granule_position: u64,
    pub packet_no: u64,
}

impl<'a> Packet<'a> {
    /// Header packets carry granule position 0
    pub fn header(data: &'a [u8], packet_no: u64) -> Self {
        Packet {
            data,
            bos: packet_no == 0,
            eos: false,
            granule_position: 0,
            packet_no,
        }
    }
}

impl OggPageHeader {
    /// Decode the fixed 27 bytes, already checked by the page parser, into
    /// a header with an empty segment table.
    fn parse_fixed(raw: &[u8; OGG_PAGE_HEADER_SIZE]) -> Self {
        let le32 = |at: usize| u32::from_le_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]]);
        let mut granule = [0u8; 8];
        granule.copy_from_slice(&raw[6..14]);

        OggPageHeader {
            version: raw[4],
            header_type: raw[5],
            granule_position: u64::from_le_bytes(granule),
            bitstream_serial: le32(14),
            page_sequence: le32(18),
            crc: le32(22),
            segment_table: Vec::new(),
        }
    }

    /// Serialise the header exactly as it appears in the stream
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(OGG_PAGE_HEADER_SIZE + self.segment_table.len());
        out.extend_from_slice(OGG_SIGNATURE);
        out.push(self.version);
        out.push(self.header_type);
        out.extend_from_slice(&self.granule_position.to_le_bytes());
        out.extend_from_slice(&self.bitstream_serial.to_le_bytes());
        out.extend_from_slice(&self.page_sequence.to_le_bytes());
        out.extend_from_slice(&self.crc.to_le_bytes());
        out.push(self.segment_table.len() as u8);
        out.extend_from_slice(&self.segment_table);
        out
    }

    /// Calculate total page data size from segment table
    pub fn get_data_size(&self) -> usize {
        self.segment_table.iter().map(|&x| x as usize).sum()
    }

    pub fn is_bos(&self) -> bool {
        self.header_type & OGG_HEADER_TYPE_BOS != 0
    }

    pub fn is_eos(&self) -> bool {
        self.header_type & OGG_HEADER_TYPE_EOS != 0
    }

    pub fn is_continuation(&self) -> bool {
        self.header_type & OGG_HEADER_TYPE_CONTINUATION != 0
    }
}

impl OggPage {
    /// Read the next page.
    ///
    /// `Ok(None)` means the input ended cleanly on a page boundary. A page
    /// cut short, with a bad capture pattern, an unknown version or a wrong
    /// checksum is an Ogg error. Version and checksum are checked by the
    /// `ogg` crate's page parser; the bytes are kept as read so the page can
    /// be copied out verbatim.
    pub fn read<R: Read>(reader: &mut R) -> Result<Option<Self>> {
        let mut raw = [0u8; OGG_PAGE_HEADER_SIZE];
        match read_full(reader, &mut raw)? {
            0 => return Ok(None),
            n if n < OGG_PAGE_HEADER_SIZE => {
                return Err(Error::ogg(format!("page header cut after {} bytes", n)));
            }
            _ => {}
        }
        if &raw[0..4] != OGG_SIGNATURE {
            return Err(Error::ogg(format!(
                "bad capture pattern {:02x?}, expected \"OggS\"",
                &raw[0..4]
            )));
        }

        let mut header = OggPageHeader::parse_fixed(&raw);
        let sequence = header.page_sequence;
        let (mut parser, segment_count) =
            PageParser::new(raw).map_err(|e| Error::ogg(format!("page {}: {}", sequence, e)))?;

        let mut segment_table = vec![0u8; segment_count];
        if read_full(reader, &mut segment_table)? != segment_count {
            return Err(Error::ogg("truncated segment table"));
        }
        let data_size = parser.parse_segments(segment_table.clone());
        header.segment_table = segment_table;

        let mut data = vec![0u8; data_size];
        let got = read_full(reader, &mut data)?;
        if got != data_size {
            return Err(Error::ogg(format!(
                "page body cut: expected {} bytes, got {}",
                data_size, got
            )));
        }

        parser
            .parse_packet_data(data.clone())
            .map_err(|e| Error::ogg(format!("page {}: {}", sequence, e)))?;
        Ok(Some(OggPage { header, data }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::ogg::writing::{PacketWriteEndInfo, PacketWriter};
    use std::io::Cursor;

    /// One BOS page of stream 1234 carrying "First"
    fn sample_bytes() -> Vec<u8> {
        let mut writer = PacketWriter::new(Vec::new());
        writer
            .write_packet(&b"First"[..], 1234, PacketWriteEndInfo::EndPage, 0)
            .unwrap();
        writer.into_inner()
    }

    fn serialise(page: &OggPage) -> Vec<u8> {
        let mut bytes = page.header.to_bytes();
        bytes.extend_from_slice(&page.data);
        bytes
    }

    #[test]
    fn test_known_page_bytes() {
        let bytes = sample_bytes();
        assert_eq!(bytes.len(), 33);
        assert_eq!(&bytes[0..4], b"OggS");
        assert_eq!(bytes[5], OGG_HEADER_TYPE_BOS);
        assert_eq!(&bytes[14..18], &1234u32.to_le_bytes());
        assert_eq!(&bytes[22..26], &0x387E_6070u32.to_le_bytes());
        assert_eq!(bytes[26], 1);
        assert_eq!(&bytes[28..], b"First");
    }

    #[test]
    fn test_read_back_verbatim() {
        let bytes = sample_bytes();
        let mut cursor = Cursor::new(bytes.clone());
        let read = OggPage::read(&mut cursor).unwrap().unwrap();
        assert_eq!(serialise(&read), bytes);
        assert_eq!(read.header.crc, 0x387E_6070);
        assert_eq!(read.header.bitstream_serial, 1234);
        assert!(read.header.is_bos());
        assert!(!read.header.is_eos());
        assert!(!read.header.is_continuation());
        assert!(OggPage::read(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut bytes = sample_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x20;
        let err = OggPage::read(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::Ogg(ref msg) if msg.contains("CRC32")));
    }

    #[test]
    fn test_bad_capture_pattern() {
        let mut bytes = sample_bytes();
        bytes[0] = b'X';
        let err = OggPage::read(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::Ogg(ref msg) if msg.contains("capture pattern")));
    }

    #[test]
    fn test_unknown_version() {
        let mut bytes = sample_bytes();
        bytes[4] = 1;
        let err = OggPage::read(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::Ogg(_)));
    }

    #[test]
    fn test_truncated_page() {
        let bytes = sample_bytes();
        for cut in [10, 27, 30] {
            let err = OggPage::read(&mut Cursor::new(bytes[..cut].to_vec())).unwrap_err();
            assert!(matches!(err, Error::Ogg(_)), "cut at {}", cut);
        }
    }

    #[test]
    fn test_data_size_from_segment_table() {
        let mut header = OggPageHeader::parse_fixed(&[0u8; OGG_PAGE_HEADER_SIZE]);
        header.segment_table = vec![255, 255, 10];
        assert_eq!(header.get_data_size(), 520);
    }
}
