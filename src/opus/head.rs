// Identification header (OpusHead)
//
//  0   magic "OpusHead"          8 bytes
//  8   version                   1 byte, major version in the high nibble
//  9   channel count             1 byte
// 10   pre-skip                  2 bytes LE
// 12   input sample rate         4 bytes LE
// 16   output gain               2 bytes LE, signed Q7.8 dB
// 18   channel mapping family    1 byte
// 19   mapping table             family != 0 only:
//                                stream count, coupled count, one byte per channel

use tracing::debug;

use crate::error::{Error, Result};
use crate::opus::OPUS_HEAD;
use crate::utils::io::ByteCursor;

const OPUS_HEAD_SIZE: usize = 19;

/// Channel mapping table present for mapping families other than 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMappingTable {
    pub stream_count: u8,
    pub coupled_count: u8,
    pub channel_mapping: Vec<u8>,
}

/// Decoded identification header. Only read, never re-rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpusHead {
    pub version: u8,
    pub channel_count: u8,
    pub pre_skip: u16,
    pub input_sample_rate: u32,
    pub output_gain: i16,
    pub mapping_family: u8,
    pub mapping_table: Option<ChannelMappingTable>,
}

impl OpusHead {
    /// Decode and structurally check an identification header packet
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < OPUS_HEAD.len() || &data[..OPUS_HEAD.len()] != OPUS_HEAD {
            return Err(Error::BadIdentificationHeader("missing OpusHead magic number"));
        }
        if data.len() < OPUS_HEAD_SIZE {
            return Err(Error::BadIdentificationHeader("packet too short"));
        }

        let mut cursor = ByteCursor::new(&data[OPUS_HEAD.len()..]);
        let truncated = || Error::BadIdentificationHeader("packet too short");
        let version = cursor.read_u8().ok_or_else(truncated)?;
        let channel_count = cursor.read_u8().ok_or_else(truncated)?;
        let pre_skip = cursor.read_le_u16().ok_or_else(truncated)?;
        let input_sample_rate = cursor.read_le_u32().ok_or_else(truncated)?;
        let output_gain = cursor.read_le_u16().ok_or_else(truncated)? as i16;
        let mapping_family = cursor.read_u8().ok_or_else(truncated)?;

        if version >> 4 != 0 {
            return Err(Error::BadIdentificationHeader("unsupported major version"));
        }
        if channel_count == 0 {
            return Err(Error::BadIdentificationHeader("channel count is zero"));
        }

        let mapping_table = if mapping_family == 0 {
            if channel_count > 2 {
                return Err(Error::BadIdentificationHeader(
                    "mapping family 0 allows at most 2 channels",
                ));
            }
            None
        } else {
            let short = || Error::BadIdentificationHeader("channel mapping table is cut");
            let stream_count = cursor.read_u8().ok_or_else(short)?;
            let coupled_count = cursor.read_u8().ok_or_else(short)?;
            let channel_mapping = cursor.take(channel_count as usize).ok_or_else(short)?;
            if stream_count == 0 {
                return Err(Error::BadIdentificationHeader("stream count is zero"));
            }
            if coupled_count > stream_count {
                return Err(Error::BadIdentificationHeader(
                    "more coupled streams than streams",
                ));
            }
            // Entries index decoded channels; 255 marks a silent channel
            let decoded = stream_count as usize + coupled_count as usize;
            if channel_mapping.iter().any(|&c| c != 255 && c as usize >= decoded) {
                return Err(Error::BadIdentificationHeader(
                    "channel mapping entry out of range",
                ));
            }
            Some(ChannelMappingTable {
                stream_count,
                coupled_count,
                channel_mapping: channel_mapping.to_vec(),
            })
        };

        Ok(OpusHead {
            version,
            channel_count,
            pre_skip,
            input_sample_rate,
            output_gain,
            mapping_family,
            mapping_table,
        })
    }
}

/// Check the first packet of the stream is a well-formed OpusHead.
///
/// This is a structural check: nothing is said about whether the codec
/// parameters make sense.
pub fn validate_identification_header(data: &[u8]) -> Result<()> {
    let head = OpusHead::parse(data)?;
    debug!(
        version = head.version,
        channels = head.channel_count,
        pre_skip = head.pre_skip,
        input_sample_rate = head.input_sample_rate,
        mapping_family = head.mapping_family,
        "identification header"
    );
    Ok(())
}
