// OPUS header packets
//
// An Ogg Opus stream opens with two header packets, each on its own page:
// - Identification header: "OpusHead" (8 bytes) + fixed codec parameters
// - Comment header: "OpusTags" (8 bytes) + vendor string + comment list,
//   optionally followed by opaque binary data
// Audio data pages follow.
//
// Reference:
// - RFC 7845: Ogg Encapsulation for the Opus Audio Codec

pub mod head;
pub mod tags;

pub use head::{validate_identification_header, OpusHead};
pub use tags::OpusTags;

pub const OPUS_HEAD: &[u8; 8] = b"OpusHead";
pub const OPUS_TAGS: &[u8; 8] = b"OpusTags";
