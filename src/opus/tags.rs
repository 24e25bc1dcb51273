// Comment header (OpusTags)
//
// All integers are unsigned 32-bit little-endian.
//
//   "OpusTags"
//   vendor length, vendor string
//   comment count
//   for each comment: length, bytes ("KEY=value" by convention)
//   anything left: opaque data, kept verbatim

use crate::error::{Error, Result};
use crate::opus::OPUS_TAGS;
use crate::utils::io::ByteCursor;

/// Everything in an OpusTags packet.
///
/// Strings are raw bytes: the format says UTF-8 but nothing is validated,
/// so whatever was read is written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpusTags {
    pub vendor: Vec<u8>,
    /// In stream order, which is preserved by every edit
    pub comments: Vec<Vec<u8>>,
    /// Trailing data after the comment list. RFC 7845 allows padding or
    /// unspecified binary data here; it is always kept.
    pub extra_data: Vec<u8>,
}

impl OpusTags {
    /// Decode an OpusTags packet.
    ///
    /// Bounds are checked field by field, in stream order, and the first
    /// field that runs past the end of the packet names the error.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let magic_len = data.len().min(OPUS_TAGS.len());
        if data[..magic_len] != OPUS_TAGS[..magic_len] {
            return Err(Error::BadMagicNumber);
        }

        let mut cursor = ByteCursor::new(data);
        let vendor_length = cursor
            .take(OPUS_TAGS.len())
            .and_then(|_| cursor.read_le_u32())
            .ok_or(Error::OverflowingMagicNumber { size: data.len() })?;

        let offset = cursor.position();
        let vendor = cursor
            .take(vendor_length as usize)
            .ok_or(Error::OverflowingVendorData {
                offset,
                declared: vendor_length,
                available: cursor.remaining(),
            })?
            .to_vec();

        let offset = cursor.position();
        let count = cursor
            .read_le_u32()
            .ok_or(Error::OverflowingCommentCount { offset })?;

        // Every comment takes at least 4 bytes, which bounds the allocation
        // whatever the declared count.
        let mut comments = Vec::with_capacity((count as usize).min(cursor.remaining() / 4));
        for index in 0..count {
            let offset = cursor.position();
            let length = cursor
                .read_le_u32()
                .ok_or(Error::OverflowingCommentLength { index, offset })?;
            let offset = cursor.position();
            let comment = cursor
                .take(length as usize)
                .ok_or(Error::OverflowingCommentData {
                    index,
                    offset,
                    declared: length,
                    available: cursor.remaining(),
                })?;
            comments.push(comment.to_vec());
        }

        Ok(OpusTags {
            vendor,
            comments,
            extra_data: cursor.rest().to_vec(),
        })
    }

    /// Encode back into an OpusTags packet, extra data included.
    ///
    /// Fails before producing anything if a length, the comment count or
    /// the packet size does not fit in 32 bits.
    pub fn render(&self) -> Result<Vec<u8>> {
        let vendor_length = to_u32("vendor string", self.vendor.len())?;
        let count = to_u32("comment list", self.comments.len())?;
        let mut total = OPUS_TAGS.len() + 4 + self.vendor.len() + 4 + self.extra_data.len();
        for comment in &self.comments {
            to_u32("comment", comment.len())?;
            total = total.saturating_add(4 + comment.len());
        }
        to_u32("comment header", total)?;

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(OPUS_TAGS);
        out.extend_from_slice(&vendor_length.to_le_bytes());
        out.extend_from_slice(&self.vendor);
        out.extend_from_slice(&count.to_le_bytes());
        for comment in &self.comments {
            out.extend_from_slice(&(comment.len() as u32).to_le_bytes());
            out.extend_from_slice(comment);
        }
        out.extend_from_slice(&self.extra_data);
        Ok(out)
    }

    /// Append a comment after the existing ones
    pub fn add(&mut self, comment: impl Into<Vec<u8>>) {
        self.comments.push(comment.into());
    }

    /// Remove every comment whose key equals `key`, ignoring ASCII case.
    ///
    /// The key is what precedes the first `=`; comments without `=` never
    /// match.
    pub fn delete_by_key(&mut self, key: &[u8]) {
        self.comments
            .retain(|comment| !comment_key(comment).is_some_and(|k| k.eq_ignore_ascii_case(key)));
    }

    /// Delete by `NAME` or by `NAME=VALUE`.
    ///
    /// A bare name deletes like [`delete_by_key`](Self::delete_by_key). With
    /// a value, only comments with that key and exactly that value go.
    pub fn delete_matching(&mut self, selector: &[u8]) {
        match split_comment(selector) {
            None => self.delete_by_key(selector),
            Some((key, value)) => self.comments.retain(|comment| {
                !split_comment(comment)
                    .is_some_and(|(k, v)| k.eq_ignore_ascii_case(key) && v == value)
            }),
        }
    }
}

/// Split `KEY=value` at the first `=`
pub fn split_comment(comment: &[u8]) -> Option<(&[u8], &[u8])> {
    let eq = comment.iter().position(|&b| b == b'=')?;
    Some((&comment[..eq], &comment[eq + 1..]))
}

fn comment_key(comment: &[u8]) -> Option<&[u8]> {
    split_comment(comment).map(|(key, _)| key)
}

fn to_u32(field: &'static str, value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::IntOverflow { field, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;

    /// Comment header as produced by opusenc, 62 bytes
    fn standard_packet() -> Vec<u8> {
        let mut data = b"OpusTags".to_vec();
        data.extend_from_slice(&13u32.to_le_bytes());
        data.extend_from_slice(b"libopus 1.3.1");
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&9u32.to_le_bytes());
        data.extend_from_slice(b"TITLE=Foo");
        data.extend_from_slice(&16u32.to_le_bytes());
        data.extend_from_slice(b"ENCODER=opusenc ");
        data
    }

    fn tags(comments: &[&str]) -> OpusTags {
        OpusTags {
            vendor: b"vendor".to_vec(),
            comments: comments.iter().map(|c| c.as_bytes().to_vec()).collect(),
            extra_data: Vec::new(),
        }
    }

    #[test]
    fn test_parse_standard_packet() {
        let data = standard_packet();
        assert_eq!(data.len(), 62);
        let tags = OpusTags::parse(&data).unwrap();
        assert_eq!(tags.vendor, b"libopus 1.3.1");
        assert_eq!(tags.comments, vec![b"TITLE=Foo".to_vec(), b"ENCODER=opusenc ".to_vec()]);
        assert!(tags.extra_data.is_empty());
        assert_eq!(tags.render().unwrap(), data);
    }

    #[test]
    fn test_render_then_parse() {
        let original = OpusTags {
            vendor: b"\xFFnot utf-8".to_vec(),
            comments: vec![b"A=1".to_vec(), b"no separator".to_vec(), Vec::new(), b"a=\n2".to_vec()],
            extra_data: vec![0, 1, 2, 3],
        };
        let rendered = original.render().unwrap();
        assert_eq!(OpusTags::parse(&rendered).unwrap(), original);
    }

    #[test]
    fn test_bad_magic_number() {
        let mut data = standard_packet();
        data[0] = b'o';
        assert!(matches!(OpusTags::parse(&data), Err(Error::BadMagicNumber)));
        assert!(matches!(OpusTags::parse(b"OpusHead"), Err(Error::BadMagicNumber)));
        assert!(matches!(OpusTags::parse(b"Vorb"), Err(Error::BadMagicNumber)));
    }

    #[test]
    fn test_overflowing_magic_number() {
        for data in [&b""[..], &b"Opus"[..], &b"OpusTags"[..], &b"OpusTags\x01\x00\x00"[..]] {
            let err = OpusTags::parse(data).unwrap_err();
            assert_eq!(err.status(), Status::OverflowingMagicNumber, "{:?}", data);
        }
    }

    #[test]
    fn test_overflow_order() {
        let data = standard_packet();
        // Cut points and the field they land in
        let cases = [
            (20, Status::OverflowingVendorData),
            (24, Status::OverflowingVendorData),
            (25, Status::OverflowingCommentCount),
            (28, Status::OverflowingCommentCount),
            (29, Status::OverflowingCommentLength),
            (32, Status::OverflowingCommentLength),
            (33, Status::OverflowingCommentData),
            (41, Status::OverflowingCommentData),
            (42, Status::OverflowingCommentLength),
            (45, Status::OverflowingCommentLength),
            (46, Status::OverflowingCommentData),
            (61, Status::OverflowingCommentData),
        ];
        for (cut, status) in cases {
            let err = OpusTags::parse(&data[..cut]).unwrap_err();
            assert_eq!(err.status(), status, "cut at {}", cut);
        }
    }

    #[test]
    fn test_count_larger_than_packet() {
        let mut data = b"OpusTags".to_vec();
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&u32::MAX.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.push(b'x');
        match OpusTags::parse(&data) {
            Err(Error::OverflowingCommentLength { index, offset }) => {
                assert_eq!(index, 1);
                assert_eq!(offset, 21);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_extra_data_survives_edits() {
        let mut data = standard_packet();
        data.extend_from_slice(b"\x01binary\x00padding");
        let mut tags = OpusTags::parse(&data).unwrap();
        assert_eq!(tags.extra_data, b"\x01binary\x00padding");

        tags.delete_by_key(b"title");
        tags.add("ARTIST=Someone");
        let rendered = tags.render().unwrap();
        assert!(rendered.ends_with(b"\x01binary\x00padding"));
        let reparsed = OpusTags::parse(&rendered).unwrap();
        assert_eq!(reparsed.extra_data, b"\x01binary\x00padding");
        assert_eq!(reparsed.comments, vec![b"ENCODER=opusenc ".to_vec(), b"ARTIST=Someone".to_vec()]);
    }

    #[test]
    fn test_delete_by_key_ignores_case() {
        let mut tags = tags(&["Title=Foo", "SUBTITLE=x", "TITLE=Bar", "title", "ARTIST=y"]);
        tags.delete_by_key(b"TITLE");
        assert_eq!(
            tags.comments,
            vec![b"SUBTITLE=x".to_vec(), b"title".to_vec(), b"ARTIST=y".to_vec()]
        );
        tags.delete_by_key(b"GENRE");
        assert_eq!(tags.comments.len(), 3);
    }

    #[test]
    fn test_delete_by_key_uses_first_separator() {
        let mut tags = tags(&["A=B=C", "A=B"]);
        tags.delete_by_key(b"A=B");
        assert_eq!(tags.comments.len(), 2);
        tags.delete_by_key(b"a");
        assert!(tags.comments.is_empty());
    }

    #[test]
    fn test_delete_matching_value() {
        let mut tags = tags(&["ARTIST=One", "artist=Two", "ARTIST=one", "TITLE=One"]);
        tags.delete_matching(b"Artist=One");
        assert_eq!(
            tags.comments,
            vec![b"artist=Two".to_vec(), b"ARTIST=one".to_vec(), b"TITLE=One".to_vec()]
        );
        tags.delete_matching(b"ARTIST");
        assert_eq!(tags.comments, vec![b"TITLE=One".to_vec()]);
    }

    #[test]
    fn test_add_keeps_order() {
        let mut tags = tags(&["B=2"]);
        tags.add("A=1");
        tags.add(b"C=3".to_vec());
        assert_eq!(tags.comments, vec![b"B=2".to_vec(), b"A=1".to_vec(), b"C=3".to_vec()]);
    }

    #[test]
    fn test_length_overflow() {
        assert_eq!(to_u32("comment", u32::MAX as usize).unwrap(), u32::MAX);
        if let Some(too_big) = (u32::MAX as usize).checked_add(1) {
            let err = to_u32("comment", too_big).unwrap_err();
            assert_eq!(err.status(), Status::IntOverflow);
        }
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_render_rejects_oversized_header() {
        // Each field fits in 32 bits, the packet does not. The zeroed
        // buffers are never written, so they stay unmapped.
        let half = 1usize << 31;
        let tags = OpusTags {
            vendor: vec![0; half],
            comments: vec![vec![0; half]],
            extra_data: Vec::new(),
        };
        match tags.render() {
            Err(Error::IntOverflow { field, value }) => {
                assert_eq!(field, "comment header");
                assert_eq!(value, 8 + 4 + half + 4 + 4 + half);
            }
            other => panic!("unexpected result: {:?}", other.map(|v| v.len())),
        }
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;
        use proptest::test_runner::TestCaseError;

        /// Arbitrary bytes, or a KEY=value pair with a plain ASCII key
        fn comment() -> impl Strategy<Value = Vec<u8>> {
            prop_oneof![
                prop::collection::vec(any::<u8>(), 0..48),
                (
                    prop::collection::vec(b'A'..=b'Z', 1..12),
                    prop::collection::vec(any::<u8>(), 0..32),
                )
                    .prop_map(|(key, value)| [key, b"=".to_vec(), value].concat()),
            ]
        }

        fn opus_tags() -> impl Strategy<Value = OpusTags> {
            (
                prop::collection::vec(any::<u8>(), 0..64),
                prop::collection::vec(comment(), 0..16),
                prop::collection::vec(any::<u8>(), 0..32),
            )
                .prop_map(|(vendor, comments, extra_data)| OpusTags {
                    vendor,
                    comments,
                    extra_data,
                })
        }

        proptest! {
            #[test]
            fn render_then_parse_round_trip(tags in opus_tags()) {
                let rendered = tags.render().map_err(|e| TestCaseError::fail(e.to_string()))?;
                let expected_len = 8 + 4 + tags.vendor.len() + 4
                    + tags.comments.iter().map(|c| 4 + c.len()).sum::<usize>()
                    + tags.extra_data.len();
                prop_assert_eq!(rendered.len(), expected_len);

                let parsed = OpusTags::parse(&rendered).map_err(|e| TestCaseError::fail(e.to_string()))?;
                prop_assert_eq!(&parsed, &tags);
                let again = parsed.render().map_err(|e| TestCaseError::fail(e.to_string()))?;
                prop_assert_eq!(again, rendered);
            }
        }

        proptest! {
            #[test]
            fn parsed_packets_render_back_unchanged(body in prop::collection::vec(any::<u8>(), 0..96)) {
                let data = [b"OpusTags".to_vec(), body].concat();
                // Any packet that decodes is reproduced byte for byte
                if let Ok(tags) = OpusTags::parse(&data) {
                    let rendered = tags.render().map_err(|e| TestCaseError::fail(e.to_string()))?;
                    prop_assert_eq!(rendered, data);
                }
            }
        }

        proptest! {
            #[test]
            fn delete_by_key_keeps_other_comments(tags in opus_tags(), key in prop::collection::vec(b'A'..=b'Z', 1..4)) {
                let mut edited = tags.clone();
                edited.delete_by_key(&key.to_ascii_lowercase());
                let kept: Vec<Vec<u8>> = tags
                    .comments
                    .iter()
                    .filter(|c| !split_comment(c).is_some_and(|(k, _)| k.eq_ignore_ascii_case(&key)))
                    .cloned()
                    .collect();
                prop_assert_eq!(edited.comments, kept);
                prop_assert_eq!(edited.extra_data, tags.extra_data);
                prop_assert_eq!(edited.vendor, tags.vendor);
            }
        }
    }
}
