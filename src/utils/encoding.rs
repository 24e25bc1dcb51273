// Encoding utilities

use encoding_rs::UTF_8;

/// Decode an opaque byte string for display.
///
/// Vendor strings and comments are conventionally UTF-8 but never
/// validated, so invalid sequences are replaced rather than rejected.
pub fn decode_lossy(data: &[u8]) -> String {
    UTF_8.decode_without_bom_handling(data).0.into_owned()
}
