//! Byte-level decoding of reservation exports.
//!
//! Booking sites hand out files in whatever encoding their locale prefers.
//! A byte order mark decides first; otherwise the whole file must be valid
//! UTF-8, and anything else is read as Shift-JIS (Windows code page 932).

use encoding_rs::{Encoding, SHIFT_JIS, UTF_8, UTF_16BE, UTF_16LE};

use super::ImportError;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];

#[derive(Debug)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static Encoding,
}

/// Decode `bytes` into text.
///
/// Decoding never substitutes replacement characters: bytes that are invalid
/// in the chosen encoding fail with [`ImportError::Decode`].
pub fn decode(bytes: &[u8]) -> Result<DecodedText, ImportError> {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        return decode_strict(UTF_8, rest);
    }
    if let Some(rest) = bytes.strip_prefix(UTF16LE_BOM) {
        return decode_strict(UTF_16LE, rest);
    }
    if let Some(rest) = bytes.strip_prefix(UTF16BE_BOM) {
        return decode_strict(UTF_16BE, rest);
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(DecodedText {
            text: text.to_string(),
            encoding: UTF_8,
        }),
        Err(_) => decode_strict(SHIFT_JIS, bytes),
    }
}

fn decode_strict(
    encoding: &'static Encoding,
    bytes: &[u8],
) -> Result<DecodedText, ImportError> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| DecodedText {
            text: text.into_owned(),
            encoding,
        })
        .ok_or_else(|| ImportError::Decode(format!("input is not valid {}", encoding.name())))
}
