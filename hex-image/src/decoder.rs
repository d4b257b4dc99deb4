//! The decoder contract shared by all formats, and the factory that picks
//! a decoder from a sample line.
//!
//! ## Examples
//!
//! Decoding a whole file held in memory:
//!
//! ```
//! use hex_image::{decode_str, FormatKind, RecordDecoder};
//!
//! let decoder = decode_str(":0B0010006164647265737320676170A7\n:00000001FF\n");
//!
//! assert_eq!(decoder.format(), FormatKind::IntelHex);
//! assert_eq!(decoder.image().get(0x0010), Some(b'a'));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::format::FormatKind;
use crate::ihex::IntelHexDecoder;
use crate::image::MemoryImage;
use crate::srecord::SRecordDecoder;

/// How to treat a record whose embedded checksum disagrees with the
/// recomputed value.
///
/// The checksum is always computed; the policy only decides what a mismatch
/// does to the line.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub enum ChecksumPolicy {
    /// Log the mismatch and keep the record's data.
    #[default]
    Lenient,
    /// Reject the line with [`DecodeError::ChecksumMismatch`], dropping its
    /// data.
    Strict,
}

/// Line-by-line decoding of one record format into a [`MemoryImage`].
///
/// A decoder owns its image and its format-specific state (offset
/// accumulator, latched registers). It is driven by feeding every line of a
/// file, in file order, to [`parse`](RecordDecoder::parse).
pub trait RecordDecoder {
    /// The format this decoder handles.
    fn format(&self) -> FormatKind;

    /// Decodes one line.
    ///
    /// `Ok(())` means the line was recognized and, if it was a data-bearing
    /// record, its bytes were merged into the image. An error rejects the
    /// single line only: the decoder stays valid and the caller chooses
    /// whether to skip or abort.
    fn parse(&mut self, line: &str) -> Result<(), DecodeError>;

    /// The image decoded so far.
    fn image(&self) -> &MemoryImage;

    /// Consumes the decoder, returning the decoded image.
    fn into_image(self) -> MemoryImage
    where
        Self: Sized;
}

/// The degraded fallback for input no format recognizes.
///
/// It accepts no data, so downstream checksum queries see an all-blank
/// image instead of a crash.
#[derive(Debug, Default)]
pub struct NullDecoder {
    image: MemoryImage,
}

impl NullDecoder {
    /// Creates a null decoder with an empty image.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordDecoder for NullDecoder {
    fn format(&self) -> FormatKind {
        FormatKind::Unknown
    }

    fn parse(&mut self, _line: &str) -> Result<(), DecodeError> {
        Err(DecodeError::UnknownFormat)
    }

    fn image(&self) -> &MemoryImage {
        &self.image
    }

    fn into_image(self) -> MemoryImage {
        self.image
    }
}

/// A decoder for any of the supported formats, selected once by
/// [`Decoder::detect`] and then used monomorphically for the lifetime of
/// one decode pass.
///
/// The enumeration is closed on purpose: adding a format extends the
/// exhaustive matches below at compile time instead of relying on runtime
/// type inspection.
#[derive(Debug)]
pub enum Decoder {
    /// Intel HEX records.
    IntelHex(IntelHexDecoder),
    /// Motorola S-records.
    SRecord(SRecordDecoder),
    /// Fallback that accepts no data.
    Null(NullDecoder),
}

impl Decoder {
    /// Selects the decoder whose format recognition matches the given
    /// sample line, conventionally the first line of the file.
    ///
    /// Unrecognized input yields the [`NullDecoder`] variant, so the caller
    /// always receives a valid, if empty, image.
    pub fn detect(line: &str) -> Self {
        Self::detect_with_policy(line, ChecksumPolicy::default())
    }

    /// Like [`Decoder::detect`], with an explicit checksum policy.
    pub fn detect_with_policy(line: &str, policy: ChecksumPolicy) -> Self {
        let kind = FormatKind::detect(line);
        tracing::debug!("Detected record format: {kind}");
        match kind {
            FormatKind::IntelHex => Decoder::IntelHex(IntelHexDecoder::with_policy(policy)),
            FormatKind::SRecord => Decoder::SRecord(SRecordDecoder::with_policy(policy)),
            FormatKind::Unknown => Decoder::Null(NullDecoder::new()),
        }
    }
}

impl RecordDecoder for Decoder {
    fn format(&self) -> FormatKind {
        match self {
            Decoder::IntelHex(decoder) => decoder.format(),
            Decoder::SRecord(decoder) => decoder.format(),
            Decoder::Null(decoder) => decoder.format(),
        }
    }

    fn parse(&mut self, line: &str) -> Result<(), DecodeError> {
        match self {
            Decoder::IntelHex(decoder) => decoder.parse(line),
            Decoder::SRecord(decoder) => decoder.parse(line),
            Decoder::Null(decoder) => decoder.parse(line),
        }
    }

    fn image(&self) -> &MemoryImage {
        match self {
            Decoder::IntelHex(decoder) => decoder.image(),
            Decoder::SRecord(decoder) => decoder.image(),
            Decoder::Null(decoder) => decoder.image(),
        }
    }

    fn into_image(self) -> MemoryImage {
        match self {
            Decoder::IntelHex(decoder) => decoder.into_image(),
            Decoder::SRecord(decoder) => decoder.into_image(),
            Decoder::Null(decoder) => decoder.into_image(),
        }
    }
}

/// Detects the format from the first non-empty line of `text` and feeds
/// every line to the matching decoder.
///
/// Rejected lines are skipped with a warning; they never abort the pass.
/// Callers that need per-line control drive [`RecordDecoder::parse`]
/// directly instead.
pub fn decode_str(text: &str) -> Decoder {
    decode_str_with_policy(text, ChecksumPolicy::default())
}

/// Like [`decode_str`], with an explicit checksum policy.
pub fn decode_str_with_policy(text: &str, policy: ChecksumPolicy) -> Decoder {
    let sample = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");
    let mut decoder = Decoder::detect_with_policy(sample, policy);

    for (number, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        if let Err(error) = decoder.parse(line) {
            tracing::warn!("Skipping line {}: {error}", number + 1);
        }
    }
    decoder
}

fn hex_nibble(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

/// Decodes a fixed-width run of hex digits starting at character offset
/// `start`.
pub(crate) fn hex_field(
    line: &str,
    start: usize,
    digits: usize,
    field: &'static str,
) -> Result<u32, DecodeError> {
    let end = start + digits;
    let text = line.get(start..end).ok_or(DecodeError::Truncated {
        expected: end,
        actual: line.len(),
    })?;

    let mut value = 0u32;
    for digit in text.bytes() {
        let nibble = hex_nibble(digit).ok_or(DecodeError::InvalidHexDigit { field })?;
        value = (value << 4) | u32::from(nibble);
    }
    Ok(value)
}

/// Decodes `count` bytes from hex digit pairs starting at character offset
/// `start`.
pub(crate) fn hex_bytes(
    line: &str,
    start: usize,
    count: usize,
    field: &'static str,
) -> Result<Vec<u8>, DecodeError> {
    let end = start + count * 2;
    let digits = line.get(start..end).ok_or(DecodeError::Truncated {
        expected: end,
        actual: line.len(),
    })?;

    let mut bytes = Vec::with_capacity(count);
    for pair in digits.as_bytes().chunks_exact(2) {
        let high = hex_nibble(pair[0]).ok_or(DecodeError::InvalidHexDigit { field })?;
        let low = hex_nibble(pair[1]).ok_or(DecodeError::InvalidHexDigit { field })?;
        bytes.push((high << 4) | low);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{decode_str, hex_bytes, hex_field, Decoder, NullDecoder, RecordDecoder};
    use crate::error::DecodeError;
    use crate::format::FormatKind;

    #[test]
    fn factory_selects_intel_hex() {
        let decoder = Decoder::detect(":00000001FF");
        assert_eq!(decoder.format(), FormatKind::IntelHex);
    }

    #[test]
    fn factory_selects_srecord() {
        let decoder = Decoder::detect("S00600004844521B");
        assert_eq!(decoder.format(), FormatKind::SRecord);
    }

    #[test]
    fn factory_falls_back_to_null_decoder() {
        let mut decoder = Decoder::detect("GARBAGE");
        assert_eq!(decoder.format(), FormatKind::Unknown);
        assert_eq!(decoder.parse(":00000001FF"), Err(DecodeError::UnknownFormat));
        assert!(decoder.image().is_empty());
    }

    #[test]
    fn null_decoder_accepts_no_data() {
        let mut decoder = NullDecoder::new();
        assert_eq!(decoder.parse("S104000055A6"), Err(DecodeError::UnknownFormat));
        let image = decoder.into_image();
        assert!(image.is_empty());
        // The degraded image still answers checksum queries deterministically.
        assert_eq!(image.checksum(0xFF, 0, 3), 4 * 0xFF);
    }

    #[test]
    fn decode_str_skips_rejected_lines() {
        let decoder = decode_str(":0101000042BC\nnot a record\n:00000001FF\n");
        assert_eq!(decoder.image().get(0x0100), Some(0x42));
    }

    #[test]
    fn decode_str_on_unknown_input_yields_an_empty_image() {
        let decoder = decode_str("MZ\0\0");
        assert_eq!(decoder.format(), FormatKind::Unknown);
        assert!(decoder.image().is_empty());
    }

    #[test]
    fn hex_field_rejects_non_hex_digits() {
        assert_eq!(
            hex_field(":0G", 1, 2, "byte count"),
            Err(DecodeError::InvalidHexDigit {
                field: "byte count"
            })
        );
        // Sign prefixes are not digits either.
        assert_eq!(
            hex_field(":+1", 1, 2, "byte count"),
            Err(DecodeError::InvalidHexDigit {
                field: "byte count"
            })
        );
    }

    #[test]
    fn hex_field_reports_truncation() {
        assert_eq!(
            hex_field(":0", 1, 2, "byte count"),
            Err(DecodeError::Truncated {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn hex_bytes_decodes_pairs() {
        assert_eq!(
            hex_bytes("DEADbeef", 0, 4, "data"),
            Ok(vec![0xDE, 0xAD, 0xBE, 0xEF])
        );
    }
}
