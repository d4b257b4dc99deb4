//! Motorola S-record decoding.

use crate::decoder::{hex_bytes, hex_field, ChecksumPolicy, RecordDecoder};
use crate::error::DecodeError;
use crate::format::FormatKind;
use crate::image::MemoryImage;

// Fixed character offsets within a record line.
const RECORD_TYPE: usize = 1;
const BYTE_COUNT: usize = 2;
const ADDRESS: usize = 4;

// S0 header field widths in bytes.
const NAME_SIZE: usize = 8;
const EXTENSION_SIZE: usize = 3;

/// Module name and extension latched from an `S0` header record.
///
/// Informational only; an `S0` record never writes memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHeader {
    /// Module name field, up to eight characters, trailing padding removed.
    pub name: String,
    /// Version/extension field, up to three characters, trailing padding
    /// removed.
    pub extension: String,
}

/// Decoder for `S`-prefixed Motorola S-records.
///
/// Unlike Intel HEX there is no persistent offset state: every data record
/// (`S1`/`S2`/`S3`) carries an absolute load address, two to four bytes
/// wide depending on the record type.
#[derive(Debug, Default)]
pub struct SRecordDecoder {
    image: MemoryImage,
    policy: ChecksumPolicy,
    header: Option<ModuleHeader>,
}

impl SRecordDecoder {
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

    /// The module header latched from an `S0` record, if one was decoded.
    pub fn header(&self) -> Option<&ModuleHeader> {
        self.header.as_ref()
    }

    /// Verifies the one's complement checksum over the byte count field and
    /// the `byte_count - 1` payload bytes that follow it.
    fn verify_checksum(&self, line: &str, byte_count: u8) -> Result<(), DecodeError> {
        let summed = hex_bytes(line, BYTE_COUNT, byte_count as usize, "record")?;
        let stored = hex_field(line, ADDRESS + (byte_count as usize - 1) * 2, 2, "checksum")? as u8;

        let mut sum = 0u8;
        for &byte in &summed {
            sum = sum.wrapping_add(byte);
        }
        let computed = !sum;

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

    fn parse_header_record(&mut self, line: &str, byte_count: u8) -> Result<(), DecodeError> {
        // Address field (two bytes, conventionally zero) plus the trailing
        // checksum byte.
        let payload_len = (byte_count as usize)
            .checked_sub(3)
            .ok_or(DecodeError::ByteCountTooSmall {
                byte_count,
                overhead: 3,
            })?;

        self.verify_checksum(line, byte_count)?;

        let payload = hex_bytes(line, ADDRESS + 4, payload_len, "header")?;
        let name = &payload[..payload.len().min(NAME_SIZE)];
        let extension = payload.get(NAME_SIZE..).unwrap_or(&[]);
        let extension = &extension[..extension.len().min(EXTENSION_SIZE)];

        self.header = Some(ModuleHeader {
            name: header_field(name),
            extension: header_field(extension),
        });
        Ok(())
    }

    fn parse_data_record(
        &mut self,
        line: &str,
        byte_count: u8,
        address_size: usize,
    ) -> Result<(), DecodeError> {
        let overhead = address_size + 1;
        let data_len = (byte_count as usize)
            .checked_sub(overhead)
            .ok_or(DecodeError::ByteCountTooSmall {
                byte_count,
                overhead: overhead as u8,
            })?;

        self.verify_checksum(line, byte_count)?;

        let address = u64::from(hex_field(line, ADDRESS, address_size * 2, "address")?);
        let data = hex_bytes(line, ADDRESS + address_size * 2, data_len, "data")?;
        self.image.add_data(address, &data);
        Ok(())
    }
}

/// Renders an S0 header field, dropping trailing NUL and space padding.
fn header_field(bytes: &[u8]) -> String {
    let text: String = bytes.iter().map(|&byte| char::from(byte)).collect();
    text.trim_end_matches(['\0', ' ']).to_string()
}

impl RecordDecoder for SRecordDecoder {
    fn format(&self) -> FormatKind {
        FormatKind::SRecord
    }

    fn parse(&mut self, line: &str) -> Result<(), DecodeError> {
        let line = line.trim_end();
        if !line.starts_with('S') {
            return Err(DecodeError::MissingMarker { expected: 'S' });
        }

        let record_type = hex_field(line, RECORD_TYPE, 1, "record type")? as u8;
        let byte_count = hex_field(line, BYTE_COUNT, 2, "byte count")? as u8;

        match record_type {
            // Header record: metadata only.
            0 => self.parse_header_record(line, byte_count),
            // Data records with 2, 3 and 4 byte load addresses.
            1 => self.parse_data_record(line, byte_count, 2),
            2 => self.parse_data_record(line, byte_count, 3),
            3 => self.parse_data_record(line, byte_count, 4),
            // Reserved and terminator records carry nothing this engine
            // needs.
            4..=9 => Ok(()),
            other => Err(DecodeError::UnsupportedRecordType(other)),
        }
    }

    fn image(&self) -> &MemoryImage {
        &self.image
    }

    fn into_image(self) -> MemoryImage {
        self.image
    }
}
