//! Record format identification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A finite list of all the text image formats this crate understands.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub enum FormatKind {
    /// [Intel HEX](https://en.wikipedia.org/wiki/Intel_HEX): records begin
    /// with `:` and carry byte count, address, record type, data and
    /// checksum at fixed character offsets.
    IntelHex,
    /// [Motorola S-record](https://en.wikipedia.org/wiki/SREC_(file_format)):
    /// records begin with `S` and a type digit, with a type-dependent
    /// address field width.
    SRecord,
    /// No supported format recognizes the input. Decoding with this kind
    /// yields a valid but empty image.
    #[default]
    Unknown,
}

impl FormatKind {
    /// Classifies one sample line, conventionally the first line of a file.
    ///
    /// The check is structural only: the leading marker plus, for Intel HEX,
    /// a plausible minimum record width. Record checksums are not validated
    /// here. Classification is mutually exclusive: a line can never match
    /// both formats.
    pub fn detect(line: &str) -> Self {
        let bytes = line.trim_end().as_bytes();
        match bytes.first() {
            // Shortest Intel HEX record: marker, byte count, address,
            // record type and checksum.
            Some(b':') if bytes.len() >= 11 && bytes[1..9].iter().all(u8::is_ascii_hexdigit) => {
                FormatKind::IntelHex
            }
            Some(b'S') if bytes.len() >= 2 && bytes[1].is_ascii_digit() => FormatKind::SRecord,
            _ => FormatKind::Unknown,
        }
    }
}

impl FromStr for FormatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match &s.to_lowercase()[..] {
            "hex" | "ihex" | "intelhex" => Ok(Self::IntelHex),
            "mot" | "srec" | "srecord" | "s19" | "s28" | "s37" => Ok(Self::SRecord),
            other => Err(format!("Format '{other}' is unknown.")),
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatKind::IntelHex => f.write_str("hex"),
            FormatKind::SRecord => f.write_str("mot"),
            FormatKind::Unknown => f.write_str("none"),
        }
    }
}
