use thiserror::Error;

/// A finite list of all the reasons a single record line can be rejected.
///
/// Every variant is local to the offending line: rejecting a record never
/// invalidates the decoder or the bytes already merged into its image, and
/// the caller decides whether to skip the line or abort the whole file.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The line does not begin with the start marker of the active format.
    #[error("record does not begin with the {expected:?} marker")]
    MissingMarker {
        /// The marker character the format expects in column zero.
        expected: char,
    },

    /// The line is shorter than its declared fixed-offset layout.
    #[error("record is truncated: {actual} characters where at least {expected} are required")]
    Truncated {
        /// Number of characters the declared layout requires.
        expected: usize,
        /// Number of characters actually present.
        actual: usize,
    },

    /// A field contains characters that are not hexadecimal digits.
    #[error("invalid hex digits in the {field} field")]
    InvalidHexDigit {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The record type index is outside the format's dispatch table.
    #[error("record type {0:#04X} is not supported")]
    UnsupportedRecordType(u8),

    /// The record declared fewer bytes than its fixed fields occupy,
    /// leaving no valid data length.
    #[error("declared byte count {byte_count} leaves no room for the record's {overhead} fixed bytes")]
    ByteCountTooSmall {
        /// The byte count field as declared by the record.
        byte_count: u8,
        /// Bytes the record type requires regardless of payload, e.g. the
        /// address field and trailing checksum of an S-record.
        overhead: u8,
    },

    /// The embedded record checksum disagrees with the recomputed value.
    ///
    /// Only surfaced as an error under [`ChecksumPolicy::Strict`];
    /// the lenient policy logs the mismatch and keeps the data.
    ///
    /// [`ChecksumPolicy::Strict`]: crate::ChecksumPolicy::Strict
    #[error("embedded checksum {stored:#04X} does not match computed {computed:#04X}")]
    ChecksumMismatch {
        /// The checksum byte carried by the record.
        stored: u8,
        /// The checksum recomputed over the record's fields.
        computed: u8,
    },

    /// No supported record format recognizes this line.
    ///
    /// This is what the null decoder returns for every line it is fed.
    #[error("line does not match any supported record format")]
    UnknownFormat,
}
