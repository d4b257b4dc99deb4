//! Firmware text-image decoding and range checksums
//!
//! This crate parses [Intel HEX](https://en.wikipedia.org/wiki/Intel_HEX)
//! and [Motorola S-record](https://en.wikipedia.org/wiki/SREC_(file_format))
//! build artifacts into a sparse, addressable [`MemoryImage`] and computes
//! an integer checksum over an arbitrary address range, substituting a
//! caller-supplied blank value for addresses never written.
//!
//! The crate never touches the filesystem: the caller owns reading the
//! `.hex`/`.mot` artifact and feeds its lines, in file order, to a decoder
//! selected from the first line.
//!
//! ## Examples
//!
//! ```
//! use hex_image::{Decoder, RecordDecoder};
//!
//! let lines = [":0B0010006164647265737320676170A7", ":00000001FF"];
//!
//! let mut decoder = Decoder::detect(lines[0]);
//! for line in lines {
//!     decoder.parse(line)?;
//! }
//!
//! let image = decoder.image();
//! assert_eq!(image.get(0x0010), Some(b'a'));
//!
//! // Sum the decoded range; unwritten addresses count as the blank value.
//! assert_eq!(image.checksum(0xFF, 0x0010, 0x001A), 1086);
//! # Ok::<(), hex_image::DecodeError>(())
//! ```
//!
//! Unrecognized input degrades to a null decoder rather than an error, so a
//! checksum query still returns a deterministic, all-blank result:
//!
//! ```
//! use hex_image::{decode_str, FormatKind, RecordDecoder};
//!
//! let decoder = decode_str("not a firmware image");
//! assert_eq!(decoder.format(), FormatKind::Unknown);
//! assert_eq!(decoder.image().checksum(0xFF, 0, 15), 16 * 0xFF);
//! ```
#![warn(missing_docs)]

mod checksum;
mod decoder;
mod error;
mod format;
mod ihex;
mod image;
mod srecord;

pub use decoder::{
    decode_str, decode_str_with_policy, ChecksumPolicy, Decoder, NullDecoder, RecordDecoder,
};
pub use error::DecodeError;
pub use format::FormatKind;
pub use ihex::{IntelHexDecoder, StartSegment};
pub use image::{MemoryBlock, MemoryImage, BLOCK_SIZE};
pub use srecord::{ModuleHeader, SRecordDecoder};
