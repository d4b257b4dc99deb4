//! Range checksums over the decoded image.

use crate::image::{MemoryImage, BLOCK_SIZE};

impl MemoryImage {
    /// Sums every address in `[start, end]` inclusive, substituting `blank`
    /// for addresses that were never written.
    ///
    /// The running sum is a plain `u64` and is intentionally not truncated;
    /// callers that need an 8-bit or 16-bit checksum reduce the result
    /// themselves, which keeps the primitive composable across differing
    /// hardware checksum conventions.
    ///
    /// The walk is read-only: looking up an unwritten address never creates
    /// a block. An inverted range (`start > end`) sums nothing.
    pub fn checksum(&self, blank: u8, start: u64, end: u64) -> u64 {
        if start > end {
            return 0;
        }

        let mut index = start / BLOCK_SIZE as u64;
        let mut offset = (start % BLOCK_SIZE as u64) as usize;
        let mut block = self.block(index);

        let mut sum = 0u64;
        let mut address = start;
        loop {
            let byte = block.and_then(|block| block.get(offset)).unwrap_or(blank);
            sum += u64::from(byte);

            if address == end {
                break;
            }
            address += 1;
            offset += 1;
            if offset == BLOCK_SIZE {
                offset = 0;
                index += 1;
                block = self.block(index);
            }
        }
        sum
    }
}
