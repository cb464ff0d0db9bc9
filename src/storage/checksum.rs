//! CRC32 (IEEE) over slot file frames
//!
//! A frame's checksum covers its length prefix and body. Every read
//! recomputes it; a mismatch is corruption.

use crc32fast::Hasher;

pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}
