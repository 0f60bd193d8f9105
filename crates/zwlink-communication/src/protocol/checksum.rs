//! Link checksum

use zwlink_core::constants::CHECKSUM_SEED;

/// XOR-fold `bytes` into the seed 0xFF.
///
/// Outbound, this is computed over LEN, KIND and the payload and appended.
/// Inbound, folding LEN through the trailing checksum byte yields zero for
/// an intact frame.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(CHECKSUM_SEED, |acc, b| acc ^ b)
}
