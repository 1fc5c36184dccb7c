use std::fmt::Write as _;

use crate::constants::CHECKSUM_LEN;

/// Checksum over `sequence_index || total_chunks || payload_length || data`.
///
/// Integers are hashed little-endian, matching their wire encoding. The
/// BLAKE3 output is truncated to [`CHECKSUM_LEN`] bytes.
pub fn compute_checksum(
    sequence_index: u32,
    total_chunks: u32,
    payload_length: u32,
    data: &[u8],
) -> [u8; CHECKSUM_LEN] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&sequence_index.to_le_bytes());
    hasher.update(&total_chunks.to_le_bytes());
    hasher.update(&payload_length.to_le_bytes());
    hasher.update(data);

    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&hasher.finalize().as_bytes()[..CHECKSUM_LEN]);
    out
}

/// Render sorted indices as compact ranges: `[0, 1, 2, 5, 7, 8]` -> `"0-2, 5, 7-8"`.
pub fn format_index_ranges(indices: &[u32]) -> String {
    let mut out = String::new();
    let mut iter = indices.iter().copied().peekable();

    while let Some(start) = iter.next() {
        let mut end = start;
        while let Some(&next) = iter.peek() {
            if next != end.wrapping_add(1) {
                break;
            }
            end = next;
            iter.next();
        }

        if !out.is_empty() {
            out.push_str(", ");
        }
        if start == end {
            let _ = write!(out, "{start}");
        } else {
            let _ = write!(out, "{start}-{end}");
        }
    }
    out
}

/// Integer ceiling division with the protocol's floor of one chunk.
#[inline]
pub fn chunk_count(payload_len: usize, chunk_size: usize) -> u64 {
    (payload_len as u64).div_ceil(chunk_size as u64).max(1)
}
