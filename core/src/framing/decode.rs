use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

use crate::constants::CHECKSUM_LEN;
use crate::framing::types::{ChunkHeader, FrameError, FramedChunk};

#[inline]
pub fn parse_chunk_header(wire: &[u8]) -> Result<ChunkHeader, FrameError> {
    if wire.len() < ChunkHeader::LEN {
        return Err(FrameError::Truncated { actual: wire.len() });
    }

    // --- fixed offsets ---
    let mut off = 0;

    let sequence_index = LittleEndian::read_u32(&wire[off..off + 4]);
    off += 4;

    let total_chunks = LittleEndian::read_u32(&wire[off..off + 4]);
    off += 4;

    let payload_length = LittleEndian::read_u32(&wire[off..off + 4]);
    off += 4;

    let mut checksum = [0u8; CHECKSUM_LEN];
    checksum.copy_from_slice(&wire[off..off + CHECKSUM_LEN]);

    Ok(ChunkHeader {
        sequence_index,
        total_chunks,
        payload_length,
        checksum,
    })
}

/// Decode a single framed chunk from scanned bytes.
///
/// Structural parse only: the checksum and header bounds are left to the
/// reassembler so corrupted candidates are counted rather than lost here.
pub fn decode_chunk(wire: &[u8]) -> Result<FramedChunk, FrameError> {
    let header = parse_chunk_header(wire)?;

    let data = &wire[ChunkHeader::LEN..];
    if data.is_empty() {
        return Err(FrameError::EmptyChunk);
    }

    Ok(FramedChunk {
        header,
        data: Bytes::copy_from_slice(data),
    })
}

/// Like [`decode_chunk`], but the wire must carry exactly `chunk_size` data bytes.
pub fn decode_chunk_exact(wire: &[u8], chunk_size: usize) -> Result<FramedChunk, FrameError> {
    let expected = ChunkHeader::LEN + chunk_size;
    if wire.len() != expected {
        return Err(FrameError::LengthMismatch {
            expected,
            actual: wire.len(),
        });
    }
    decode_chunk(wire)
}
