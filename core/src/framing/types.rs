use std::fmt;
use bytes::Bytes;

use crate::constants::CHECKSUM_LEN;
use crate::utils::compute_checksum;

/// Canonical chunk header (fixed size)
///
/// All integer fields are little-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// 0-based position of this chunk in the payload.
    pub sequence_index: u32,
    /// Number of chunks in the session; identical on every chunk.
    pub total_chunks: u32,
    /// Meaningful bytes before padding (equals the chunk size except on the last chunk).
    pub payload_length: u32,
    /// Truncated BLAKE3 over the three fields above and the padded data.
    pub checksum: [u8; CHECKSUM_LEN],
}

impl ChunkHeader {
    pub const LEN: usize = 4      // sequence_index
        + 4                      // total_chunks
        + 4                      // payload_length
        + CHECKSUM_LEN;          // checksum

    /// Produce a concise debug summary of the chunk header
    pub fn summary(&self) -> String {
        format!(
            "ChunkHeader {{ index: {}, total: {}, payload_length: {}, checksum: {} }}",
            self.sequence_index,
            self.total_chunks,
            self.payload_length,
            hex::encode(self.checksum),
        )
    }
}

/// A chunk plus its header, as rendered into (or scanned from) one code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedChunk {
    pub header: ChunkHeader,
    /// Padded chunk bytes; every chunk of a session has the same length.
    pub data: Bytes,
}

impl FramedChunk {
    /// Build a chunk and freeze its checksum.
    ///
    /// Callers must NOT mutate fields afterward; `verify` will reject the result.
    pub fn seal(
        sequence_index: u32,
        total_chunks: u32,
        payload_length: u32,
        data: Bytes,
    ) -> Self {
        let checksum = compute_checksum(sequence_index, total_chunks, payload_length, &data);
        Self {
            header: ChunkHeader {
                sequence_index,
                total_chunks,
                payload_length,
                checksum,
            },
            data,
        }
    }

    #[inline]
    pub fn sequence_index(&self) -> u32 {
        self.header.sequence_index
    }

    #[inline]
    pub fn total_chunks(&self) -> u32 {
        self.header.total_chunks
    }

    /// Padded data length, i.e. the session's chunk size.
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_last(&self) -> bool {
        self.header.total_chunks > 0 && self.header.sequence_index == self.header.total_chunks - 1
    }

    /// Encoded size on the wire.
    #[inline]
    pub fn wire_len(&self) -> usize {
        ChunkHeader::LEN + self.data.len()
    }

    /// Recompute the checksum over header fields and data.
    pub fn verify(&self) -> Result<(), FrameError> {
        let expected = compute_checksum(
            self.header.sequence_index,
            self.header.total_chunks,
            self.header.payload_length,
            &self.data,
        );
        if expected != self.header.checksum {
            return Err(FrameError::ChecksumMismatch {
                sequence_index: self.header.sequence_index,
            });
        }
        Ok(())
    }

    /// Validate header values against each other and the data length.
    pub fn check_bounds(&self) -> Result<(), FrameError> {
        let h = &self.header;
        if h.total_chunks == 0 {
            return Err(FrameError::ZeroTotal);
        }
        if h.sequence_index >= h.total_chunks {
            return Err(FrameError::IndexOutOfRange {
                sequence_index: h.sequence_index,
                total_chunks: h.total_chunks,
            });
        }
        let payload_length = h.payload_length as usize;
        if payload_length > self.data.len() {
            return Err(FrameError::PayloadLengthOutOfBounds {
                payload_length: h.payload_length,
                chunk_size: self.data.len(),
            });
        }
        // only the last chunk may be short
        if !self.is_last() && payload_length != self.data.len() {
            return Err(FrameError::PayloadLengthOutOfBounds {
                payload_length: h.payload_length,
                chunk_size: self.data.len(),
            });
        }
        Ok(())
    }

    /// Meaningful bytes of this chunk, padding stripped.
    ///
    /// Clamped to the data length so an unchecked header can never read past it.
    pub fn payload(&self) -> &[u8] {
        let len = (self.header.payload_length as usize).min(self.data.len());
        &self.data[..len]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    Truncated { actual: usize },
    LengthMismatch {
        expected: usize,
        actual: usize,
    },
    EmptyChunk,
    ZeroTotal,
    IndexOutOfRange {
        sequence_index: u32,
        total_chunks: u32,
    },
    PayloadLengthOutOfBounds {
        payload_length: u32,
        chunk_size: usize,
    },
    ChecksumMismatch { sequence_index: u32 },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use FrameError::*;
        match self {
            Truncated { actual } =>
                write!(f, "truncated chunk: {} bytes, header needs {}", actual, ChunkHeader::LEN),
            LengthMismatch { expected, actual } =>
                write!(f, "length mismatch: expected {}, got {}", expected, actual),
            EmptyChunk =>
                write!(f, "chunk carries no data bytes"),
            ZeroTotal =>
                write!(f, "total_chunks is zero"),
            IndexOutOfRange { sequence_index, total_chunks } =>
                write!(f, "sequence index {} out of range for {} chunks", sequence_index, total_chunks),
            PayloadLengthOutOfBounds { payload_length, chunk_size } =>
                write!(f, "payload length {} invalid for chunk size {}", payload_length, chunk_size),
            ChecksumMismatch { sequence_index } =>
                write!(f, "checksum mismatch on chunk {}", sequence_index),
        }
    }
}

impl std::error::Error for FrameError {}
