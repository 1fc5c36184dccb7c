use bytes::Bytes;
use tracing::debug;

use crate::constants::MAX_TOTAL_CHUNKS;
use crate::framing::FramedChunk;
use crate::types::StegoError;
use crate::utils::chunk_count;

/// Number of chunks for a payload, without touching its bytes.
///
/// An empty payload still yields one chunk so the decoder has something to
/// find.
pub fn plan_chunks(payload_len: usize, chunk_size: usize) -> Result<u32, StegoError> {
    plan_with_limit(payload_len, chunk_size, MAX_TOTAL_CHUNKS)
}

fn plan_with_limit(payload_len: usize, chunk_size: usize, limit: u64) -> Result<u32, StegoError> {
    if chunk_size == 0 {
        return Err(StegoError::InvalidConfig("chunk size must be at least 1".into()));
    }
    if chunk_size as u64 > u32::MAX as u64 {
        return Err(StegoError::InvalidConfig(format!(
            "chunk size {chunk_size} does not fit the u32 payload length field"
        )));
    }

    let limit = limit.min(MAX_TOTAL_CHUNKS);
    let total_chunks = chunk_count(payload_len, chunk_size);
    if total_chunks > limit {
        return Err(StegoError::OversizeInput {
            payload_len,
            chunk_size,
            total_chunks,
            limit,
        });
    }
    Ok(total_chunks as u32)
}

/// Lazily splits a payload into sealed, padded chunks, in index order.
#[derive(Debug, Clone)]
pub struct Chunker<'a> {
    payload: &'a [u8],
    chunk_size: usize,
    total_chunks: u32,
    next: u32,
}

impl<'a> Chunker<'a> {
    pub fn new(payload: &'a [u8], chunk_size: usize) -> Result<Self, StegoError> {
        Self::with_limit(payload, chunk_size, MAX_TOTAL_CHUNKS)
    }

    /// Like [`Chunker::new`] with a caller budget of `max_chunks` frames.
    pub fn with_limit(payload: &'a [u8], chunk_size: usize, max_chunks: u64) -> Result<Self, StegoError> {
        let total_chunks = plan_with_limit(payload.len(), chunk_size, max_chunks)?;
        debug!(
            "[CHUNKER] {} bytes -> {} chunks of {} bytes",
            payload.len(),
            total_chunks,
            chunk_size
        );
        Ok(Self {
            payload,
            chunk_size,
            total_chunks,
            next: 0,
        })
    }

    pub fn total_chunks(&self) -> u32 {
        self.total_chunks
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    fn chunk_at(&self, index: u32) -> FramedChunk {
        let start = (index as usize * self.chunk_size).min(self.payload.len());
        let end = (start + self.chunk_size).min(self.payload.len());
        let slice = &self.payload[start..end];

        let data = if slice.len() == self.chunk_size {
            Bytes::copy_from_slice(slice)
        } else {
            // short tail: zero padding up to the fixed chunk size
            let mut padded = vec![0u8; self.chunk_size];
            padded[..slice.len()].copy_from_slice(slice);
            Bytes::from(padded)
        };

        FramedChunk::seal(index, self.total_chunks, slice.len() as u32, data)
    }
}

impl Iterator for Chunker<'_> {
    type Item = FramedChunk;

    fn next(&mut self) -> Option<FramedChunk> {
        if self.next >= self.total_chunks {
            return None;
        }
        let chunk = self.chunk_at(self.next);
        self.next += 1;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.total_chunks - self.next) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Chunker<'_> {}
