use std::collections::BTreeMap;

use tracing::debug;

use crate::framing::FramedChunk;
use crate::types::StegoError;

/// Reassembler verdict on one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Admission {
    Accepted,
    /// Checksum does not match header and data.
    Corrupt,
    /// Header fields contradict each other or the data length.
    OutOfBounds,
    /// An earlier valid candidate already holds this index.
    Duplicate,
    /// `total_chunks` or chunk size disagree with the session.
    Inconsistent,
}

/// Collects validated chunks by index and concatenates them once the set
/// is complete.
///
/// The first valid candidate fixes the session's `total_chunks` and chunk
/// size; for any index, the first valid candidate wins.
#[derive(Debug, Default)]
pub struct Reassembler {
    total_chunks: Option<u32>,
    chunk_size: Option<usize>,
    chunks: BTreeMap<u32, FramedChunk>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: FramedChunk) -> Admission {
        // --- checksum ---
        if let Err(e) = chunk.verify() {
            debug!("[REASSEMBLER] rejected: {e}");
            return Admission::Corrupt;
        }

        // --- bounds ---
        if let Err(e) = chunk.check_bounds() {
            debug!("[REASSEMBLER] rejected {}: {e}", chunk.header.summary());
            return Admission::OutOfBounds;
        }

        // --- duplicates ---
        let index = chunk.sequence_index();
        if self.chunks.contains_key(&index) {
            debug!("[REASSEMBLER] duplicate chunk {index}, keeping the first");
            return Admission::Duplicate;
        }

        // --- session consistency ---
        let total = chunk.total_chunks();
        let size = chunk.chunk_size();
        match (self.total_chunks, self.chunk_size) {
            (Some(t), Some(s)) if t != total || s != size => {
                debug!(
                    "[REASSEMBLER] chunk {index} claims {total} chunks of {size} bytes, session has {t} of {s}"
                );
                return Admission::Inconsistent;
            }
            (Some(_), Some(_)) => {}
            _ => {
                debug!("[REASSEMBLER] session is {total} chunks of {size} bytes");
                self.total_chunks = Some(total);
                self.chunk_size = Some(size);
            }
        }

        self.chunks.insert(index, chunk);
        Admission::Accepted
    }

    pub fn total_chunks(&self) -> Option<u32> {
        self.total_chunks
    }

    pub fn chunk_size(&self) -> Option<usize> {
        self.chunk_size
    }

    pub fn received(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_complete(&self) -> bool {
        self.total_chunks
            .is_some_and(|total| self.chunks.len() as u64 == total as u64)
    }

    /// Indices still absent, ascending. Empty while `total_chunks` is unknown.
    pub fn missing(&self) -> Vec<u32> {
        let Some(total) = self.total_chunks else {
            return Vec::new();
        };
        (0..total).filter(|i| !self.chunks.contains_key(i)).collect()
    }

    /// Concatenate the payload, or report exactly which indices are absent.
    pub fn finish(self) -> Result<Vec<u8>, StegoError> {
        if !self.is_complete() {
            return Err(StegoError::IncompleteRecovery {
                total_chunks: self.total_chunks,
                missing: self.missing(),
            });
        }

        let len = self.chunks.values().map(|c| c.payload().len()).sum();
        let mut payload = Vec::with_capacity(len);
        for chunk in self.chunks.values() {
            payload.extend_from_slice(chunk.payload());
        }
        Ok(payload)
    }
}
