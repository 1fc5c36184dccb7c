use std::io;

use thiserror::Error;

use crate::code::CodeError;
use crate::framing::FrameError;
use crate::utils::format_index_ranges;
use crate::video::VideoError;

/// Unified session error covering chunking, rendering, video I/O and reassembly.
/// - `From<T>` impls let `?` cross layer boundaries.
/// - Per-frame scan failures and checksum mismatches never reach this type;
///   they are absorbed by the decoder and the reassembler.
#[derive(Debug, Error)]
pub enum StegoError {
    /// Payload needs more chunks than the header indices (or the caller's frame budget) allow.
    #[error("payload of {payload_len} bytes needs {total_chunks} chunks of {chunk_size} bytes, limit is {limit}")]
    OversizeInput {
        payload_len: usize,
        chunk_size: usize,
        total_chunks: u64,
        limit: u64,
    },

    /// The code encoder rejected a chunk that should have fit its capacity.
    #[error("code encoder rejected chunk {sequence_index}: {source}")]
    EncodeFailure {
        sequence_index: u32,
        #[source]
        source: CodeError,
    },

    /// Reassembly could not produce the full index set.
    #[error("{}", describe_incomplete(*total_chunks, missing))]
    IncompleteRecovery {
        total_chunks: Option<u32>,
        missing: Vec<u32>,
    },

    /// The carrier video ran out of frames before every chunk was embedded.
    #[error("carrier video has {available} frames, {needed} are needed")]
    InsufficientCarrierFrames { needed: u64, available: u64 },

    /// A carrier frame is smaller than the rendered code.
    #[error("carrier frame {carrier_width}x{carrier_height} cannot hold a {code_width}x{code_height} code")]
    CarrierTooSmall {
        carrier_width: u32,
        carrier_height: u32,
        code_width: u32,
        code_height: u32,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("code error: {0}")]
    Code(#[from] CodeError),

    #[error("video error: {0}")]
    Video(#[from] VideoError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A pipeline stage hung up unexpectedly.
    #[error("pipeline error: {0}")]
    Pipeline(&'static str),
}

impl StegoError {
    /// Process exit status for this error kind. Always non-zero.
    pub fn exit_code(&self) -> i32 {
        match self {
            StegoError::OversizeInput { .. } => 3,
            StegoError::EncodeFailure { .. } => 4,
            StegoError::IncompleteRecovery { .. } => 5,
            StegoError::InsufficientCarrierFrames { .. } | StegoError::CarrierTooSmall { .. } => 6,
            StegoError::InvalidConfig(_) => 2,
            StegoError::Video(_) | StegoError::Io(_) => 7,
            StegoError::Frame(_) | StegoError::Code(_) | StegoError::Pipeline(_) => 1,
        }
    }

    /// Missing indices of an `IncompleteRecovery`, empty for every other kind.
    pub fn missing_indices(&self) -> &[u32] {
        match self {
            StegoError::IncompleteRecovery { missing, .. } => missing,
            _ => &[],
        }
    }
}

fn describe_incomplete(total_chunks: Option<u32>, missing: &[u32]) -> String {
    match total_chunks {
        None => "incomplete recovery: no valid chunk found in the video".to_string(),
        Some(total) => format!(
            "incomplete recovery: {} of {} chunks missing ({})",
            missing.len(),
            total,
            format_index_ranges(missing)
        ),
    }
}
