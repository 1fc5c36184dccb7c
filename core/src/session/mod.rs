//! Encode and decode sessions.
//!
//! Responsibilities:
//! - Split payloads into sealed chunks (`chunker`)
//! - Drive chunks through a code encoder into a frame sink (`encoder`)
//! - Scan frames back into candidate chunks (`decoder`)
//! - Validate, deduplicate and order candidates (`reassembler`)
//! - Public entry points tying them together (`core`)
//!
//! Non-responsibilities:
//! - Code geometry
//! - Container formats

/// Per-frame progress: `info` for verbose sessions, `debug` otherwise.
macro_rules! progress {
    ($cfg:expr, $($arg:tt)*) => {
        if $cfg.verbose {
            tracing::info!($($arg)*);
        } else {
            tracing::debug!($($arg)*);
        }
    };
}

pub mod config;
pub mod parallelism;
pub mod ordered;
pub mod chunker;
pub mod encoder;
pub mod decoder;
pub mod reassembler;
pub mod core;

pub use config::SessionConfig;
pub use parallelism::ParallelismProfile;
pub use ordered::Reorder;
pub use chunker::{plan_chunks, Chunker};
pub use encoder::encode_frames;
pub use decoder::{scan_frame, scan_parallel, Candidate, CandidateStream, ScanOutcome};
pub use reassembler::{Admission, Reassembler};
pub use self::core::{decode_payload, encode_payload, max_chunk_size, DecodeOutcome, EncodeOutcome};

use crate::telemetry::{StageTimes, TelemetryCounters};

/// Counters and stage times gathered by one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    pub counters: TelemetryCounters,
    pub stage_times: StageTimes,
}

impl FrameStats {
    pub fn merge(&mut self, other: &FrameStats) {
        self.counters.merge(&other.counters);
        self.stage_times.merge(&other.stage_times);
    }
}
