//! telemetry/counters.rs
//! Mutable counters used during encode and decode sessions.
//!
//! Workers keep their own counters and the session merges them at the end,
//! so no locks or atomics are involved.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::session::Admission;

/// Deterministic counters collected during a session.
#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryCounters {
    // ---- encode ----
    pub chunks_emitted: u64,
    pub bytes_payload: u64,
    pub bytes_padding: u64,
    pub frames_written: u64,
    pub frames_passthrough: u64,

    // ---- decode ----
    pub frames_read: u64,
    pub frames_without_code: u64,
    pub candidates_malformed: u64,
    pub candidates_corrupt: u64,
    pub candidates_out_of_bounds: u64,
    pub candidates_duplicate: u64,
    pub candidates_inconsistent: u64,
    pub candidates_accepted: u64,
    pub read_errors: u64,
}

impl TelemetryCounters {
    /// Record one chunk handed to the code encoder.
    ///
    /// - `payload_len`: meaningful bytes in the chunk
    /// - `chunk_size`: padded data length
    pub fn add_chunk(&mut self, payload_len: usize, chunk_size: usize) {
        self.chunks_emitted += 1;
        self.bytes_payload += payload_len as u64;
        self.bytes_padding += chunk_size.saturating_sub(payload_len) as u64;
    }

    /// Record the Reassembler's verdict on one candidate.
    pub fn add_admission(&mut self, admission: Admission) {
        match admission {
            Admission::Accepted => self.candidates_accepted += 1,
            Admission::Corrupt => self.candidates_corrupt += 1,
            Admission::OutOfBounds => self.candidates_out_of_bounds += 1,
            Admission::Duplicate => self.candidates_duplicate += 1,
            Admission::Inconsistent => self.candidates_inconsistent += 1,
        }
    }

    /// Every candidate that reached the Reassembler, whatever its fate.
    pub fn candidates_total(&self) -> u64 {
        self.candidates_accepted
            + self.candidates_corrupt
            + self.candidates_out_of_bounds
            + self.candidates_duplicate
            + self.candidates_inconsistent
    }

    pub fn merge(&mut self, other: &TelemetryCounters) {
        *self += other.clone();
    }
}

impl AddAssign for TelemetryCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.chunks_emitted           += rhs.chunks_emitted;
        self.bytes_payload            += rhs.bytes_payload;
        self.bytes_padding            += rhs.bytes_padding;
        self.frames_written           += rhs.frames_written;
        self.frames_passthrough       += rhs.frames_passthrough;

        self.frames_read              += rhs.frames_read;
        self.frames_without_code      += rhs.frames_without_code;
        self.candidates_malformed     += rhs.candidates_malformed;
        self.candidates_corrupt       += rhs.candidates_corrupt;
        self.candidates_out_of_bounds += rhs.candidates_out_of_bounds;
        self.candidates_duplicate     += rhs.candidates_duplicate;
        self.candidates_inconsistent  += rhs.candidates_inconsistent;
        self.candidates_accepted      += rhs.candidates_accepted;
        self.read_errors              += rhs.read_errors;
    }
}
