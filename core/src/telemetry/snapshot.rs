//! telemetry/snapshot.rs
//! Immutable end-of-session view over counters and timers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::telemetry::counters::TelemetryCounters;
use crate::telemetry::timers::{Stage, StageTimes, TelemetryTimer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub counters: TelemetryCounters,
    /// Chunk count of the session, once known.
    pub total_chunks: Option<u32>,
    /// Padding bytes over total chunk bytes.
    pub padding_ratio: f64,
    pub throughput_payload_bytes_per_sec: f64,
    pub elapsed: Duration,
    pub stage_times: StageTimes,
}

impl TelemetrySnapshot {
    pub fn from(counters: &TelemetryCounters, timer: &TelemetryTimer, total_chunks: Option<u32>) -> Self {
        let elapsed = timer.elapsed();

        let chunk_bytes = counters.bytes_payload + counters.bytes_padding;
        let padding_ratio = if chunk_bytes > 0 {
            counters.bytes_padding as f64 / chunk_bytes as f64
        } else {
            0.0
        };

        let throughput = if elapsed.as_secs_f64() > 0.0 {
            counters.bytes_payload as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        Self {
            counters: counters.clone(),
            total_chunks,
            padding_ratio,
            throughput_payload_bytes_per_sec: throughput,
            elapsed,
            stage_times: timer.stage_times.clone(),
        }
    }

    pub fn total_stage_time(&self) -> Duration {
        self.stage_times.total()
    }

    pub fn has_all_stages(&self, expected: &[Stage]) -> bool {
        self.stage_times.has_all(expected)
    }

    /// Internal consistency of the recorded counters.
    pub fn sanity_check(&self) -> bool {
        let c = &self.counters;
        (0.0..=1.0).contains(&self.padding_ratio)
            && c.candidates_total() + c.candidates_malformed + c.frames_without_code <= c.frames_read
            && c.frames_passthrough <= c.frames_written
    }
}
