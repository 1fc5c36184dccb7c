//! Stable public API: one call per direction.

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::code::{CodeEncoder, CodeScanner};
use crate::constants::MAX_TOTAL_CHUNKS;
use crate::framing::ChunkHeader;
use crate::session::chunker::Chunker;
use crate::session::config::SessionConfig;
use crate::session::decoder::{scan_parallel, CandidateStream};
use crate::session::encoder::encode_frames;
use crate::session::reassembler::{Admission, Reassembler};
use crate::session::FrameStats;
use crate::telemetry::{Stage, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
use crate::types::StegoError;
use crate::video::{FrameSink, FrameSource};

/// Finished encode: whatever the sink produced, plus telemetry.
#[derive(Debug, Clone)]
pub struct EncodeOutcome<T> {
    pub output: T,
    pub snapshot: TelemetrySnapshot,
}

/// Finished decode: the reconstructed payload, plus telemetry.
#[derive(Debug, Clone)]
pub struct DecodeOutcome {
    pub payload: Vec<u8>,
    pub snapshot: TelemetrySnapshot,
}

/// Largest chunk size whose framed form fits one code of `encoder`.
pub fn max_chunk_size<E: CodeEncoder + ?Sized>(encoder: &E) -> usize {
    encoder.capacity().saturating_sub(ChunkHeader::LEN)
}

/// Encode `payload` into code frames appended to `sink`.
///
/// Size limits are checked before anything is rendered. On any error the
/// sink is dropped unfinished, so no partial output survives.
pub fn encode_payload<E, K>(
    payload: &[u8],
    encoder: &E,
    mut sink: K,
    carrier: Option<&mut dyn FrameSource>,
    config: &SessionConfig,
) -> Result<EncodeOutcome<K::Output>, StegoError>
where
    E: CodeEncoder + ?Sized,
    K: FrameSink,
{
    config.validate()?;
    let mut timer = TelemetryTimer::new();

    let chunk_size = config.resolve_chunk_size(encoder.capacity())?;
    let limit = config
        .max_frames
        .map(u64::from)
        .unwrap_or(MAX_TOTAL_CHUNKS);
    let chunker = Chunker::with_limit(payload, chunk_size, limit)?;
    let total_chunks = chunker.total_chunks();

    progress!(
        config,
        "[ENCODER] {} bytes -> {} frames (chunk size {})",
        payload.len(),
        total_chunks,
        chunk_size
    );

    let stats = encode_frames(chunker, encoder, &mut sink, carrier, config)?;

    let t = Instant::now();
    let output = sink.finish()?;
    timer.add_stage_time(Stage::Write, t.elapsed());

    timer.stage_times.merge(&stats.stage_times);
    timer.finish();
    let snapshot = TelemetrySnapshot::from(&stats.counters, &timer, Some(total_chunks));

    info!(
        "[ENCODER] done: {} frames written ({} carrier passthrough) in {:?}",
        snapshot.counters.frames_written, snapshot.counters.frames_passthrough, snapshot.elapsed
    );
    Ok(EncodeOutcome { output, snapshot })
}

/// Recover a payload from every frame of `source`.
///
/// The whole source is scanned, then the payload is produced only if every
/// index is present; otherwise the error lists the missing indices.
pub fn decode_payload<S, C>(
    source: S,
    scanner: &C,
    config: &SessionConfig,
) -> Result<DecodeOutcome, StegoError>
where
    S: FrameSource,
    C: CodeScanner + ?Sized,
{
    config.validate()?;
    let mut timer = TelemetryTimer::new();
    let mut reassembler = Reassembler::new();
    let mut counters = TelemetryCounters::default();

    let stats = if config.profile.is_parallel() {
        let mut admissions = TelemetryCounters::default();
        let mut reassemble_time = Duration::ZERO;
        let mut stats = scan_parallel(source, scanner, &config.profile, |candidate| {
            let t = Instant::now();
            let index = candidate.chunk.sequence_index();
            let admission = reassembler.push(candidate.chunk);
            reassemble_time += t.elapsed();
            admissions.add_admission(admission);
            if admission == Admission::Accepted {
                progress!(config, "[DECODER] frame {}: chunk {} accepted", candidate.frame_index, index);
            }
        })?;
        stats.counters.merge(&admissions);
        stats.stage_times.add(Stage::Reassemble, reassemble_time);
        stats
    } else {
        let mut stream = CandidateStream::new(source, scanner);
        let mut reassemble_time = Duration::ZERO;
        for candidate in stream.by_ref() {
            let t = Instant::now();
            let index = candidate.chunk.sequence_index();
            let admission = reassembler.push(candidate.chunk);
            reassemble_time += t.elapsed();
            counters.add_admission(admission);
            if admission == Admission::Accepted {
                progress!(config, "[DECODER] frame {}: chunk {} accepted", candidate.frame_index, index);
            }
        }
        let mut stats: FrameStats = stream.into_stats();
        stats.stage_times.add(Stage::Reassemble, reassemble_time);
        stats
    };
    counters.merge(&stats.counters);

    let total_chunks = reassembler.total_chunks();
    timer.stage_times.merge(&stats.stage_times);

    let payload = match reassembler.finish() {
        Ok(payload) => payload,
        Err(e) => {
            warn!(
                "[DECODER] {} frames read, {} chunks accepted: {}",
                counters.frames_read, counters.candidates_accepted, e
            );
            return Err(e);
        }
    };

    // decode throughput is measured on recovered bytes
    counters.bytes_payload = payload.len() as u64;
    timer.finish();
    let snapshot = TelemetrySnapshot::from(&counters, &timer, total_chunks);

    info!(
        "[DECODER] done: {} bytes from {} frames ({} candidates, {} accepted) in {:?}",
        payload.len(),
        counters.frames_read,
        counters.candidates_total(),
        counters.candidates_accepted,
        snapshot.elapsed
    );
    Ok(DecodeOutcome { payload, snapshot })
}
