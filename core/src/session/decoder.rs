//! Frame Decoder: frames in, candidate chunks out.
//!
//! Frames without a readable code and codes that do not parse as a framed
//! chunk are skipped here; checksum and header validation belong to the
//! Reassembler.

use std::thread;
use std::time::Instant;

use crossbeam::channel::bounded;
use tracing::{debug, warn};

use crate::code::CodeScanner;
use crate::framing::{decode_chunk, FramedChunk};
use crate::session::ordered::Reorder;
use crate::session::parallelism::ParallelismProfile;
use crate::session::FrameStats;
use crate::telemetry::Stage;
use crate::types::StegoError;
use crate::video::{Frame, FrameSource};

/// A chunk recovered from a frame, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub frame_index: u64,
    pub chunk: FramedChunk,
}

/// What a single frame yielded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    NoCode,
    Malformed,
    Chunk(FramedChunk),
}

/// Scan one frame and parse whatever code it carries.
pub fn scan_frame<C: CodeScanner + ?Sized>(scanner: &C, frame: &Frame) -> ScanOutcome {
    let Some(bytes) = scanner.scan(frame) else {
        return ScanOutcome::NoCode;
    };
    match decode_chunk(&bytes) {
        Ok(chunk) => ScanOutcome::Chunk(chunk),
        Err(_) => ScanOutcome::Malformed,
    }
}

fn record(stats: &mut FrameStats, frame_index: u64, outcome: &ScanOutcome) {
    match outcome {
        ScanOutcome::NoCode => stats.counters.frames_without_code += 1,
        ScanOutcome::Malformed => {
            debug!("[DECODER] frame {frame_index}: code does not parse as a chunk");
            stats.counters.candidates_malformed += 1;
        }
        ScanOutcome::Chunk(_) => {}
    }
}

/// Lazy, single-threaded stream of candidates in file order.
///
/// A read failure mid-stream ends the stream with a warning; everything
/// scanned so far stays usable.
pub struct CandidateStream<'c, S, C: ?Sized> {
    source: S,
    scanner: &'c C,
    frame_index: u64,
    done: bool,
    stats: FrameStats,
}

impl<'c, S: FrameSource, C: CodeScanner + ?Sized> CandidateStream<'c, S, C> {
    pub fn new(source: S, scanner: &'c C) -> Self {
        Self {
            source,
            scanner,
            frame_index: 0,
            done: false,
            stats: FrameStats::default(),
        }
    }

    pub fn frames_read(&self) -> u64 {
        self.frame_index
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn into_stats(self) -> FrameStats {
        self.stats
    }

    fn read_next(&mut self) -> Option<Frame> {
        let t = Instant::now();
        let next = self.source.next_frame();
        self.stats.stage_times.add(Stage::Read, t.elapsed());

        match next {
            Ok(Some(frame)) => Some(frame),
            Ok(None) => None,
            Err(e) => {
                warn!("[DECODER] read failed after {} frames, stopping: {}", self.frame_index, e);
                self.stats.counters.read_errors += 1;
                None
            }
        }
    }
}

impl<S: FrameSource, C: CodeScanner + ?Sized> Iterator for CandidateStream<'_, S, C> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        while !self.done {
            let Some(frame) = self.read_next() else {
                self.done = true;
                break;
            };
            let frame_index = self.frame_index;
            self.frame_index += 1;
            self.stats.counters.frames_read += 1;

            let t = Instant::now();
            let outcome = scan_frame(self.scanner, &frame);
            self.stats.stage_times.add(Stage::Scan, t.elapsed());

            record(&mut self.stats, frame_index, &outcome);
            if let ScanOutcome::Chunk(chunk) = outcome {
                return Some(Candidate { frame_index, chunk });
            }
        }
        None
    }
}

/// Scan frames on `profile.worker_count` threads and hand candidates to
/// `on_candidate` in file order.
///
/// Frames are read on the calling thread; `on_candidate` runs on a collector
/// thread, so the consumer sees exactly the sequence a [`CandidateStream`]
/// would produce.
pub fn scan_parallel<S, C, F>(
    mut source: S,
    scanner: &C,
    profile: &ParallelismProfile,
    on_candidate: F,
) -> Result<FrameStats, StegoError>
where
    S: FrameSource,
    C: CodeScanner + ?Sized,
    F: FnMut(Candidate) + Send,
{
    debug!(
        "[DECODER] parallel scan, {} workers, {} in flight",
        profile.worker_count, profile.inflight_frames
    );

    // ---- Channels ----
    let (frame_tx, frame_rx) = bounded::<(u64, Frame)>(profile.inflight_frames);
    let (out_tx, out_rx) = bounded::<(u64, ScanOutcome)>(profile.inflight_frames);

    thread::scope(|scope| {
        // ---- Workers ----
        let mut workers = Vec::with_capacity(profile.worker_count);
        for i in 0..profile.worker_count {
            let rx = frame_rx.clone();
            let tx = out_tx.clone();
            workers.push(scope.spawn(move || {
                let mut stats = FrameStats::default();
                for (frame_index, frame) in rx.iter() {
                    let t = Instant::now();
                    let outcome = scan_frame(scanner, &frame);
                    stats.stage_times.add(Stage::Scan, t.elapsed());

                    record(&mut stats, frame_index, &outcome);
                    if tx.send((frame_index, outcome)).is_err() {
                        break;
                    }
                }
                debug!("[WORKER-{i}] finished");
                stats
            }));
        }
        drop(frame_rx);
        drop(out_tx);

        // ---- Ordered collector ----
        let collector = scope.spawn(move || {
            let mut on_candidate = on_candidate;
            let mut reorder = Reorder::new();
            for (frame_index, outcome) in out_rx.iter() {
                reorder.push(frame_index, (frame_index, outcome));
                while let Some((frame_index, outcome)) = reorder.pop_ready() {
                    if let ScanOutcome::Chunk(chunk) = outcome {
                        on_candidate(Candidate { frame_index, chunk });
                    }
                }
            }
            reorder.is_empty()
        });

        // ---- Reader (calling thread) ----
        let mut stats = FrameStats::default();
        let mut frame_index = 0u64;
        loop {
            let t = Instant::now();
            let next = source.next_frame();
            stats.stage_times.add(Stage::Read, t.elapsed());

            let frame = match next {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    warn!("[DECODER] read failed after {frame_index} frames, stopping: {e}");
                    stats.counters.read_errors += 1;
                    break;
                }
            };
            stats.counters.frames_read += 1;

            if frame_tx.send((frame_index, frame)).is_err() {
                break;
            }
            frame_index += 1;
        }
        drop(frame_tx);

        let mut outcome = Ok(());
        for handle in workers {
            match handle.join() {
                Ok(worker_stats) => stats.merge(&worker_stats),
                Err(_) => outcome = Err(StegoError::Pipeline("scan worker panicked")),
            }
        }
        match collector.join() {
            Ok(true) => {}
            Ok(false) => outcome = outcome.and(Err(StegoError::Pipeline("scan results ended with gaps"))),
            Err(_) => outcome = outcome.and(Err(StegoError::Pipeline("candidate collector panicked"))),
        }

        outcome.map(|()| stats)
    })
}
