//! Frame Encoder: chunks in, code frames out, in strict index order.

use std::thread;
use std::time::Instant;

use crossbeam::channel::bounded;
use tracing::{debug, warn};

use crate::code::CodeEncoder;
use crate::framing::{encode_chunk, FramedChunk};
use crate::session::chunker::Chunker;
use crate::session::config::SessionConfig;
use crate::session::ordered::Reorder;
use crate::session::FrameStats;
use crate::stego::embed;
use crate::telemetry::Stage;
use crate::types::StegoError;
use crate::video::{Frame, FrameSink, FrameSource};

/// A rendered code waiting for its turn at the sink.
struct RenderedCode {
    sequence_index: u32,
    frame: Frame,
}

/// Render one chunk into a code frame.
fn render_chunk<E: CodeEncoder + ?Sized>(encoder: &E, chunk: &FramedChunk) -> Result<RenderedCode, StegoError> {
    let wire = encode_chunk(chunk);
    let frame = encoder
        .render(&wire)
        .map_err(|source| StegoError::EncodeFailure {
            sequence_index: chunk.sequence_index(),
            source,
        })?;
    Ok(RenderedCode {
        sequence_index: chunk.sequence_index(),
        frame,
    })
}

/// Owns the sink side: optional carrier embedding, then append.
///
/// Always runs on the calling thread, so neither the sink nor the carrier
/// has to be `Send`.
struct OrderedFrameWriter<'s, 'c, K: FrameSink> {
    sink: &'s mut K,
    carrier: Option<&'c mut dyn FrameSource>,
    total_chunks: u32,
    verbose: bool,
    stats: FrameStats,
}

impl<'s, 'c, K: FrameSink> OrderedFrameWriter<'s, 'c, K> {
    fn write(&mut self, code: RenderedCode) -> Result<(), StegoError> {
        let frame = match self.carrier.as_mut() {
            None => code.frame,
            Some(carrier) => {
                let t = Instant::now();
                let next = carrier.next_frame()?;
                self.stats.stage_times.add(Stage::Read, t.elapsed());

                let Some(mut cover) = next else {
                    return Err(StegoError::InsufficientCarrierFrames {
                        needed: self.total_chunks as u64,
                        available: code.sequence_index as u64,
                    });
                };

                let t = Instant::now();
                embed(&mut cover, &code.frame)?;
                self.stats.stage_times.add(Stage::Embed, t.elapsed());
                cover
            }
        };

        let t = Instant::now();
        self.sink.append(&frame)?;
        self.stats.stage_times.add(Stage::Write, t.elapsed());
        self.stats.counters.frames_written += 1;

        progress!(self, "[WRITER] frame {}/{} written", code.sequence_index + 1, self.total_chunks);
        Ok(())
    }

    /// Copy the rest of the carrier through unchanged.
    fn write_tail(&mut self) -> Result<(), StegoError> {
        let Some(carrier) = self.carrier.as_mut() else {
            return Ok(());
        };

        loop {
            let t = Instant::now();
            let next = carrier.next_frame()?;
            self.stats.stage_times.add(Stage::Read, t.elapsed());
            let Some(frame) = next else { break };

            let t = Instant::now();
            self.sink.append(&frame)?;
            self.stats.stage_times.add(Stage::Write, t.elapsed());
            self.stats.counters.frames_written += 1;
            self.stats.counters.frames_passthrough += 1;
        }

        debug!("[WRITER] {} carrier frames passed through", self.stats.counters.frames_passthrough);
        Ok(())
    }
}

/// Drive every chunk of `chunker` through `encoder` into `sink`.
///
/// With a carrier, chunk `i` is embedded into carrier frame `i`. The sink is
/// not finished here; the caller decides whether to commit or drop it.
pub fn encode_frames<E, K>(
    chunker: Chunker<'_>,
    encoder: &E,
    sink: &mut K,
    carrier: Option<&mut dyn FrameSource>,
    config: &SessionConfig,
) -> Result<FrameStats, StegoError>
where
    E: CodeEncoder + ?Sized,
    K: FrameSink,
{
    let total_chunks = chunker.total_chunks();

    if let Some(available) = carrier.as_ref().and_then(|c| c.frame_count_hint()) {
        if available < total_chunks as u64 {
            return Err(StegoError::InsufficientCarrierFrames {
                needed: total_chunks as u64,
                available,
            });
        }
    }

    let mut writer = OrderedFrameWriter {
        sink,
        carrier,
        total_chunks,
        verbose: config.verbose,
        stats: FrameStats::default(),
    };

    if config.profile.is_parallel() && total_chunks > 1 {
        run_parallel(chunker, encoder, &mut writer, config)?;
    } else {
        run_sequential(chunker, encoder, &mut writer)?;
    }

    if config.passthrough_carrier_tail {
        writer.write_tail()?;
    } else if writer.carrier.is_some() {
        debug!("[WRITER] carrier tail dropped");
    }

    Ok(writer.stats)
}

fn run_sequential<E, K>(
    mut chunker: Chunker<'_>,
    encoder: &E,
    writer: &mut OrderedFrameWriter<'_, '_, K>,
) -> Result<(), StegoError>
where
    E: CodeEncoder + ?Sized,
    K: FrameSink,
{
    debug!("[ENCODER] sequential, {} chunks", chunker.total_chunks());

    loop {
        let t = Instant::now();
        let Some(chunk) = chunker.next() else { break };
        writer.stats.stage_times.add(Stage::Chunk, t.elapsed());
        writer.stats.counters.add_chunk(chunk.payload().len(), chunk.chunk_size());

        let t = Instant::now();
        let code = render_chunk(encoder, &chunk)?;
        writer.stats.stage_times.add(Stage::Render, t.elapsed());

        writer.write(code)?;
    }
    Ok(())
}

fn run_parallel<E, K>(
    chunker: Chunker<'_>,
    encoder: &E,
    writer: &mut OrderedFrameWriter<'_, '_, K>,
    config: &SessionConfig,
) -> Result<(), StegoError>
where
    E: CodeEncoder + ?Sized,
    K: FrameSink,
{
    let profile = &config.profile;
    debug!(
        "[ENCODER] parallel, {} chunks, {} workers, {} in flight",
        chunker.total_chunks(),
        profile.worker_count,
        profile.inflight_frames
    );

    // ---- Channels ----
    let (chunk_tx, chunk_rx) = bounded::<FramedChunk>(profile.inflight_frames);
    let (out_tx, out_rx) = bounded::<Result<RenderedCode, StegoError>>(profile.inflight_frames);

    thread::scope(|scope| {
        // ---- Producer (chunker) ----
        let producer = scope.spawn(move || {
            let mut stats = FrameStats::default();
            let mut chunker = chunker;
            loop {
                let t = Instant::now();
                let Some(chunk) = chunker.next() else { break };
                stats.stage_times.add(Stage::Chunk, t.elapsed());
                stats.counters.add_chunk(chunk.payload().len(), chunk.chunk_size());

                if chunk_tx.send(chunk).is_err() {
                    debug!("[CHUNKER] consumers gone, stopping early");
                    break;
                }
            }
            stats
        });

        // ---- Workers ----
        let mut workers = Vec::with_capacity(profile.worker_count);
        for i in 0..profile.worker_count {
            let rx = chunk_rx.clone();
            let tx = out_tx.clone();
            workers.push(scope.spawn(move || {
                let mut stats = FrameStats::default();
                for chunk in rx.iter() {
                    let t = Instant::now();
                    let rendered = render_chunk(encoder, &chunk);
                    stats.stage_times.add(Stage::Render, t.elapsed());

                    if tx.send(rendered).is_err() {
                        break;
                    }
                }
                debug!("[WORKER-{i}] finished");
                stats
            }));
        }

        drop(chunk_rx);
        drop(out_tx);

        // ---- Ordered writer ----
        let mut reorder = Reorder::new();
        let mut outcome = Ok(());

        'recv: for res in out_rx.iter() {
            let code = match res {
                Ok(code) => code,
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            };
            reorder.push(code.sequence_index as u64, code);
            while let Some(ready) = reorder.pop_ready() {
                if let Err(e) = writer.write(ready) {
                    outcome = Err(e);
                    break 'recv;
                }
            }
        }

        // Unblocks workers and the producer if we bailed out early.
        drop(out_rx);

        if outcome.is_ok() && !reorder.is_empty() {
            outcome = Err(StegoError::Pipeline("render results ended with gaps"));
        }

        for handle in workers {
            match handle.join() {
                Ok(stats) => writer.stats.merge(&stats),
                Err(_) => {
                    warn!("[ENCODER] render worker panicked");
                    outcome = outcome.and(Err(StegoError::Pipeline("render worker panicked")));
                }
            }
        }
        match producer.join() {
            Ok(stats) => writer.stats.merge(&stats),
            Err(_) => {
                outcome = outcome.and(Err(StegoError::Pipeline("chunk producer panicked")));
            }
        }

        outcome
    })
}
