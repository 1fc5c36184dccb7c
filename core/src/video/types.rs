use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// One decoded video frame, 8-bit RGB.
pub type Frame = image::RgbImage;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}")]
    Process { program: String, status: String },

    #[error("cannot probe {path:?}: {reason}")]
    Probe { path: PathBuf, reason: String },

    #[error("frame is {actual_width}x{actual_height}, stream is {width}x{height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("truncated frame: got {actual} of {expected} bytes")]
    TruncatedFrame { expected: usize, actual: usize },

    #[error("no frames were written")]
    Empty,
}

/// Ordered, append-only frame output.
///
/// Frames land in call order. Dropping a sink without calling `finish`
/// discards everything appended so far.
pub trait FrameSink {
    type Output;

    fn append(&mut self, frame: &Frame) -> Result<(), VideoError>;

    /// Commit the output. Only a finished sink yields a usable video.
    fn finish(self) -> Result<Self::Output, VideoError>;
}

/// Forward-only frame input. Restart by reopening.
pub trait FrameSource {
    /// Next frame in file order, `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError>;

    /// Total frame count when the container reports one.
    fn frame_count_hint(&self) -> Option<u64> {
        None
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        (**self).next_frame()
    }

    fn frame_count_hint(&self) -> Option<u64> {
        (**self).frame_count_hint()
    }
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        (**self).next_frame()
    }

    fn frame_count_hint(&self) -> Option<u64> {
        (**self).frame_count_hint()
    }
}
