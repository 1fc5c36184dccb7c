//! Video I/O capabilities.
//!
//! Responsibilities:
//! - Define the frame sink / frame source seams
//! - In-memory frame store (tests, tooling)
//! - ffmpeg-backed container reader and writer
//!
//! Non-responsibilities:
//! - Codes
//! - Chunk framing

pub mod types;
pub mod memory;
pub mod ffmpeg;

pub use types::{
    Frame,
    FrameSink,
    FrameSource,
    VideoError,
};
pub use memory::{
    MemoryVideo,
    MemoryVideoReader,
    MemoryVideoWriter,
};
pub use ffmpeg::{
    FfmpegConfig,
    FfmpegReader,
    FfmpegWriter,
    VideoInfo,
    probe,
};
