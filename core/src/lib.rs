//! framecode-core
//!
//! Moves a binary payload through a video as a sequence of visual codes:
//! chunking, framing, rendering, optional carrier embedding, scanning and
//! checksum-verified reassembly.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;
pub mod utils;

// Wire format and collaborators
pub mod framing;
pub mod code;
pub mod stego;
pub mod video;
pub mod telemetry;

// Sessions
pub mod session;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::code::{CodeEncoder, CodeError, CodeScanner, GridCode};
    pub use crate::framing::{ChunkHeader, FramedChunk};
    pub use crate::session::{
        decode_payload, encode_payload, DecodeOutcome, EncodeOutcome, ParallelismProfile,
        SessionConfig,
    };
    pub use crate::stego::CarrierScanner;
    pub use crate::telemetry::TelemetrySnapshot;
    pub use crate::types::StegoError;
    pub use crate::video::{Frame, FrameSink, FrameSource, MemoryVideo, MemoryVideoWriter};
}
