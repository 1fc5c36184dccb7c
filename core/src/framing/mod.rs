//! Wire framing for framed chunks.
//!
//! Responsibilities:
//! - Define the chunk header and framed chunk record
//! - Encode chunks into the canonical byte layout
//! - Decode chunks with structural validation
//!
//! Non-responsibilities:
//! - Visual codes
//! - Video I/O
//! - Ordering and deduplication

pub mod types;
pub mod encode;
pub mod decode;

pub use types::{
    ChunkHeader,
    FramedChunk,
    FrameError,
};
pub use encode::encode_chunk;
pub use decode::{
    parse_chunk_header,
    decode_chunk,
    decode_chunk_exact,
};
