//! Visual code capabilities.
//!
//! Responsibilities:
//! - Define the code-encoder / code-scanner seams the sessions depend on
//! - Provide `GridCode`, a black/white module grid implementation
//!
//! Non-responsibilities:
//! - Chunk framing
//! - Carrier embedding
//! - Video I/O

pub mod types;
pub mod grid;

pub use types::{
    CodeEncoder,
    CodeScanner,
    CodeError,
};
pub use grid::GridCode;
