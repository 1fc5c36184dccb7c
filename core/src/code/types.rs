use thiserror::Error;

use crate::video::Frame;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodeError {
    #[error("{len} bytes exceed code capacity of {capacity}")]
    CapacityExceeded { len: usize, capacity: usize },

    #[error("invalid code geometry: {0}")]
    InvalidGeometry(String),
}

/// Renders bytes into a scannable frame image.
///
/// `capacity` is fixed for the lifetime of the encoder; `render` must
/// succeed for every input of at most that many bytes.
pub trait CodeEncoder: Send + Sync {
    fn capacity(&self) -> usize;

    fn render(&self, bytes: &[u8]) -> Result<Frame, CodeError>;
}

/// Recovers the bytes of a code from a frame, if one is visible.
///
/// Returns `None` for blank frames, frames without a code and unreadable codes.
pub trait CodeScanner: Send + Sync {
    fn scan(&self, frame: &Frame) -> Option<Vec<u8>>;
}

impl<T: CodeEncoder + ?Sized> CodeEncoder for &T {
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn render(&self, bytes: &[u8]) -> Result<Frame, CodeError> {
        (**self).render(bytes)
    }
}

impl<T: CodeScanner + ?Sized> CodeScanner for &T {
    fn scan(&self, frame: &Frame) -> Option<Vec<u8>> {
        (**self).scan(frame)
    }
}
