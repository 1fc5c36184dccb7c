//! Carrier embedding: hides a code image in the low bits of a cover frame.
//!
//! The high nibble of every code channel is written into the low nibble of
//! the matching carrier channel, over the centred code-sized region.
//! Extraction shifts the low nibble back up. A plain black/white code frame
//! extracts to itself (white becomes 0xF0, still light), so scanning through
//! [`CarrierScanner`] works with and without a carrier.

use crate::code::CodeScanner;
use crate::constants::CARRIER_LOW_BITS;
use crate::types::StegoError;
use crate::video::Frame;

const LOW_MASK: u8 = (1 << CARRIER_LOW_BITS) - 1;
const HIGH_MASK: u8 = !LOW_MASK;

/// Embed `code` into the centre of `carrier`, in place.
pub fn embed(carrier: &mut Frame, code: &Frame) -> Result<(), StegoError> {
    let (cw, ch) = carrier.dimensions();
    let (w, h) = code.dimensions();
    if w > cw || h > ch {
        return Err(StegoError::CarrierTooSmall {
            carrier_width: cw,
            carrier_height: ch,
            code_width: w,
            code_height: h,
        });
    }

    let ox = (cw - w) / 2;
    let oy = (ch - h) / 2;

    for (x, y, src) in code.enumerate_pixels() {
        let dst = carrier.get_pixel_mut(ox + x, oy + y);
        for c in 0..3 {
            dst[c] = (dst[c] & HIGH_MASK) | (src[c] >> (8 - CARRIER_LOW_BITS));
        }
    }
    Ok(())
}

/// Rebuild the hidden plane of a frame.
pub fn extract(frame: &Frame) -> Frame {
    let mut out = frame.clone();
    for byte in out.iter_mut() {
        *byte = (*byte & LOW_MASK) << (8 - CARRIER_LOW_BITS);
    }
    out
}

/// Scans the hidden plane of each frame with the wrapped scanner.
#[derive(Debug, Clone, Copy, Default)]
pub struct CarrierScanner<S> {
    inner: S,
}

impl<S: CodeScanner> CarrierScanner<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: CodeScanner> CodeScanner for CarrierScanner<S> {
    fn scan(&self, frame: &Frame) -> Option<Vec<u8>> {
        self.inner.scan(&extract(frame))
    }
}
