use byteorder::{ByteOrder, LittleEndian};
use image::Rgb;

use crate::constants::{
    DEFAULT_GRID_MODULES, DEFAULT_MODULE_PX, DEFAULT_QUIET_MODULES, GRID_LEN_PREFIX,
    LUMA_THRESHOLD, MIN_GRID_MODULES,
};
use crate::code::types::{CodeEncoder, CodeError, CodeScanner};
use crate::video::Frame;

const DARK: Rgb<u8> = Rgb([0, 0, 0]);
const LIGHT: Rgb<u8> = Rgb([255, 255, 255]);

/// Square grid of black/white modules.
///
/// Layout, in modules:
///
/// ```text
/// [ quiet zone ]
/// row 0        : sync pattern, dark on even columns
/// rows 1..n    : u16 LE length prefix, then payload bytes, MSB first, row-major
/// [ quiet zone ]
/// ```
///
/// The scanner reads the centred code-sized window of a frame, so a code can
/// be placed in the middle of a larger image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCode {
    modules: u32,
    module_px: u32,
    quiet: u32,
}

impl Default for GridCode {
    fn default() -> Self {
        Self {
            modules: DEFAULT_GRID_MODULES,
            module_px: DEFAULT_MODULE_PX,
            quiet: DEFAULT_QUIET_MODULES,
        }
    }
}

impl GridCode {
    pub fn new(modules: u32, module_px: u32, quiet: u32) -> Result<Self, CodeError> {
        if modules < MIN_GRID_MODULES {
            return Err(CodeError::InvalidGeometry(format!(
                "{modules} modules per side, minimum is {MIN_GRID_MODULES}"
            )));
        }
        if module_px == 0 {
            return Err(CodeError::InvalidGeometry("module size must be at least 1 px".into()));
        }

        let side = (modules as u64 + 2 * quiet as u64) * module_px as u64;
        if side > u16::MAX as u64 {
            return Err(CodeError::InvalidGeometry(format!("code side of {side} px is too large")));
        }

        let code = Self { modules, module_px, quiet };
        // The length prefix is a u16.
        if code.capacity() > u16::MAX as usize {
            return Err(CodeError::InvalidGeometry(format!(
                "capacity {} exceeds the length prefix",
                code.capacity()
            )));
        }
        Ok(code)
    }

    pub fn modules(&self) -> u32 {
        self.modules
    }

    pub fn module_px(&self) -> u32 {
        self.module_px
    }

    /// Side length of the rendered image in pixels.
    pub fn side_px(&self) -> u32 {
        (self.modules + 2 * self.quiet) * self.module_px
    }

    fn data_modules(&self) -> usize {
        (self.modules as usize) * (self.modules as usize - 1)
    }

    fn module_origin(&self, mx: u32, my: u32) -> (u32, u32) {
        ((self.quiet + mx) * self.module_px, (self.quiet + my) * self.module_px)
    }

    fn paint(&self, img: &mut Frame, mx: u32, my: u32) {
        let (x0, y0) = self.module_origin(mx, my);
        for y in y0..y0 + self.module_px {
            for x in x0..x0 + self.module_px {
                img.put_pixel(x, y, DARK);
            }
        }
    }

    /// Average luma over the module interior, offset by the window origin.
    fn is_dark(&self, frame: &Frame, ox: u32, oy: u32, mx: u32, my: u32) -> bool {
        let (x0, y0) = self.module_origin(mx, my);
        // Skip the module border when there is one to skip.
        let inset = if self.module_px >= 3 { 1 } else { 0 };
        let lo = inset;
        let hi = self.module_px - inset;

        let mut sum = 0u32;
        let mut count = 0u32;
        for y in lo..hi {
            for x in lo..hi {
                let px = frame.get_pixel(ox + x0 + x, oy + y0 + y);
                sum += luma(px);
                count += 1;
            }
        }
        sum / count.max(1) < LUMA_THRESHOLD
    }
}

#[inline]
fn luma(px: &Rgb<u8>) -> u32 {
    (px[0] as u32 * 299 + px[1] as u32 * 587 + px[2] as u32 * 114) / 1000
}

impl CodeEncoder for GridCode {
    fn capacity(&self) -> usize {
        (self.data_modules() / 8).saturating_sub(GRID_LEN_PREFIX)
    }

    fn render(&self, bytes: &[u8]) -> Result<Frame, CodeError> {
        let capacity = self.capacity();
        if bytes.len() > capacity {
            return Err(CodeError::CapacityExceeded {
                len: bytes.len(),
                capacity,
            });
        }

        let side = self.side_px();
        let mut img = Frame::from_pixel(side, side, LIGHT);

        // ---- Sync row ----
        for mx in (0..self.modules).step_by(2) {
            self.paint(&mut img, mx, 0);
        }

        // ---- Length prefix + payload ----
        let mut prefix = [0u8; GRID_LEN_PREFIX];
        LittleEndian::write_u16(&mut prefix, bytes.len() as u16);

        let stream = prefix.iter().chain(bytes.iter());
        for (byte_index, byte) in stream.enumerate() {
            for bit in 0..8 {
                if byte & (0x80 >> bit) == 0 {
                    continue;
                }
                let i = (byte_index * 8 + bit) as u32;
                self.paint(&mut img, i % self.modules, 1 + i / self.modules);
            }
        }

        Ok(img)
    }
}

impl CodeScanner for GridCode {
    fn scan(&self, frame: &Frame) -> Option<Vec<u8>> {
        let side = self.side_px();
        let (w, h) = frame.dimensions();
        if w < side || h < side {
            return None;
        }
        let ox = (w - side) / 2;
        let oy = (h - side) / 2;

        // ---- Sync row ----
        for mx in 0..self.modules {
            if self.is_dark(frame, ox, oy, mx, 0) != (mx % 2 == 0) {
                return None;
            }
        }

        let read_byte = |byte_index: usize| -> u8 {
            let mut out = 0u8;
            for bit in 0..8 {
                let i = (byte_index * 8 + bit) as u32;
                if self.is_dark(frame, ox, oy, i % self.modules, 1 + i / self.modules) {
                    out |= 0x80 >> bit;
                }
            }
            out
        };

        // ---- Length prefix ----
        let prefix = [read_byte(0), read_byte(1)];
        let len = LittleEndian::read_u16(&prefix) as usize;
        if len > self.capacity() {
            return None;
        }

        Some((0..len).map(|i| read_byte(GRID_LEN_PREFIX + i)).collect())
    }
}
