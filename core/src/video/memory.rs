use std::vec;

use crate::video::types::{Frame, FrameSink, FrameSource, VideoError};

/// An in-memory video: just the ordered frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryVideo {
    pub frames: Vec<Frame>,
}

impl MemoryVideo {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    /// `count` identical frames filled with `rgb`; handy as a carrier.
    pub fn solid(count: usize, width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let frame = Frame::from_pixel(width, height, image::Rgb(rgb));
        Self {
            frames: vec![frame; count],
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Open a reader over a copy of the frames.
    pub fn reader(&self) -> MemoryVideoReader {
        MemoryVideoReader::new(self.frames.clone())
    }

    pub fn into_reader(self) -> MemoryVideoReader {
        MemoryVideoReader::new(self.frames)
    }

    pub fn remove_frame(&mut self, index: usize) -> Frame {
        self.frames.remove(index)
    }

    /// Insert a copy of frame `index` right after it.
    pub fn duplicate_frame(&mut self, index: usize) {
        let copy = self.frames[index].clone();
        self.frames.insert(index + 1, copy);
    }

    /// Insert a uniform frame at `index`.
    pub fn insert_blank(&mut self, index: usize, rgb: [u8; 3]) {
        let (w, h) = self
            .frames
            .first()
            .map(|f| f.dimensions())
            .unwrap_or((1, 1));
        self.frames
            .insert(index, Frame::from_pixel(w, h, image::Rgb(rgb)));
    }
}

/// Collects appended frames; `finish` hands them over as a [`MemoryVideo`].
#[derive(Debug, Default)]
pub struct MemoryVideoWriter {
    frames: Vec<Frame>,
}

impl MemoryVideoWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_written(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSink for MemoryVideoWriter {
    type Output = MemoryVideo;

    fn append(&mut self, frame: &Frame) -> Result<(), VideoError> {
        if let Some(first) = self.frames.first() {
            let (width, height) = first.dimensions();
            let (actual_width, actual_height) = frame.dimensions();
            if (width, height) != (actual_width, actual_height) {
                return Err(VideoError::DimensionMismatch {
                    width,
                    height,
                    actual_width,
                    actual_height,
                });
            }
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(self) -> Result<MemoryVideo, VideoError> {
        if self.frames.is_empty() {
            return Err(VideoError::Empty);
        }
        Ok(MemoryVideo::new(self.frames))
    }
}

#[derive(Debug)]
pub struct MemoryVideoReader {
    total: u64,
    frames: vec::IntoIter<Frame>,
}

impl MemoryVideoReader {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            total: frames.len() as u64,
            frames: frames.into_iter(),
        }
    }
}

impl FrameSource for MemoryVideoReader {
    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        Ok(self.frames.next())
    }

    fn frame_count_hint(&self) -> Option<u64> {
        Some(self.total)
    }
}
