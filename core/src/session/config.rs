use crate::framing::ChunkHeader;
use crate::session::parallelism::ParallelismProfile;
use crate::types::StegoError;

/// Per-session settings, passed explicitly to every entry point.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Promote per-frame progress logs from `debug` to `info`.
    pub verbose: bool,

    pub profile: ParallelismProfile,

    /// Padded chunk size. `None` uses the largest size the code capacity allows.
    pub chunk_size: Option<usize>,

    /// Upper bound on emitted code frames; lower than the protocol limit.
    pub max_frames: Option<u32>,

    /// Copy carrier frames beyond the last chunk into the output unchanged.
    pub passthrough_carrier_tail: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            profile: ParallelismProfile::single_threaded(),
            chunk_size: None,
            max_frames: None,
            passthrough_carrier_tail: true,
        }
    }
}

impl SessionConfig {
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            ..Self::default()
        }
    }

    pub fn with_profile(mut self, profile: ParallelismProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn validate(&self) -> Result<(), StegoError> {
        if self.profile.worker_count == 0 {
            return Err(StegoError::InvalidConfig("worker count must be at least 1".into()));
        }
        if self.profile.inflight_frames == 0 {
            return Err(StegoError::InvalidConfig("in-flight frames must be at least 1".into()));
        }
        if self.chunk_size == Some(0) {
            return Err(StegoError::InvalidConfig("chunk size must be at least 1".into()));
        }
        if self.max_frames == Some(0) {
            return Err(StegoError::InvalidConfig("max frames must be at least 1".into()));
        }
        Ok(())
    }

    /// Chunk size for an encoder of the given byte capacity.
    ///
    /// Every framed chunk (header + padded data) must fit one code.
    pub fn resolve_chunk_size(&self, capacity: usize) -> Result<usize, StegoError> {
        let max = capacity.saturating_sub(ChunkHeader::LEN);
        if max == 0 {
            return Err(StegoError::InvalidConfig(format!(
                "code capacity of {capacity} bytes cannot hold a {}-byte chunk header plus data",
                ChunkHeader::LEN
            )));
        }
        match self.chunk_size {
            None => Ok(max),
            Some(size) if size <= max => Ok(size),
            Some(size) => Err(StegoError::InvalidConfig(format!(
                "chunk size {size} exceeds the {max} bytes a code can carry"
            ))),
        }
    }
}
