//! Protocol constants and defaults.

/// Width in bytes of the truncated BLAKE3 checksum carried by every framed chunk.
pub const CHECKSUM_LEN: usize = 16;

/// Largest `total_chunks` the u32 index fields of the header can express.
pub const MAX_TOTAL_CHUNKS: u64 = u32::MAX as u64;

/// Grid code defaults (modules per side, pixels per module, quiet-zone modules).
pub const DEFAULT_GRID_MODULES: u32 = 128;
pub const DEFAULT_MODULE_PX: u32 = 4;
pub const DEFAULT_QUIET_MODULES: u32 = 4;
/// Smallest grid that still leaves room for the sync row and length prefix.
pub const MIN_GRID_MODULES: u32 = 8;
/// Bytes of the little-endian length prefix in front of the grid payload.
pub const GRID_LEN_PREFIX: usize = 2;
/// Luma threshold separating dark from light modules.
pub const LUMA_THRESHOLD: u32 = 128;

/// Low bits of each carrier channel that hold the hidden plane.
pub const CARRIER_LOW_BITS: u8 = 4;

/// Frame rate for videos produced without a carrier.
pub const DEFAULT_FPS: u32 = 30;

/// In-flight frame bounds for the parallel pipelines.
pub const DEFAULT_INFLIGHT_FRAMES: usize = 16;
pub const MAX_INFLIGHT_FRAMES: usize = 256;
/// Fraction of available memory the in-flight frames may occupy.
pub const DEFAULT_MEM_FRACTION: f64 = 0.25;

/// Environment overrides for the external video tools.
pub const ENV_FFMPEG: &str = "FRAMECODE_FFMPEG";
pub const ENV_FFPROBE: &str = "FRAMECODE_FFPROBE";
pub const DEFAULT_FFMPEG: &str = "ffmpeg";
pub const DEFAULT_FFPROBE: &str = "ffprobe";
/// Lossless codec + container used for output videos.
pub const OUTPUT_CODEC: &str = "ffv1";
pub const OUTPUT_FORMAT: &str = "matroska";
/// Suffix of the in-progress output file, renamed away on success.
pub const PARTIAL_SUFFIX: &str = "partial";
