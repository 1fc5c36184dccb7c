use tracing::debug;

/// Parallelism configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelismProfile {
    pub worker_count: usize,
    pub inflight_frames: usize,
}

impl Default for ParallelismProfile {
    fn default() -> Self {
        Self::single_threaded()
    }
}

impl ParallelismProfile {
    pub fn single_threaded() -> Self {
        Self {
            worker_count: 1,
            inflight_frames: 1,
        }
    }

    /// Fixed profile; both values are floored at one.
    pub fn new(worker_count: usize, inflight_frames: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
            inflight_frames: inflight_frames.max(1),
        }
    }

    /// Size the pipeline from the host: one core is left free, and in-flight
    /// frames are capped by a fraction of available memory and `hard_cap`.
    pub fn dynamic(frame_bytes: u64, mem_fraction: f64, hard_cap: usize) -> Self {
        let cores = num_cpus::get();
        let worker_count = cores.saturating_sub(1).max(1);

        let mut sys = sysinfo::System::new();
        sys.refresh_memory();

        // sysinfo reports bytes
        let avail_bytes = sys.available_memory();
        let budget = (avail_bytes as f64 * mem_fraction) as u64;
        let max_frames = budget / frame_bytes.max(1);

        let profile = Self::new(worker_count, max_frames.min(hard_cap as u64) as usize);
        debug!(
            "[PROFILE] workers={}, inflight_frames={} (available memory {} bytes)",
            profile.worker_count, profile.inflight_frames, avail_bytes
        );
        profile
    }

    #[inline]
    pub fn is_parallel(&self) -> bool {
        self.worker_count > 1
    }
}
