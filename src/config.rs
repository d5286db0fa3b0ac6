use crate::constants::*;
use crate::error::{Result, VmError};

/// Tunables shared by the frame allocator and the fault handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Number of physical frames in the pool
    pub pool_size: usize,
    /// Fresh claims only ever look at frames `[0, candidate_frames)`
    pub candidate_frames: usize,
    /// Page (and frame) size in bytes
    pub page_size: usize,
    /// Max resident pages per process
    pub resident_capacity: usize,
    /// Random probes before the linear fallback scan
    pub probe_limit: usize,
    /// Fixed RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl VmConfig {
    /// Defaults from the constants, entropy-seeded
    pub fn new() -> Self {
        VmConfig {
            pool_size: POOL_SIZE,
            candidate_frames: CANDIDATE_FRAMES,
            page_size: PAGE_SIZE,
            resident_capacity: RESIDENT_CAPACITY,
            probe_limit: PROBE_LIMIT,
            seed: None,
        }
    }

    /// Set the number of physical frames
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Set the claim range `[0, candidate_frames)`
    pub fn with_candidate_frames(mut self, candidate_frames: usize) -> Self {
        self.candidate_frames = candidate_frames;
        self
    }

    /// Set the page size in bytes
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the per-process resident limit
    pub fn with_resident_capacity(mut self, resident_capacity: usize) -> Self {
        self.resident_capacity = resident_capacity;
        self
    }

    /// Set random claim attempts before the linear scan
    pub fn with_probe_limit(mut self, probe_limit: usize) -> Self {
        self.probe_limit = probe_limit;
        self
    }

    /// Fix the RNG seed for reproducible runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Reject zero sizes, an oversized pool and a candidate range past the pool
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(VmError::InvalidConfig("pool size must be nonzero".into()));
        }
        if self.pool_size > MAX_POOL_SIZE {
            return Err(VmError::InvalidConfig(format!(
                "pool size {} exceeds limit {}",
                self.pool_size, MAX_POOL_SIZE
            )));
        }
        if self.candidate_frames == 0 {
            return Err(VmError::InvalidConfig("candidate range must be nonzero".into()));
        }
        if self.candidate_frames > self.pool_size {
            return Err(VmError::InvalidConfig(format!(
                "candidate range {} exceeds pool size {}",
                self.candidate_frames, self.pool_size
            )));
        }
        if self.page_size == 0 {
            return Err(VmError::InvalidConfig("page size must be nonzero".into()));
        }
        if self.resident_capacity == 0 {
            return Err(VmError::InvalidConfig("resident capacity must be nonzero".into()));
        }
        Ok(())
    }
}

impl Default for VmConfig {
    fn default() -> Self {
        Self::new()
    }
}
