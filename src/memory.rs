use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::VmConfig;
use crate::error::{Result, VmError};
use crate::process::ProcessId;

/// Index of a physical frame in the pool
pub type FrameId = usize;

/// One physical frame and the process currently holding it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub number: FrameId,
    pub owner: Option<ProcessId>,
}

impl Frame {
    /// True when no process holds this frame
    #[inline]
    pub fn is_free(&self) -> bool {
        self.owner.is_none()
    }
}

/// Owns the physical frame pool and hands frames out to processes.
///
/// Fresh claims only ever probe the first `candidate_frames` frames of the
/// pool; the rest of the pool exists but is never offered. All mutation goes
/// through `&mut self`, so a caller that wants to share one allocator across
/// threads has to wrap it in a lock, which keeps probe-check-mark atomic.
pub struct FrameAllocator {
    frames: Vec<Frame>,
    candidates: usize,
    probe_limit: usize,
    rng: StdRng,
}

impl FrameAllocator {
    /// Build a pool of `pool_size` free frames
    pub fn new(config: &VmConfig) -> Result<Self> {
        config.validate()?;
        let frames = (0..config.pool_size)
            .map(|number| Frame { number, owner: None })
            .collect();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(FrameAllocator {
            frames,
            candidates: config.candidate_frames,
            probe_limit: config.probe_limit,
            rng,
        })
    }

    /// Claim some free frame from the candidate range for `owner`.
    ///
    /// Tries `probe_limit` random indices first, then falls back to a linear
    /// scan of the candidate range, so the call always terminates.
    pub fn claim_any(&mut self, owner: ProcessId) -> Result<FrameId> {
        for _ in 0..self.probe_limit {
            let number = self.rng.gen_range(0..self.candidates);
            if self.frames[number].is_free() {
                trace!("frame {} claimed by random probe for process {}", number, owner);
                return Ok(self.mark(number, owner));
            }
        }

        match (0..self.candidates).find(|&n| self.frames[n].is_free()) {
            Some(number) => {
                warn!(
                    "random probes exhausted, frame {} found by linear scan for process {}",
                    number, owner
                );
                Ok(self.mark(number, owner))
            }
            None => Err(VmError::ResourceExhausted { candidates: self.candidates }),
        }
    }

    fn mark(&mut self, number: FrameId, owner: ProcessId) -> FrameId {
        self.frames[number].owner = Some(owner);
        number
    }

    /// Mark a frame free again
    pub fn release(&mut self, number: FrameId) -> Result<()> {
        let limit = self.frames.len();
        let frame = self.frames.get_mut(number).ok_or(VmError::OutOfRange {
            what: "frame",
            index: number,
            limit,
        })?;
        match frame.owner.take() {
            Some(owner) => debug!("frame {} released by process {}", number, owner),
            None => warn!("frame {} released while already free", number),
        }
        Ok(())
    }

    /// Free every frame held by `owner`, returning how many were released
    pub fn release_all(&mut self, owner: ProcessId) -> usize {
        let mut released = 0;
        for frame in self.frames.iter_mut().filter(|f| f.owner == Some(owner)) {
            frame.owner = None;
            released += 1;
        }
        released
    }

    /// Process holding `number`, `None` when free
    pub fn owner_of(&self, number: FrameId) -> Result<Option<ProcessId>> {
        self.frames
            .get(number)
            .map(|f| f.owner)
            .ok_or(VmError::OutOfRange { what: "frame", index: number, limit: self.frames.len() })
    }

    /// Frames currently held by `owner`, in pool order
    pub fn claimed_by(&self, owner: ProcessId) -> Vec<FrameId> {
        self.frames
            .iter()
            .filter(|f| f.owner == Some(owner))
            .map(|f| f.number)
            .collect()
    }

    /// Free frames in the whole pool
    pub fn free_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_free()).count()
    }

    /// Free frames that `claim_any` can still reach
    pub fn candidate_free_count(&self) -> usize {
        self.frames[..self.candidates].iter().filter(|f| f.is_free()).count()
    }

    /// Total number of frames
    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    /// Size of the range fresh claims are drawn from
    pub fn candidate_frames(&self) -> usize {
        self.candidates
    }

    /// Occupancy snapshot of the whole pool
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(raw: u32) -> ProcessId {
        ProcessId::new(raw).unwrap()
    }

    fn allocator(pool: usize, candidates: usize) -> FrameAllocator {
        let config = VmConfig::new()
            .with_pool_size(pool)
            .with_candidate_frames(candidates)
            .with_seed(42);
        FrameAllocator::new(&config).unwrap()
    }

    #[test]
    fn test_new_pool_is_free() {
        let frames = allocator(64, 16);
        assert_eq!(frames.pool_size(), 64);
        assert_eq!(frames.free_count(), 64);
        assert_eq!(frames.candidate_free_count(), 16);
        assert!(frames.frames().iter().enumerate().all(|(i, f)| f.number == i && f.is_free()));
    }

    #[test]
    fn test_claim_stays_in_candidate_range() {
        let mut frames = allocator(64, 16);
        for _ in 0..16 {
            let number = frames.claim_any(pid(1)).unwrap();
            assert!(number < 16);
        }
        assert_eq!(frames.candidate_free_count(), 0);
        assert_eq!(frames.free_count(), 48);
    }

    #[test]
    fn test_claims_are_distinct() {
        let mut frames = allocator(16, 16);
        let mut claimed: Vec<FrameId> = (0..16).map(|_| frames.claim_any(pid(3)).unwrap()).collect();
        claimed.sort_unstable();
        claimed.dedup();
        assert_eq!(claimed.len(), 16);
    }

    #[test]
    fn test_exhaustion() {
        let mut frames = allocator(8, 2);
        frames.claim_any(pid(1)).unwrap();
        frames.claim_any(pid(2)).unwrap();
        let err = frames.claim_any(pid(1)).unwrap_err();
        assert!(matches!(err, VmError::ResourceExhausted { candidates: 2 }));
    }

    #[test]
    fn test_fallback_scan_without_probes() {
        let config = VmConfig::new()
            .with_pool_size(4)
            .with_candidate_frames(4)
            .with_probe_limit(0)
            .with_seed(1);
        let mut frames = FrameAllocator::new(&config).unwrap();
        // no random probes, so the linear scan hands out frames in order
        assert_eq!(frames.claim_any(pid(1)).unwrap(), 0);
        assert_eq!(frames.claim_any(pid(1)).unwrap(), 1);
        frames.release(0).unwrap();
        assert_eq!(frames.claim_any(pid(2)).unwrap(), 0);
    }

    #[test]
    fn test_release_and_owner() {
        let mut frames = allocator(16, 4);
        let number = frames.claim_any(pid(5)).unwrap();
        assert_eq!(frames.owner_of(number).unwrap(), Some(pid(5)));

        frames.release(number).unwrap();
        assert_eq!(frames.owner_of(number).unwrap(), None);

        // double release is harmless
        frames.release(number).unwrap();
        assert!(matches!(frames.release(16), Err(VmError::OutOfRange { .. })));
        assert!(frames.owner_of(99).is_err());
    }

    #[test]
    fn test_release_all_only_touches_owner() {
        let mut frames = allocator(16, 8);
        for _ in 0..3 {
            frames.claim_any(pid(1)).unwrap();
        }
        for _ in 0..2 {
            frames.claim_any(pid(2)).unwrap();
        }
        assert_eq!(frames.claimed_by(pid(1)).len(), 3);

        assert_eq!(frames.release_all(pid(1)), 3);
        assert!(frames.claimed_by(pid(1)).is_empty());
        assert_eq!(frames.claimed_by(pid(2)).len(), 2);
    }

    #[test]
    fn test_seeded_allocators_agree() {
        let mut a = allocator(64, 16);
        let mut b = allocator(64, 16);
        for _ in 0..10 {
            assert_eq!(a.claim_any(pid(1)).unwrap(), b.claim_any(pid(1)).unwrap());
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = VmConfig::new().with_pool_size(4).with_candidate_frames(8);
        assert!(FrameAllocator::new(&config).is_err());

        // an absurd pool is refused before anything is allocated
        let config = VmConfig::new().with_pool_size(usize::MAX);
        assert!(matches!(FrameAllocator::new(&config), Err(VmError::InvalidConfig(_))));
    }
}
