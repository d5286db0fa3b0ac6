use std::fmt;
use std::num::NonZeroU32;

use crate::config::VmConfig;
use crate::constants::MAX_PAGES_PER_PROCESS;
use crate::error::{Result, VmError};
use crate::memory::FrameAllocator;
use crate::page_table::PageTable;
use crate::queue::ReplacementQueue;

/// Process identifier. Zero is reserved to mean "no owner".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(NonZeroU32);

impl ProcessId {
    /// Wrap a raw id; 0 is rejected
    pub fn new(raw: u32) -> Result<Self> {
        NonZeroU32::new(raw)
            .map(ProcessId)
            .ok_or(VmError::InvalidProcessId(raw))
    }

    /// Raw numeric id
    #[inline]
    pub fn get(&self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A simulated process: its page table, its FIFO of resident pages and a
/// running page fault count.
///
/// Mapping state only changes through [`FaultHandler`](crate::fault::FaultHandler).
#[derive(Debug)]
pub struct Process {
    pid: ProcessId,
    size: usize,
    page_table: PageTable,
    resident: ReplacementQueue,
    faults: u64,
}

impl Process {
    /// Create a process of `size` bytes with every page unmapped
    pub fn new(pid: ProcessId, size: usize, config: &VmConfig) -> Result<Self> {
        config.validate()?;
        if size == 0 {
            return Err(VmError::InvalidConfig(format!("process {} has size 0", pid)));
        }
        let pages = size.div_ceil(config.page_size);
        if pages > MAX_PAGES_PER_PROCESS {
            return Err(VmError::InvalidConfig(format!(
                "process {} needs {} pages, limit is {}",
                pid, pages, MAX_PAGES_PER_PROCESS
            )));
        }
        Ok(Process {
            pid,
            size,
            page_table: PageTable::new(size, config.page_size),
            resident: ReplacementQueue::new(config.resident_capacity),
            faults: 0,
        })
    }

    /// Identifier of this process
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of virtual pages, i.e. page table entries
    pub fn page_count(&self) -> usize {
        self.page_table.len()
    }

    /// Page faults taken since creation
    pub fn page_fault_count(&self) -> u64 {
        self.faults
    }

    /// Read-only view of the page table
    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    /// Resident pages, oldest admission first
    pub fn resident_pages(&self) -> Vec<usize> {
        self.resident.iter().collect()
    }

    pub(crate) fn page_table_mut(&mut self) -> &mut PageTable {
        &mut self.page_table
    }

    pub(crate) fn resident_mut(&mut self) -> &mut ReplacementQueue {
        &mut self.resident
    }

    pub(crate) fn resident(&self) -> &ReplacementQueue {
        &self.resident
    }

    pub(crate) fn record_fault(&mut self) {
        self.faults += 1;
    }

    /// Tear the process down, handing every frame it still maps back to the
    /// pool. Returns the number of frames released.
    pub fn release(mut self, frames: &mut FrameAllocator) -> Result<usize> {
        let mut released = 0;
        for page in self.resident.drain() {
            if let Some(frame) = self.page_table.clear_mapping(page)? {
                frames.release(frame)?;
                released += 1;
            }
        }
        log::debug!("process {} released {} frames", self.pid, released);
        Ok(released)
    }

    /// Check the residency invariants against the frame pool
    pub fn check_invariants(&self, frames: &FrameAllocator) -> Result<()> {
        if self.resident.len() > self.resident.capacity() {
            return Err(VmError::Internal(format!(
                "process {}: {} resident pages exceed capacity {}",
                self.pid,
                self.resident.len(),
                self.resident.capacity()
            )));
        }
        if self.resident.len() != self.page_table.mapped_count() {
            return Err(VmError::Internal(format!(
                "process {}: {} queued pages but {} mapped entries",
                self.pid,
                self.resident.len(),
                self.page_table.mapped_count()
            )));
        }
        for entry in self.page_table.iter() {
            let Some(frame) = entry.mapping.frame() else {
                continue;
            };
            if !self.resident.contains(entry.page) {
                return Err(VmError::Internal(format!(
                    "process {}: page {} mapped but not queued",
                    self.pid, entry.page
                )));
            }
            if frames.owner_of(frame)? != Some(self.pid) {
                return Err(VmError::Internal(format!(
                    "process {}: page {} maps frame {} it does not own",
                    self.pid, entry.page, frame
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_zero_reserved() {
        assert!(matches!(ProcessId::new(0), Err(VmError::InvalidProcessId(0))));
        assert_eq!(ProcessId::new(7).unwrap().get(), 7);
        assert_eq!(ProcessId::new(7).unwrap().to_string(), "7");
    }

    #[test]
    fn test_new_process() {
        let config = VmConfig::default();
        let process = Process::new(ProcessId::new(1).unwrap(), 200, &config).unwrap();
        assert_eq!(process.page_count(), 50);
        assert_eq!(process.page_fault_count(), 0);
        assert!(process.resident_pages().is_empty());
        assert_eq!(process.page_table().mapped_count(), 0);
    }

    #[test]
    fn test_zero_size_rejected() {
        let config = VmConfig::default();
        assert!(Process::new(ProcessId::new(1).unwrap(), 0, &config).is_err());
    }

    #[test]
    fn test_oversized_process_rejected() {
        let config = VmConfig::default();
        let pid = ProcessId::new(1).unwrap();
        let err = Process::new(pid, usize::MAX, &config).unwrap_err();
        assert!(matches!(err, VmError::InvalidConfig(_)));

        // exactly at the page limit is fine
        let size = MAX_PAGES_PER_PROCESS * config.page_size;
        assert_eq!(Process::new(pid, size, &config).unwrap().page_count(), MAX_PAGES_PER_PROCESS);
        assert!(Process::new(pid, size + 1, &config).is_err());
    }

    #[test]
    fn test_invariants_catch_foreign_frame() {
        let config = VmConfig::default().with_seed(3);
        let mut frames = FrameAllocator::new(&config).unwrap();
        let mut process = Process::new(ProcessId::new(1).unwrap(), 16, &config).unwrap();
        assert!(process.check_invariants(&frames).is_ok());

        // map a frame the process never claimed
        let other = frames.claim_any(ProcessId::new(2).unwrap()).unwrap();
        process.page_table_mut().set_mapping(0, other).unwrap();
        process.resident_mut().admit(0).unwrap();
        assert!(matches!(process.check_invariants(&frames), Err(VmError::Internal(_))));
    }

    #[test]
    fn test_invariants_catch_unqueued_mapping() {
        let config = VmConfig::default().with_seed(3);
        let mut frames = FrameAllocator::new(&config).unwrap();
        let pid = ProcessId::new(1).unwrap();
        let mut process = Process::new(pid, 16, &config).unwrap();

        let frame = frames.claim_any(pid).unwrap();
        process.page_table_mut().set_mapping(1, frame).unwrap();
        assert!(process.check_invariants(&frames).is_err());
    }
}
