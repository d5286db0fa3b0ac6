//! Page fault handling with FIFO replacement.
//!
//! Every access to a virtual page goes through [`FaultHandler::access`]. A
//! mapped page is a hit and changes nothing. An unmapped page is a fault:
//! while the process is below its resident-set capacity a fresh frame is
//! claimed from the pool, otherwise the oldest resident page gives up its
//! frame to the faulting page.

use log::{debug, trace};

use crate::config::VmConfig;
use crate::error::{Result, VmError};
use crate::memory::{FrameAllocator, FrameId};
use crate::page_table::Mapping;
use crate::process::Process;

/// Outcome of one page access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Page was already resident
    Hit(FrameId),
    /// Page faulted in; `evicted` is the page that gave up its frame, if any
    Fault { frame: FrameId, evicted: Option<usize> },
}

impl Access {
    /// Frame the page ended up in
    #[inline]
    pub fn frame(&self) -> FrameId {
        match *self {
            Access::Hit(frame) | Access::Fault { frame, .. } => frame,
        }
    }

    /// True when the access took a page fault
    #[inline]
    pub fn is_fault(&self) -> bool {
        matches!(self, Access::Fault { .. })
    }
}

/// Services page accesses against one shared configuration
pub struct FaultHandler {
    config: VmConfig,
}

impl FaultHandler {
    /// Validate `config` and build a handler around it
    pub fn new(config: VmConfig) -> Result<Self> {
        config.validate()?;
        Ok(FaultHandler { config })
    }

    /// Configuration this handler was built with
    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Page size in bytes
    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    /// Make `page` resident in `process`, faulting it in if needed
    pub fn access(
        &self,
        process: &mut Process,
        page: usize,
        frames: &mut FrameAllocator,
    ) -> Result<Access> {
        // a bad page index is the caller's problem and is not a fault
        let mapping = process.page_table().entry_at(page)?.mapping;

        if let Mapping::Mapped(frame) = mapping {
            trace!("process {}: page {} hit in frame {}", process.pid(), page, frame);
            return Ok(Access::Hit(frame));
        }

        process.record_fault();

        if process.resident().is_full() {
            self.replace_oldest(process, page)
        } else {
            let frame = frames.claim_any(process.pid())?;
            process.page_table_mut().set_mapping(page, frame)?;
            admit(process, page)?;
            debug!(
                "process {}: page fault on {}, mapped to fresh frame {}",
                process.pid(),
                page,
                frame
            );
            Ok(Access::Fault { frame, evicted: None })
        }
    }

    /// Move the frame of the longest-resident page over to `page`. No frame
    /// is claimed or released, so pool ownership does not change.
    fn replace_oldest(&self, process: &mut Process, page: usize) -> Result<Access> {
        debug_assert!(!process.resident().is_empty(), "full replacement queue is empty");
        let victim = process
            .resident_mut()
            .evict_oldest()
            .map_err(|err| internal(process, err))?;

        let frame = process.page_table_mut().clear_mapping(victim)?.ok_or_else(|| {
            VmError::Internal(format!(
                "process {}: queued page {} has no frame",
                process.pid(),
                victim
            ))
        })?;
        process.page_table_mut().set_mapping(page, frame)?;
        admit(process, page)?;

        debug!(
            "process {}: page fault on {}, evicted page {} from frame {}",
            process.pid(),
            page,
            victim,
            frame
        );
        Ok(Access::Fault { frame, evicted: Some(victim) })
    }
}

// Empty or CapacityExceeded here means the queue and page table disagree
fn internal(process: &Process, err: VmError) -> VmError {
    VmError::Internal(format!("process {}: {}", process.pid(), err))
}

fn admit(process: &mut Process, page: usize) -> Result<()> {
    debug_assert!(!process.resident().is_full(), "admit into a full replacement queue");
    process
        .resident_mut()
        .admit(page)
        .map_err(|err| internal(process, err))
}
