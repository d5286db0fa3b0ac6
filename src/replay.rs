//! Sequential trace replay.
//!
//! The replayer owns the frame pool and every live process, and feeds each
//! process its trace one access at a time. Processes never run
//! concurrently: one trace finishes before the next begins.

use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use log::{info, warn};

use crate::config::VmConfig;
use crate::error::{Result, VmError};
use crate::fault::{Access, FaultHandler};
use crate::io::Workload;
use crate::memory::FrameAllocator;
use crate::page_table::Mapping;
use crate::process::{Process, ProcessId};
use crate::translation::{self, VirtualAddress};

/// What one trace run did to a process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessReport {
    pub pid: ProcessId,
    /// Accesses attempted in this run
    pub accesses: usize,
    /// Total page faults of the process so far
    pub faults: u64,
    /// Hits in this run
    pub hits: usize,
    /// Pages from the trace that could not be serviced
    pub rejected: Vec<usize>,
    /// Resident set after the run, oldest first
    pub resident: Vec<usize>,
    pub page_table: Vec<(usize, Mapping)>,
}

/// Owns the frame pool and every live process
pub struct Replayer {
    frames: FrameAllocator,
    handler: FaultHandler,
    processes: BTreeMap<ProcessId, Process>,
    delay: Option<Duration>,
}

impl Replayer {
    /// Fresh pool and no processes
    pub fn new(config: VmConfig) -> Result<Self> {
        Ok(Replayer {
            frames: FrameAllocator::new(&config)?,
            handler: FaultHandler::new(config)?,
            processes: BTreeMap::new(),
            delay: None,
        })
    }

    /// Pause between consecutive accesses of a trace
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Create a process with an empty page table; pids must be unique
    pub fn spawn(&mut self, pid: u32, size: usize) -> Result<ProcessId> {
        let process = self.build(pid, size)?;
        Ok(self.install(process))
    }

    fn build(&self, pid: u32, size: usize) -> Result<Process> {
        let pid = ProcessId::new(pid)?;
        if self.processes.contains_key(&pid) {
            return Err(VmError::DuplicateProcess(pid.get()));
        }
        Process::new(pid, size, self.handler.config())
    }

    fn install(&mut self, process: Process) -> ProcessId {
        let pid = process.pid();
        info!(
            "process {} created: {} bytes, {} pages",
            pid,
            process.size(),
            process.page_count()
        );
        self.processes.insert(pid, process);
        pid
    }

    /// Live process by id
    pub fn process(&self, pid: ProcessId) -> Option<&Process> {
        self.processes.get(&pid)
    }

    /// The shared frame pool
    pub fn frames(&self) -> &FrameAllocator {
        &self.frames
    }

    /// One access on behalf of `pid`
    pub fn access(&mut self, pid: ProcessId, page: usize) -> Result<Access> {
        let process = self.processes.get_mut(&pid).ok_or(VmError::UnknownProcess(pid.get()))?;
        self.handler.access(process, page, &mut self.frames)
    }

    /// Translate a virtual address of `pid`, faulting the page in if needed
    pub fn translate(&mut self, pid: ProcessId, va: &VirtualAddress) -> Result<usize> {
        let process = self.processes.get_mut(&pid).ok_or(VmError::UnknownProcess(pid.get()))?;
        translation::translate(process, va, &self.handler, &mut self.frames)
    }

    /// Replay `trace` against one process. Recoverable failures (a page out
    /// of range, an exhausted pool) are logged and recorded in the report;
    /// anything else aborts the run.
    pub fn run(&mut self, pid: ProcessId, trace: &[usize]) -> Result<ProcessReport> {
        let delay = self.delay;
        let process = self.processes.get_mut(&pid).ok_or(VmError::UnknownProcess(pid.get()))?;
        let mut hits = 0;
        let mut rejected = Vec::new();

        for (i, &page) in trace.iter().enumerate() {
            if i > 0 {
                if let Some(delay) = delay {
                    thread::sleep(delay);
                }
            }
            match self.handler.access(process, page, &mut self.frames) {
                Ok(Access::Hit(_)) => hits += 1,
                Ok(Access::Fault { .. }) => {}
                Err(err) if err.is_recoverable() => {
                    warn!("process {}: access to page {} failed: {}", pid, page, err);
                    rejected.push(page);
                }
                Err(err) => return Err(err),
            }
            if cfg!(debug_assertions) {
                process.check_invariants(&self.frames)?;
            }
        }

        info!(
            "process {}: {} accesses, {} page faults total",
            pid,
            trace.len(),
            process.page_fault_count()
        );
        Ok(ProcessReport {
            pid,
            accesses: trace.len(),
            faults: process.page_fault_count(),
            hits,
            rejected,
            resident: process.resident_pages(),
            page_table: process.page_table().snapshot(),
        })
    }

    /// Spawn and replay every process of the workload in order. Processes
    /// keep their frames afterwards.
    ///
    /// Every process is built before the first trace runs, so a bad entry
    /// (reused pid, zero or oversized size) fails the call with nothing
    /// spawned and no frame claimed.
    pub fn run_workload(&mut self, workload: &Workload) -> Result<Vec<ProcessReport>> {
        let mut pending: Vec<(Process, &[usize])> = Vec::with_capacity(workload.processes.len());
        for spec in &workload.processes {
            let process = self.build(spec.pid, spec.size)?;
            if pending.iter().any(|(p, _)| p.pid() == process.pid()) {
                return Err(VmError::DuplicateProcess(spec.pid));
            }
            pending.push((process, spec.trace.as_slice()));
        }

        let mut reports = Vec::with_capacity(pending.len());
        for (process, trace) in pending {
            let pid = self.install(process);
            reports.push(self.run(pid, trace)?);
        }
        Ok(reports)
    }

    /// Destroy a process and release its frames
    pub fn terminate(&mut self, pid: ProcessId) -> Result<usize> {
        let process = self.processes.remove(&pid).ok_or(VmError::UnknownProcess(pid.get()))?;
        let released = process.release(&mut self.frames)?;
        info!("process {} terminated, {} frames released", pid, released);
        Ok(released)
    }

    /// Terminate every live process, returning the total frames released
    pub fn terminate_all(&mut self) -> Result<usize> {
        let pids: Vec<ProcessId> = self.processes.keys().copied().collect();
        let mut released = 0;
        for pid in pids {
            released += self.terminate(pid)?;
        }
        Ok(released)
    }

    /// Live process ids in ascending order
    pub fn process_ids(&self) -> Vec<ProcessId> {
        self.processes.keys().copied().collect()
    }

    /// Check the invariants of every live process
    pub fn check_invariants(&self) -> Result<()> {
        for process in self.processes.values() {
            process.check_invariants(&self.frames)?;
        }
        Ok(())
    }
}
