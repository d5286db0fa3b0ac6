//! Error types for the paging simulator

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VmError>;

#[derive(Error, Debug)]
pub enum VmError {
    #[error("{what} index {index} out of range (limit {limit})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        limit: usize,
    },

    #[error("replacement queue full (capacity {capacity}), evict before admitting")]
    CapacityExceeded { capacity: usize },

    #[error("replacement queue is empty")]
    Empty,

    #[error("no free frame among the first {candidates} frames")]
    ResourceExhausted { candidates: usize },

    #[error("physical address of frame {frame} + offset {offset} overflows")]
    AddressOverflow { frame: usize, offset: usize },

    #[error("virtual page {page} is not resident")]
    NotResident { page: usize },

    #[error("process id {0} is reserved")]
    InvalidProcessId(u32),

    #[error("process {0} already exists")]
    DuplicateProcess(u32),

    #[error("unknown process {0}")]
    UnknownProcess(u32),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("internal consistency fault: {0}")]
    Internal(String),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VmError {
    /// Errors a driver can report and carry on from. Everything else means an
    /// invariant was broken or the input could not be used at all.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            VmError::OutOfRange { .. }
                | VmError::AddressOverflow { .. }
                | VmError::ResourceExhausted { .. }
                | VmError::NotResident { .. }
                | VmError::UnknownProcess(_)
        )
    }
}
