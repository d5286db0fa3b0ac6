pub mod config;
pub mod constants;
pub mod error;
pub mod fault;
pub mod io;
pub mod logging;
pub mod memory;
pub mod page_table;
pub mod process;
pub mod queue;
pub mod replay;
pub mod translation;

// Re-export commonly used items for convenience
pub use config::VmConfig;
pub use error::{Result, VmError};
pub use fault::{Access, FaultHandler};
pub use memory::{Frame, FrameAllocator, FrameId};
pub use page_table::{Mapping, PageTable, PageTableEntry};
pub use process::{Process, ProcessId};
pub use queue::ReplacementQueue;
pub use replay::{ProcessReport, Replayer};
pub use translation::{VirtualAddress, translate};
