// physical pool: 64 frames, only the first quarter is ever offered to fresh claims
pub const POOL_SIZE: usize = 64;
pub const CANDIDATE_FRAMES: usize = POOL_SIZE / 4;

// upper bounds on dense allocations: frames in the pool, pages per process
pub const MAX_POOL_SIZE: usize = 1 << 20;
pub const MAX_PAGES_PER_PROCESS: usize = 1 << 20;

// page size in bytes (a frame holds exactly one page)
pub const PAGE_SIZE: usize = 4;

// max resident pages per process before FIFO eviction kicks in
pub const RESIDENT_CAPACITY: usize = 4;

// random probes attempted by claim_any before the linear fallback scan
pub const PROBE_LIMIT: usize = 32;

// process id 0 marks a free frame and is never handed to a process
pub const RESERVED_PID: u32 = 0;

// access trace replayed by the built-in demo
pub const DEMO_TRACE: [usize; 15] = [7, 0, 1, 2, 0, 3, 0, 4, 2, 3, 0, 3, 1, 2, 0];
pub const DEMO_PROCESSES: [(u32, usize); 2] = [(1, 200), (2, 250)];
