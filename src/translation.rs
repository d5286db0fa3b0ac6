use crate::error::{Result, VmError};
use crate::fault::FaultHandler;
use crate::memory::{FrameAllocator, FrameId};
use crate::process::Process;

/// A virtual address split into page index and byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualAddress {
    pub page: usize,
    pub offset: usize,
}

impl VirtualAddress {
    /// Pair from explicit parts; the offset is checked at translation time
    pub fn new(page: usize, offset: usize) -> Self {
        VirtualAddress { page, offset }
    }

    /// Split a flat address into (page, offset) for the given page size
    pub fn from_linear(address: usize, page_size: usize) -> Self {
        VirtualAddress {
            page: address / page_size,
            offset: address % page_size,
        }
    }

    /// Flat address of this (page, offset) pair, `None` on overflow
    #[inline]
    pub fn to_linear(&self, page_size: usize) -> Option<usize> {
        self.page.checked_mul(page_size)?.checked_add(self.offset)
    }
}

impl std::fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VA(page={}, offset={})", self.page, self.offset)
    }
}

fn check_offset(va: &VirtualAddress, page_size: usize) -> Result<()> {
    if va.offset >= page_size {
        return Err(VmError::OutOfRange {
            what: "offset",
            index: va.offset,
            limit: page_size,
        });
    }
    Ok(())
}

/// PA = frame * page_size + offset, as an error instead of a wrap
fn physical_address(frame: FrameId, page_size: usize, offset: usize) -> Result<usize> {
    frame
        .checked_mul(page_size)
        .and_then(|base| base.checked_add(offset))
        .ok_or(VmError::AddressOverflow { frame, offset })
}

/// Translate a virtual address to a physical address, faulting the page in
/// first if it is not resident.
///
/// PA = frame * page_size + offset
pub fn translate(
    process: &mut Process,
    va: &VirtualAddress,
    handler: &FaultHandler,
    frames: &mut FrameAllocator,
) -> Result<usize> {
    let page_size = handler.page_size();
    // reject a bad offset before it can cost a fault
    check_offset(va, page_size)?;
    let frame = handler.access(process, va.page, frames)?.frame();
    physical_address(frame, page_size, va.offset)
}

/// Translate without fault handling; an unmapped page is `NotResident`
pub fn translate_resident(process: &Process, va: &VirtualAddress, page_size: usize) -> Result<usize> {
    check_offset(va, page_size)?;
    match process.page_table().frame_of(va.page)? {
        Some(frame) => physical_address(frame, page_size, va.offset),
        None => Err(VmError::NotResident { page: va.page }),
    }
}

/// Translate a batch of flat virtual addresses in order. Each address gets
/// its own result so one bad address does not stop the rest.
pub fn translate_batch(
    process: &mut Process,
    addresses: &[usize],
    handler: &FaultHandler,
    frames: &mut FrameAllocator,
) -> Vec<Result<usize>> {
    let page_size = handler.page_size();
    addresses
        .iter()
        .map(|&address| {
            let va = VirtualAddress::from_linear(address, page_size);
            translate(process, &va, handler, frames)
        })
        .collect()
}
