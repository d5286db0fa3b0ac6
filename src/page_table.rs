use crate::error::{Result, VmError};
use crate::memory::FrameId;

/// Where a virtual page currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mapping {
    #[default]
    Unmapped,
    Mapped(FrameId),
}

impl Mapping {
    /// Frame number when mapped
    #[inline]
    pub fn frame(&self) -> Option<FrameId> {
        match self {
            Mapping::Mapped(frame) => Some(*frame),
            Mapping::Unmapped => None,
        }
    }
}

impl std::fmt::Display for Mapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mapping::Mapped(frame) => write!(f, "frame {}", frame),
            Mapping::Unmapped => write!(f, "unmapped"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTableEntry {
    pub page: usize,
    pub mapping: Mapping,
}

impl PageTableEntry {
    #[inline]
    pub fn is_mapped(&self) -> bool {
        matches!(self.mapping, Mapping::Mapped(_))
    }
}

/// Single-level page table, one entry per virtual page of the process
#[derive(Debug, Clone)]
pub struct PageTable {
    entries: Vec<PageTableEntry>,
}

impl PageTable {
    /// Table for a process of `process_size` bytes; a partial last page
    /// still gets an entry
    pub fn new(process_size: usize, page_size: usize) -> Self {
        let pages = process_size.div_ceil(page_size);
        let entries = (0..pages)
            .map(|page| PageTableEntry { page, mapping: Mapping::Unmapped })
            .collect();
        PageTable { entries }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True only for a zero-page table
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for `page`, `OutOfRange` past the end
    pub fn entry_at(&self, page: usize) -> Result<&PageTableEntry> {
        self.entries.get(page).ok_or(VmError::OutOfRange {
            what: "virtual page",
            index: page,
            limit: self.entries.len(),
        })
    }

    fn entry_mut(&mut self, page: usize) -> Result<&mut PageTableEntry> {
        let limit = self.entries.len();
        self.entries.get_mut(page).ok_or(VmError::OutOfRange {
            what: "virtual page",
            index: page,
            limit,
        })
    }

    #[inline]
    pub fn is_mapped(&self, entry: &PageTableEntry) -> bool {
        entry.is_mapped()
    }

    /// Frame backing `page`, if mapped
    pub fn frame_of(&self, page: usize) -> Result<Option<FrameId>> {
        Ok(self.entry_at(page)?.mapping.frame())
    }

    /// Point `page` at `frame`
    pub fn set_mapping(&mut self, page: usize, frame: FrameId) -> Result<()> {
        self.entry_mut(page)?.mapping = Mapping::Mapped(frame);
        Ok(())
    }

    /// Unmap a page, returning the frame it held
    pub fn clear_mapping(&mut self, page: usize) -> Result<Option<FrameId>> {
        let entry = self.entry_mut(page)?;
        let previous = entry.mapping.frame();
        entry.mapping = Mapping::Unmapped;
        Ok(previous)
    }

    /// Number of mapped entries
    pub fn mapped_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_mapped()).count()
    }

    /// Entries in page order
    pub fn iter(&self) -> impl Iterator<Item = &PageTableEntry> {
        self.entries.iter()
    }

    /// (page, mapping) pairs for every entry, for display
    pub fn snapshot(&self) -> Vec<(usize, Mapping)> {
        self.entries.iter().map(|e| (e.page, e.mapping)).collect()
    }
}
