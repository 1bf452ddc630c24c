//! Memory region descriptions
//!
//! Value types for contiguous physical extents, physical/virtual region
//! pairs and reserved (page-table) regions, plus the containment and
//! overlap predicates the boot-time sanity checks are built on.

use crate::config::{PAGE_SHIFT, PAGE_SIZE};
use crate::Word;

/// A contiguous physical memory region
///
/// `size == 0` is the empty/unset sentinel; empty regions contain
/// nothing and overlap nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    /// Base address of the region
    pub base: Word,
    /// Size in bytes
    pub size: Word,
}

impl Region {
    pub const fn new(base: Word, size: Word) -> Self {
        Self { base, size }
    }

    pub const fn empty() -> Self {
        Self { base: 0, size: 0 }
    }

    /// First address past the region.
    ///
    /// Wraps to 0 for a region ending exactly at the top of the address
    /// space; the containment and overlap predicates therefore compare
    /// offsets instead of calling this.
    pub const fn end(&self) -> Word {
        self.base.wrapping_add(self.size)
    }

    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of small pages needed to back the region (rounded up)
    pub const fn page_count(&self) -> Word {
        self.size.div_ceil(PAGE_SIZE)
    }

    pub const fn is_page_aligned(&self) -> bool {
        (self.base & (PAGE_SIZE - 1)) == 0
    }

    /// True iff `addr` lies inside the region
    pub const fn contains_addr(&self, addr: Word) -> bool {
        !self.is_empty() && addr >= self.base && addr - self.base < self.size
    }

    /// True iff `inner` lies entirely within `self`.
    ///
    /// Empty regions contain nothing and are contained by nothing, so
    /// absent inputs never fault and never pass the check. A region
    /// ending exactly at the top of the address space contains its
    /// interior even though its `end()` wraps.
    pub const fn contains(&self, inner: &Region) -> bool {
        if self.is_empty() || inner.is_empty() || inner.base < self.base {
            return false;
        }

        let off = inner.base - self.base;
        off <= self.size && inner.size <= self.size - off
    }

    /// True iff the two regions share at least one byte.
    ///
    /// Defined independently of containment: `a` and `b` overlap iff
    /// `a.base < b.end && b.base < a.end` (computed without forming the
    /// possibly-wrapping ends). In particular a region that starts
    /// inside `self` but extends past its end still overlaps.
    pub const fn overlaps(&self, other: &Region) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }

        if self.base <= other.base {
            other.base - self.base < self.size
        } else {
            self.base - other.base < other.size
        }
    }
}

/// A physical region paired with the virtual address it maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VirtRegion {
    /// Physical base of the backing memory
    pub phys_base: Word,
    /// Virtual base the memory is (or will be) visible at
    pub virt_base: Word,
    /// Size in bytes
    pub size: Word,
}

impl VirtRegion {
    pub const fn new(phys_base: Word, virt_base: Word, size: Word) -> Self {
        Self { phys_base, virt_base, size }
    }

    pub const fn phys(&self) -> Region {
        Region::new(self.phys_base, self.size)
    }

    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub const fn page_count(&self) -> Word {
        self.phys().page_count()
    }

    /// Physical address backing the `n`-th page of the region
    pub const fn phys_page(&self, n: Word) -> Word {
        self.phys_base + (n << PAGE_SHIFT)
    }

    /// Virtual address of the `n`-th page of the region
    pub const fn virt_page(&self, n: Word) -> Word {
        self.virt_base + (n << PAGE_SHIFT)
    }
}

/// Memory set aside for page tables
///
/// Once the kernel runs virtually it has no 1:1 view of physical
/// memory; this pairs the physical extent of the reservation with the
/// virtual base the kernel manipulates it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReservedRegion {
    /// Virtual base of the reservation
    pub virt_base: Word,
    /// Physical extent of the reservation
    pub phys: Region,
}

impl ReservedRegion {
    pub const fn new(virt_base: Word, phys: Region) -> Self {
        Self { virt_base, phys }
    }

    pub const fn is_empty(&self) -> bool {
        self.phys.is_empty()
    }

    /// Translate an offset into the reservation to its physical address
    pub const fn phys_at(&self, offset: Word) -> Word {
        self.phys.base + offset
    }

    /// Translate an offset into the reservation to its virtual address
    pub const fn virt_at(&self, offset: Word) -> Word {
        self.virt_base + offset
    }
}
