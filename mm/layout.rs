//! Linker-derived memory layout
//!
//! The linker script decides where the early-init code, the kernel
//! proper, the stack and the page-directory reservations live. Board
//! code collects those symbols into a [`MemoryLayout`] once and the
//! boot mappers consume it; nothing in this crate reads linker symbols
//! directly, which keeps both phases constructible in host tests.

use crate::mm::region::{Region, ReservedRegion, VirtRegion};
use crate::Word;

/// The kernel's memory layout, as linked.
#[derive(Debug, Clone, Copy)]
pub struct MemoryLayout {
    /// Virtual base of the higher-half kernel (power of two)
    pub virt_base: Word,
    /// Early-init code/data, linked and loaded 1:1 (virt == phys)
    pub early: Region,
    /// Early-init bss, inside `early`
    pub early_bss: Region,
    /// Kernel proper: physical load region and its higher-half alias
    pub kernel: VirtRegion,
    /// Kernel bss, expressed in the higher-half alias
    pub kernel_bss: VirtRegion,
    /// Kernel boot stack
    pub stack: VirtRegion,
    /// Kernel (TTBR1) page directory reservation
    pub kernel_pgd: ReservedRegion,
    /// User (TTBR0) page directory reservation
    pub user_pgd: ReservedRegion,
    /// Reservation the final second-level tables are carved from
    pub page_tables: ReservedRegion,
}

impl MemoryLayout {
    /// Convert a higher-half kernel virtual address to its physical
    /// address.
    ///
    /// Valid only under the early aliasing identity: the kernel is
    /// linked at `phys | virt_base`, `virt_base` is a power of two and
    /// no kernel region straddles it, so stripping the base bit is
    /// exact.
    pub const fn virt_to_phys(&self, addr: Word) -> Word {
        addr & !self.virt_base
    }

    /// Convert a kernel physical address to its higher-half alias.
    pub const fn phys_to_virt(&self, addr: Word) -> Word {
        addr | self.virt_base
    }

    /// Physical extent of the kernel proper
    pub const fn kernel_phys(&self) -> Region {
        self.kernel.phys()
    }

    /// Physical extent covering early init through the end of the
    /// kernel image - the span Phase A must have mapped before enable.
    pub const fn boot_image_phys(&self) -> Region {
        let end = self.kernel.phys().end();
        Region::new(self.early.base, end - self.early.base)
    }
}
