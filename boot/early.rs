//! Phase A: pre-enable boot mapping
//!
//! Runs with the MMU off, every pointer a physical address. Writes
//! identity sections covering the executing boot image plus a
//! high-half alias of the same span into the reserved page
//! directories, programs split, domains and table bases, then turns
//! translation on.
//!
//! Prefetch safety: the identity mapping of the code that is executing
//! right now is written before anything else, and every descriptor is
//! written (and synchronized) before `enable()`. After enable the next
//! instruction fetch walks the tables, so there is no window in which
//! a fetch can miss.

use crate::arch::arm::coproc::SysRegs;
use crate::arch::arm::{DomainAccess, DomainControl};
use crate::arch::ArchMmu;
use crate::config::{domain, SECTION_SIZE};
use crate::mm::layout::MemoryLayout;
use crate::mm::mmu::{
    AccessClass, AddressSpaceSplit, EntryFlags, EntryKind, MmuBackend, MmuEntry, TableSpace,
};
use crate::mm::phys::PhysAccess;
use crate::mm::region::Region;
use crate::utils;
use crate::{Error, Result, Word};

/// What Phase A passes forward to the next stage.
pub struct EarlyHandoff {
    /// Physical span that is identity mapped (early init through the
    /// end of the kernel image)
    pub boot_image: Region,
    /// Delta the boot shim adds to the stack pointer so the same
    /// physical stack is addressed through its high-half alias
    pub stack_delta: Word,
}

/// Build the minimal boot mapping and enable the MMU.
///
/// On any error the MMU is left off; nothing here partially enables
/// translation.
pub fn enable_boot_mapping<R: SysRegs, P: PhysAccess>(
    mmu: &mut ArchMmu<R, P>,
    layout: &MemoryLayout,
    split: AddressSpaceSplit,
) -> Result<EarlyHandoff> {
    if mmu.is_enabled() {
        return Err(Error::AlreadyEnabled);
    }

    // stale memory must never decode as a valid descriptor
    mmu.phys_mut().zero(&layout.early_bss);
    mmu.phys_mut().zero(&layout.kernel_pgd.phys);
    if layout.user_pgd.phys != layout.kernel_pgd.phys {
        mmu.phys_mut().zero(&layout.user_pgd.phys);
    }

    mmu.set_split(split)?;

    if layout.kernel_pgd.phys.size < mmu.required_directory_size(TableSpace::Kernel)
        || layout.user_pgd.phys.size < mmu.required_directory_size(TableSpace::User)
    {
        return Err(Error::InsufficientMemory);
    }

    mmu.set_domain(domain::USER, DomainAccess::Client)?;
    mmu.set_domain(domain::KERNEL, DomainAccess::Client)?;

    let image = layout.boot_image_phys();

    // identity sections first: the instruction stream must be able to
    // walk its own physical location the moment translation turns on
    map_sections(mmu, layout, split, &image, 0)?;
    map_sections(mmu, layout, split, &image, layout.virt_base)?;

    mmu.set_user_page_directory(layout.user_pgd.phys.base, 0)?;
    mmu.set_kernel_page_directory(layout.kernel_pgd.phys.base, 0)?;

    utils::dsb();
    mmu.enable()?;

    log::info!(
        "boot mapping live, image {:#010x}..{:#010x} aliased at {:#010x}",
        image.base,
        image.end(),
        layout.phys_to_virt(image.base)
    );

    Ok(EarlyHandoff { boot_image: image, stack_delta: layout.virt_base })
}

/// One identity (or offset-alias) section per MiB of `region`, written
/// into whichever reserved directory covers the target virtual address.
fn map_sections<R: SysRegs, P: PhysAccess>(
    mmu: &mut ArchMmu<R, P>,
    layout: &MemoryLayout,
    split: AddressSpaceSplit,
    region: &Region,
    offset: Word,
) -> Result<()> {
    let mut sect = align_down!(region.base, SECTION_SIZE);

    while sect < region.end() {
        let virt = sect | offset;
        let entry = MmuEntry::new(
            sect,
            virt,
            EntryKind::DirectoryEntry,
            AccessClass::Kernel,
            EntryFlags::CACHED | EntryFlags::BUFFERED,
        );

        mmu.create_new_entry(directory_for(layout, split, virt), &entry)?;
        sect += SECTION_SIZE;
    }

    Ok(())
}

/// Physical base of the reserved directory the walk hardware will
/// consult for `virt` once the split is live.
fn directory_for(layout: &MemoryLayout, split: AddressSpaceSplit, virt: Word) -> Word {
    if split != AddressSpaceSplit::NoSplit && split.is_high_memory(virt) {
        layout.kernel_pgd.phys.base
    } else {
        layout.user_pgd.phys.base
    }
}
