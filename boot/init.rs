//! Phase B: post-enable kernel table construction
//!
//! Runs through the high-half alias Phase A established. Re-captures
//! hardware state instead of trusting boot-time assumptions, builds
//! the final small-page kernel tables inside the reserved table region
//! with `create_new_entry` (the live directory is untouched while the
//! tables are filled), then links every kernel-half directory slot to
//! its table segment and flushes the TLB once.

use crate::arch::arm::coproc::SysRegs;
use crate::arch::ArchMmu;
use crate::boot::meta::BootMeta;
use crate::config::{DIRECTORY_ENTRIES, SECTION_SHIFT, TABLE_SIZE};
use crate::mm::layout::MemoryLayout;
use crate::mm::mmu::{
    AccessClass, AddressSpaceSplit, EntryFlags, EntryKind, Mmu, MmuBackend, MmuEntry, TableSpace,
};
use crate::mm::phys::PhysAccess;
use crate::mm::region::{Region, VirtRegion};
use crate::utils;
use crate::{Error, Result, Word};

/// Regions queued for small-page mapping; kernel image and bss, early
/// init alias, stack, both directories and the table region itself.
const MAX_BOOT_MAPPINGS: usize = 8;

/// What Phase B hands to the kernel's main initialization.
pub struct BootHandoff<R: SysRegs, P: PhysAccess> {
    /// The facade, wired to the live backend with both directory bases
    /// recorded.
    pub mmu: Mmu<ArchMmu<R, P>>,
    /// Discovered physical memory extent
    pub memory: Region,
    /// Initrd extent, if the boot loader supplied one
    pub initrd: Option<Region>,
    /// Opaque machine identifier
    pub machine_id: Word,
    /// Delta the shim adds to the stack pointer if it is still low
    pub stack_delta: Word,
}

/// Build and install the final kernel page tables.
///
/// Fatal failures (no memory metadata, kernel outside discovered
/// memory, undersized reservations, kernel mapping failure) return the
/// error for the caller's panic path; auxiliary regions that fail to
/// map are logged and left to fault at first use.
pub fn init_kernel_tables<R: SysRegs, P: PhysAccess, M: BootMeta>(
    mut backend: ArchMmu<R, P>,
    layout: &MemoryLayout,
    meta: &M,
) -> Result<BootHandoff<R, P>> {
    backend.capture_state()?;
    let split = backend.split();

    backend.phys_mut().zero(&layout.kernel_bss.phys());

    let memory = meta.phys_mem_region()?;
    let machine_id = meta.machine_id();
    let initrd = match meta.initrd_region() {
        Ok(region) if !region.is_empty() => Some(region),
        Ok(_) => {
            log::warn!("initrd reported with zero size, ignoring");
            None
        }
        Err(Error::NotFound) => None,
        Err(err) => {
            log::warn!("initrd lookup failed ({:?}), ignoring", err);
            None
        }
    };

    if memory.size <= layout.kernel_phys().size + layout.page_tables.phys.size {
        log::error!(
            "memory region of {} bytes cannot hold kernel and page tables",
            memory.size
        );
        return Err(Error::InsufficientMemory);
    }

    // the kernel image must be inside memory we actually own
    if !memory.contains(&layout.kernel_phys()) {
        log::error!(
            "kernel {:#010x}+{:#x} outside discovered memory {:#010x}+{:#x}",
            layout.kernel_phys().base,
            layout.kernel_phys().size,
            memory.base,
            memory.size
        );
        return Err(Error::InsufficientMemory);
    }

    if !memory.contains(&layout.early) {
        log::warn!("early init region not within discovered memory");
    }
    if !memory.contains(&layout.page_tables.phys) {
        log::warn!("page-table reservation not within discovered memory");
    }
    if let Some(rd) = initrd {
        if layout.page_tables.phys.overlaps(&rd) {
            log::warn!(
                "page-table reservation overlaps initrd at {:#010x}+{:#x}",
                rd.base,
                rd.size
            );
        }
    }

    // the reservation must hold one segment per section that
    // link_directory and table_segment will touch; under NoSplit that
    // is the entire 4 GiB space, not the (empty) TTBR1-owned share
    if layout.kernel_pgd.phys.size < backend.required_directory_size(TableSpace::Kernel)
        || layout.page_tables.phys.size < linked_section_count(split) * TABLE_SIZE
    {
        return Err(Error::InsufficientMemory);
    }

    // a leftover word that decodes as a valid descriptor is silent
    // corruption; every unused slot must read invalid
    backend.phys_mut().zero(&layout.page_tables.phys);

    let mut mappings: heapless::Vec<(&'static str, VirtRegion, bool), MAX_BOOT_MAPPINGS> =
        heapless::Vec::new();

    push_mapping(&mut mappings, "kernel", layout.kernel, true)?;
    push_mapping(&mut mappings, "kernel bss", layout.kernel_bss, true)?;
    push_mapping(
        &mut mappings,
        "early init",
        VirtRegion::new(layout.early.base, layout.phys_to_virt(layout.early.base), layout.early.size),
        false,
    )?;
    push_mapping(&mut mappings, "stack", layout.stack, false)?;
    push_mapping(
        &mut mappings,
        "kernel page directory",
        VirtRegion::new(layout.kernel_pgd.phys.base, layout.kernel_pgd.virt_base, layout.kernel_pgd.phys.size),
        false,
    )?;
    if layout.user_pgd.phys != layout.kernel_pgd.phys {
        push_mapping(
            &mut mappings,
            "user page directory",
            VirtRegion::new(layout.user_pgd.phys.base, layout.user_pgd.virt_base, layout.user_pgd.phys.size),
            false,
        )?;
    }
    push_mapping(
        &mut mappings,
        "page tables",
        VirtRegion::new(layout.page_tables.phys.base, layout.page_tables.virt_base, layout.page_tables.phys.size),
        false,
    )?;

    for (name, region, fatal) in &mappings {
        if let Err(err) = map_region_pages(&mut backend, layout, split, region) {
            if *fatal {
                log::error!("mapping {} failed ({:?}), cannot continue", name, err);
                return Err(err);
            }

            log::warn!("{} left unmapped ({:?}), will fault at first use", name, err);
        }
    }

    // tables must be visible to the walk hardware before the live
    // directory points at them
    utils::dsb();
    link_directory(&mut backend, layout, split)?;
    utils::dsb();
    backend.invalidate();

    let mut mmu = Mmu::resume(backend, split);
    mmu.set_page_directories(layout.kernel_pgd.phys.base, layout.user_pgd.phys.base, false)?;
    mmu.invalidate();

    log::info!(
        "kernel tables live: {} regions paged, directory {:#010x}",
        mappings.len(),
        layout.kernel_pgd.phys.base
    );

    Ok(BootHandoff { mmu, memory, initrd, machine_id, stack_delta: layout.virt_base })
}

fn push_mapping(
    mappings: &mut heapless::Vec<(&'static str, VirtRegion, bool), MAX_BOOT_MAPPINGS>,
    name: &'static str,
    region: VirtRegion,
    fatal: bool,
) -> Result<()> {
    if region.is_empty() {
        return Ok(());
    }

    mappings.push((name, region, fatal)).map_err(|_| Error::InsufficientMemory)
}

/// One small-page entry per page of `region`, written into the table
/// segment of the reserved region that covers its virtual address.
fn map_region_pages<R: SysRegs, P: PhysAccess>(
    backend: &mut ArchMmu<R, P>,
    layout: &MemoryLayout,
    split: AddressSpaceSplit,
    region: &VirtRegion,
) -> Result<()> {
    for n in 0..region.page_count() {
        let virt = region.virt_page(n);
        let entry = MmuEntry::new(
            region.phys_page(n),
            virt,
            EntryKind::TableEntry,
            AccessClass::Kernel,
            EntryFlags::CACHED | EntryFlags::BUFFERED,
        );

        backend.create_new_entry(table_segment(layout, split, virt)?, &entry)?;
    }

    Ok(())
}

/// Sections Phase B rebuilds with small-page tables: everything from
/// the split threshold up, so the whole space when there is no split.
fn linked_section_count(split: AddressSpaceSplit) -> Word {
    DIRECTORY_ENTRIES as Word - (split.high_threshold() >> SECTION_SHIFT)
}

/// Physical base of the 1 KiB second-level segment covering `virt`.
///
/// The reserved table region holds one segment per rebuilt section,
/// indexed upward from the split threshold.
fn table_segment(layout: &MemoryLayout, split: AddressSpaceSplit, virt: Word) -> Result<Word> {
    let threshold = split.high_threshold();

    if split != AddressSpaceSplit::NoSplit && virt < threshold {
        return Err(Error::InvalidArgument);
    }

    let rel = (virt >> SECTION_SHIFT) - (threshold >> SECTION_SHIFT);
    Ok(layout.page_tables.phys.base + rel * TABLE_SIZE)
}

/// Replace the kernel half's directory slots with table pointers into
/// the reserved region, one per section.
fn link_directory<R: SysRegs, P: PhysAccess>(
    backend: &mut ArchMmu<R, P>,
    layout: &MemoryLayout,
    split: AddressSpaceSplit,
) -> Result<()> {
    let first = split.high_threshold() >> SECTION_SHIFT;

    for i in 0..linked_section_count(split) {
        let entry = MmuEntry::new(
            layout.page_tables.phys.base + i * TABLE_SIZE,
            (first + i) << SECTION_SHIFT,
            EntryKind::DirectoryTable,
            AccessClass::Kernel,
            EntryFlags::empty(),
        );

        backend.create_entry(&entry)?;
    }

    Ok(())
}
