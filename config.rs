//! Kernel memory-layout configuration
//!
//! Compile-time constants describing the address-space geometry this
//! kernel is linked for. The linker script and the boot shim agree on
//! these values; nothing here is discovered at runtime.

use crate::mm::mmu::AddressSpaceSplit;
use crate::Word;

/// Virtual base of the higher-half kernel.
///
/// Power-of-two aligned so the early `phys | KERNEL_VIRT_BASE` aliasing
/// identity holds (see [`crate::mm::layout`]).
pub const KERNEL_VIRT_BASE: Word = 0x8000_0000;

// the OR-aliasing trick in mm::layout requires a power of two
const _: () = assert!(crate::utils::bits::is_power_of_two(KERNEL_VIRT_BASE));

/// Address-space split the kernel is linked for (kernel at and above 2 GiB).
pub const DEFAULT_SPLIT: AddressSpaceSplit = AddressSpaceSplit::Split2G2G;

/// Small-page geometry
pub const PAGE_SIZE: Word = 0x1000;
pub const PAGE_SHIFT: u32 = 12;

/// One first-level descriptor covers a 1 MiB section.
pub const SECTION_SIZE: Word = 0x10_0000;
pub const SECTION_SHIFT: u32 = 20;
pub const SECTION_MASK: Word = SECTION_SIZE - 1;

/// First-level descriptors are one word each; a full 4 GiB directory
/// holds 4096 of them (16 KiB).
pub const DIRECTORY_ENTRIES: usize = 4096;
pub const DIRECTORY_SIZE: Word = (DIRECTORY_ENTRIES as Word) * 4;

/// A second-level table segment holds 256 word-sized entries (1 KiB),
/// subdividing one section into 4 KiB small pages.
pub const TABLE_ENTRIES: usize = 256;
pub const TABLE_SIZE: Word = (TABLE_ENTRIES as Word) * 4;

/// Domain assignment convention of this kernel
pub mod domain {
    /// User mappings live in domain 0
    pub const USER: u8 = 0;
    /// Kernel and device mappings live in domain 1
    pub const KERNEL: u8 = 1;
}
