//! Corten - an early-boot memory-management core for ARM kernels
//!
//! This is the main library for the corten kernel core, providing the
//! page-table construction pipeline that takes an ARMv6/ARMv7 CPU from
//! reset (MMU off, physical addressing) into a mapped higher-half
//! virtual-memory environment.
//!
//! The crate is layered leaf-first:
//! - [`utils`] - bit/alignment helpers, barriers, the early log sink
//! - [`mm`] - regions, the generic MMU entry model and facade
//! - [`arch`] - the ARMv6/ARMv7 short-descriptor backends
//! - [`boot`] - the one-shot pre-enable and post-enable mappers

#![cfg_attr(not(test), no_std)]

// Core modules
#[macro_use]
pub mod utils;
pub mod config;

// Memory model and facade
pub mod mm;

// Architecture-specific code
pub mod arch;

// Boot-time mappers
pub mod boot;

// Re-export key types for convenience
pub use mm::mmu::{AccessClass, AddressSpaceSplit, EntryFlags, EntryKind, Mmu, MmuBackend, MmuEntry};
pub use mm::region::{Region, ReservedRegion, VirtRegion};

/// Corten version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Native machine word of the target.
///
/// Addresses, sizes and raw descriptors are all `Word`-sized. The ARM
/// short-descriptor targets are 32-bit; a 64-bit port re-parametrizes
/// this single alias.
pub type Word = u32;

/// Common error type for corten
///
/// All failures in this crate are logical (bad arguments, wrong MMU
/// state, unsupported encoding); hardware register access itself cannot
/// fail at this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The MMU is already enabled
    AlreadyEnabled,
    /// The MMU is not enabled
    NotEnabled,
    /// Backend state has not been captured yet
    NotInitialized,
    /// The entry kind is not implementable on this architecture
    NotSupported,
    /// No covering directory entry exists for a table-level write
    NotFound,
    /// Invalid argument
    InvalidArgument,
    /// Address violates a required alignment
    Unaligned,
    /// A reserved region is too small for the tables it must hold
    InsufficientMemory,
    /// The requested address-space split is not supported
    UnsupportedSplit,
    /// The facade has no page-directory bases recorded
    NoPageDirectories,
}

/// Result type alias
pub type Result<T> = core::result::Result<T, Error>;

// Panic handler for the bare-metal target. Fatal boot failures end up
// here; there is nothing left to hand control to, so halt for good.
#[cfg(all(target_arch = "arm", not(test)))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    log::error!("kernel panic: {}", info);

    loop {
        unsafe { core::arch::asm!("wfe", options(nostack, nomem)) };
    }
}
