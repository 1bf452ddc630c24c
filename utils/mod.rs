//! Utility functions and helpers
//!
//! This module contains the small leaf utilities the rest of the core
//! builds on: alignment helpers, bit manipulation and the memory
//! barriers the table-walk hardware ordering contract depends on.

pub mod bits;
pub mod log;

// Re-export commonly used utilities
pub use self::bits::is_power_of_two;

/// Utility macros
#[macro_export]
macro_rules! align_down {
    ($addr:expr, $align:expr) => {
        ($addr / $align * $align)
    };
}

#[macro_export]
macro_rules! is_aligned {
    ($addr:expr, $align:expr) => {
        $addr % $align == 0
    };
}

/// Data synchronization barrier
///
/// Drains the CPU's store machinery; every descriptor write issued
/// before this call is visible to the table-walk hardware after it.
/// Callers place this before TLB invalidation and before enabling
/// translation for the first time.
#[inline]
pub fn dsb() {
    #[cfg(target_arch = "arm")]
    unsafe {
        core::arch::asm!("dsb", options(nostack, preserves_flags))
    };
}

/// Instruction synchronization barrier
///
/// Flushes the pipeline; required after enabling translation so no
/// prefetched instruction executes under the stale address map.
#[inline]
pub fn isb() {
    #[cfg(target_arch = "arm")]
    unsafe {
        core::arch::asm!("isb", options(nostack, preserves_flags))
    };
}
