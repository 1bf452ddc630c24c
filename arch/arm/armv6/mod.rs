//! ARMv6 short-descriptor backend

mod mmu;

pub use mmu::Armv6Mmu;
