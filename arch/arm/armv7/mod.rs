//! ARMv7-A short-descriptor backend

mod mmu;

pub use mmu::Armv7Mmu;
