//! Memory model
//!
//! Architecture-neutral memory management: region descriptions, the
//! linker-derived memory layout, the physical-memory access capability
//! and the generic MMU entry model plus its facade.

pub mod layout;
pub mod mmu;
pub mod phys;
pub mod region;

pub use layout::MemoryLayout;
pub use phys::PhysAccess;
pub use region::{Region, ReservedRegion, VirtRegion};
