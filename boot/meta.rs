//! Boot metadata collaborator
//!
//! Device-tree and ATAG parsing live outside this crate; whatever
//! parses them supplies the discovered regions through [`BootMeta`].

use crate::mm::region::Region;
use crate::{Error, Result, Word};

/// Memory discovery interface the Phase B mapper consumes.
pub trait BootMeta {
    /// Largest contiguous physical memory region. Boot cannot proceed
    /// without one; an error here is fatal to the caller.
    fn phys_mem_region(&self) -> Result<Region>;

    /// Initrd extent, `NotFound` if the boot loader did not supply one.
    fn initrd_region(&self) -> Result<Region>;

    /// Opaque machine identifier passed through to the kernel proper.
    fn machine_id(&self) -> Word;
}

/// Fixed metadata for boards where the regions are known at build time
/// (and for exercising the boot path in tests).
pub struct StaticMeta {
    pub memory: Region,
    pub initrd: Option<Region>,
    pub machine_id: Word,
}

impl BootMeta for StaticMeta {
    fn phys_mem_region(&self) -> Result<Region> {
        if self.memory.is_empty() {
            Err(Error::NotFound)
        } else {
            Ok(self.memory)
        }
    }

    fn initrd_region(&self) -> Result<Region> {
        self.initrd.ok_or(Error::NotFound)
    }

    fn machine_id(&self) -> Word {
        self.machine_id
    }
}
