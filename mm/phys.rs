//! Physical memory access capability
//!
//! Before the MMU is on, every pointer the boot code forms is a
//! physical address; afterwards, a physical address is only reachable
//! through whatever alias maps it. Raw descriptor memory is therefore
//! never dereferenced directly - all reads and writes of page-directory
//! and page-table words go through [`PhysAccess`], which makes the
//! "am I allowed to touch this physical address right now" question an
//! explicit capability instead of an implicit cast.

use crate::mm::region::Region;
use crate::Word;

/// Word-granular access to physical memory.
///
/// Descriptor stores must be single aligned word writes (the table-walk
/// hardware may observe them at any instant, so a descriptor is never
/// written in parts).
pub trait PhysAccess {
    /// Read the word at physical address `addr` (must be word-aligned).
    fn read_word(&self, addr: Word) -> Word;

    /// Write the word at physical address `addr` (must be word-aligned).
    fn write_word(&mut self, addr: Word, value: Word);

    /// Zero a word-aligned region; used to clear bss and reserved table
    /// memory so stale garbage never decodes as a valid descriptor.
    fn zero(&mut self, region: &Region) {
        let words = region.size / 4;
        for i in 0..words {
            self.write_word(region.base + i * 4, 0);
        }
    }
}

/// Direct physical access through the current address map.
///
/// Valid while physical addresses are reachable as-is: before the MMU
/// is enabled, or for memory covered by an identity mapping.
pub struct DirectPhys {
    // translation applied before dereferencing; zero pre-enable, the
    // kernel virtual offset once only the high alias maps the tables
    offset: Word,
}

impl DirectPhys {
    /// Create a capability that dereferences physical addresses as-is.
    ///
    /// # Safety
    /// Caller asserts that physical addresses are currently reachable
    /// untranslated (MMU off, or identity-mapped).
    pub const unsafe fn identity() -> Self {
        Self { offset: 0 }
    }

    /// Create a capability that reaches physical memory through a fixed
    /// alias at `phys | offset`.
    ///
    /// # Safety
    /// Caller asserts the alias mapping covers every address that will
    /// be accessed.
    pub const unsafe fn aliased(offset: Word) -> Self {
        Self { offset }
    }
}

impl PhysAccess for DirectPhys {
    fn read_word(&self, addr: Word) -> Word {
        let ptr = (addr | self.offset) as usize as *const Word;
        unsafe { core::ptr::read_volatile(ptr) }
    }

    fn write_word(&mut self, addr: Word, value: Word) {
        let ptr = (addr | self.offset) as usize as *mut Word;
        unsafe { core::ptr::write_volatile(ptr, value) }
    }
}

/// Sparse fake physical memory for host tests.
#[cfg(test)]
pub struct FakePhys {
    mem: std::collections::HashMap<Word, Word>,
}

#[cfg(test)]
impl FakePhys {
    pub fn new() -> Self {
        Self { mem: std::collections::HashMap::new() }
    }

    /// Number of non-zero words ever written
    pub fn written_words(&self) -> usize {
        self.mem.values().filter(|v| **v != 0).count()
    }
}

#[cfg(test)]
impl PhysAccess for FakePhys {
    fn read_word(&self, addr: Word) -> Word {
        assert_eq!(addr % 4, 0, "unaligned word read at {addr:#010x}");
        *self.mem.get(&addr).unwrap_or(&0)
    }

    fn write_word(&mut self, addr: Word, value: Word) {
        assert_eq!(addr % 4, 0, "unaligned word write at {addr:#010x}");
        self.mem.insert(addr, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_phys_read_back() {
        let mut mem = FakePhys::new();

        mem.write_word(0x4000, 0xdead_beef);
        assert_eq!(mem.read_word(0x4000), 0xdead_beef);
        assert_eq!(mem.read_word(0x4004), 0);
    }

    #[test]
    fn test_zero_clears_region() {
        let mut mem = FakePhys::new();

        for i in 0..16 {
            mem.write_word(0x8000 + i * 4, 0xffff_ffff);
        }
        mem.zero(&Region::new(0x8000, 64));

        for i in 0..16 {
            assert_eq!(mem.read_word(0x8000 + i * 4), 0);
        }
    }
}
