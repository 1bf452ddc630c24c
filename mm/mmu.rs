//! Generic MMU entry model and facade
//!
//! The architecture-neutral side of the MMU pipeline: the mapping
//! request model ([`MmuEntry`]), the address-space split, the backend
//! contract every architecture revision implements ([`MmuBackend`]) and
//! the thin [`Mmu`] facade the rest of the kernel programs against.

use crate::utils;
use crate::{Error, Result, Word};
use bitflags::bitflags;

/// Access class of a mapping
///
/// Exactly one class per entry; the class determines both the hardware
/// access-permission bits and the domain the entry is filed under
/// (user classes in the user domain, kernel and device classes in the
/// kernel domain).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessClass {
    /// kernel rw, user rw
    User,
    /// kernel rw, user ro
    KernelUser,
    /// kernel rw, no user
    Kernel,
    /// kernel ro, no user
    KernelReadOnly,
    /// kernel rw, no user, uncached
    Device,
}

impl AccessClass {
    /// Domain the class is filed under
    pub const fn domain(self) -> u8 {
        match self {
            Self::User | Self::KernelUser => crate::config::domain::USER,
            Self::Kernel | Self::KernelReadOnly | Self::Device => crate::config::domain::KERNEL,
        }
    }

    /// Device mappings are never cached regardless of entry flags
    pub const fn forces_uncached(self) -> bool {
        matches!(self, Self::Device)
    }
}

/// Kind of descriptor write a mapping request asks for
///
/// `Directory*` kinds operate on first-level storage; `Table*` kinds
/// require that a `DirectoryTable` entry already covers the target
/// virtual address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// First-level section: direct 1 MiB physical mapping
    DirectoryEntry,
    /// First-level pointer to a second-level table
    DirectoryTable,
    /// Zero the first-level descriptor
    DirectoryInvalidate,
    /// Second-level small page (4 KiB)
    TableEntry,
    /// Zero the second-level descriptor
    TableInvalidate,
}

impl EntryKind {
    /// True for kinds that write first-level storage
    pub const fn is_directory_level(self) -> bool {
        matches!(self, Self::DirectoryEntry | Self::DirectoryTable | Self::DirectoryInvalidate)
    }
}

bitflags! {
    /// Optional per-entry flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EntryFlags: u8 {
        /// Map cacheable
        const CACHED = 1 << 0;
        /// Map bufferable (write-back)
        const BUFFERED = 1 << 1;
    }
}

/// An architecture-neutral mapping request
///
/// Created transiently per mapping call and handed to the backend;
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MmuEntry {
    /// Physical address being mapped (or the physical base of the
    /// second-level table for `DirectoryTable`)
    pub phys: Word,
    /// Virtual address the entry covers
    pub virt: Word,
    /// Kind of descriptor to write
    pub kind: EntryKind,
    /// Access class
    pub access: AccessClass,
    /// Optional flags
    pub flags: EntryFlags,
}

impl MmuEntry {
    pub const fn new(phys: Word, virt: Word, kind: EntryKind, access: AccessClass, flags: EntryFlags) -> Self {
        Self { phys, virt, kind, access, flags }
    }
}

/// Configured TTBR0/TTBR1 address-space split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressSpaceSplit {
    /// Single 4 GiB space, user table only
    #[default]
    NoSplit,
    /// 1 GiB user, 3 GiB kernel
    Split1G3G,
    /// 2 GiB user, 2 GiB kernel
    Split2G2G,
}

impl AddressSpaceSplit {
    /// Translation-table-base control divisor (TTBCR.N)
    pub const fn divisor(self) -> u32 {
        match self {
            Self::NoSplit => 0,
            Self::Split1G3G => 2,
            Self::Split2G2G => 1,
        }
    }

    /// Recover the split from a hardware divisor
    pub const fn from_divisor(n: u32) -> Result<Self> {
        match n {
            0 => Ok(Self::NoSplit),
            1 => Ok(Self::Split2G2G),
            2 => Ok(Self::Split1G3G),
            _ => Err(Error::UnsupportedSplit),
        }
    }

    /// Virtual address at and above which the kernel page directory is
    /// consulted
    pub const fn high_threshold(self) -> Word {
        match self {
            Self::NoSplit => 0,
            Self::Split1G3G => 1 << 30,
            Self::Split2G2G => 1 << 31,
        }
    }

    /// True iff `addr` falls in the kernel half of the split
    pub const fn is_high_memory(self, addr: Word) -> bool {
        addr >= self.high_threshold()
    }
}

/// Which translation table a capacity query concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSpace {
    /// TTBR0, user/low
    User,
    /// TTBR1, kernel/high
    Kernel,
}

/// What a `required_alignment` query concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignFor {
    Directory,
    Table,
}

/// Contract every architecture MMU backend implements.
///
/// All operations are synchronous and either fully apply their write or
/// return an error without touching memory; `invalidate` never fails.
/// Callers own barrier placement: a data-synchronization barrier must
/// precede `invalidate` (and the first `enable`) if prior descriptor
/// writes need to be visible to the walk hardware.
pub trait MmuBackend {
    /// Pure hardware query: is translation on?
    fn is_enabled(&self) -> bool;

    /// Turn translation on
    fn enable(&mut self) -> Result<()>;

    /// Turn translation off
    fn disable(&mut self) -> Result<()>;

    /// Program the translation-table-base control divisor
    fn set_split(&mut self, split: AddressSpaceSplit) -> Result<()>;

    /// Re-derive split divisor and cached table bases from live
    /// hardware; required before `create_entry` after an enable this
    /// backend instance did not itself perform.
    fn capture_state(&mut self) -> Result<()>;

    /// Program the kernel (high) table base; alignment-checked.
    fn set_kernel_page_directory(&mut self, addr: Word, flags: Word) -> Result<()>;

    /// Program the user (low) table base; alignment-checked.
    fn set_user_page_directory(&mut self, addr: Word, flags: Word) -> Result<()>;

    /// Write a descriptor into the currently active directory covering
    /// `entry.virt` (selected internally against the split threshold).
    fn create_entry(&mut self, entry: &MmuEntry) -> Result<()>;

    /// Write a descriptor into caller-supplied, not-necessarily-active
    /// directory memory; never consults or perturbs live hardware
    /// state.
    fn create_new_entry(&mut self, dir_base: Word, entry: &MmuEntry) -> Result<()>;

    /// Flush all cached translations. Caller issues the preceding DSB.
    fn invalidate(&mut self);

    /// Translate through the live tables: identity when translation is
    /// off, 0 when unmapped.
    fn virt_to_phys(&self, virt: Word) -> Word;

    /// Bytes of directory storage the given space needs under the
    /// current split
    fn required_directory_size(&self, space: TableSpace) -> Word;

    /// Bytes of second-level table storage needed to fully subdivide
    /// the given space under the current split
    fn required_table_region_size(&self, space: TableSpace) -> Word;

    /// Required base alignment for directory or table storage
    fn required_alignment(&self, target: AlignFor) -> Word;
}

/// Thin orchestration facade over an architecture backend.
///
/// Tracks the two active page-directory bases and the configured split;
/// all hidden-global state of the historical design lives here as plain
/// fields so independent instances can exist in tests.
pub struct Mmu<B: MmuBackend> {
    backend: B,
    // physical 0 is a legal directory base, so "not yet programmed" is
    // a separate state rather than a sentinel address
    kern_pgd: Option<Word>,
    user_pgd: Option<Word>,
    split: AddressSpaceSplit,
}

impl<B: MmuBackend> Mmu<B> {
    pub fn new(backend: B) -> Self {
        Self { backend, kern_pgd: None, user_pgd: None, split: AddressSpaceSplit::NoSplit }
    }

    /// Rebuild a facade around a backend whose split was captured from
    /// live hardware (the directory bases still need recording).
    pub fn resume(backend: B, split: AddressSpaceSplit) -> Self {
        Self { backend, kern_pgd: None, user_pgd: None, split }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn split(&self) -> AddressSpaceSplit {
        self.split
    }

    /// Recorded kernel table base, `None` until programmed
    pub fn kernel_page_directory(&self) -> Option<Word> {
        self.kern_pgd
    }

    /// Recorded user table base, `None` until programmed
    pub fn user_page_directory(&self) -> Option<Word> {
        self.user_pgd
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_enabled()
    }

    /// Configure the address-space split.
    ///
    /// Rejected with `AlreadyEnabled` under a live MMU (re-splitting a
    /// running address space is undefined); on any error the previous
    /// split and all mappings are left unchanged.
    pub fn set_split(&mut self, split: AddressSpaceSplit) -> Result<()> {
        if self.backend.is_enabled() {
            return Err(Error::AlreadyEnabled);
        }

        self.backend.set_split(split)?;
        self.split = split;

        Ok(())
    }

    pub fn enable(&mut self) -> Result<()> {
        if self.backend.is_enabled() {
            return Err(Error::AlreadyEnabled);
        }

        self.backend.enable()
    }

    pub fn disable(&mut self) -> Result<()> {
        if !self.backend.is_enabled() {
            return Err(Error::NotEnabled);
        }

        self.backend.disable()
    }

    /// Program the kernel table base and record it; optionally flush
    /// all cached translations.
    pub fn set_kernel_page_directory(&mut self, addr: Word, invalidate: bool) -> Result<()> {
        self.backend.set_kernel_page_directory(addr, 0)?;
        self.kern_pgd = Some(addr);

        if invalidate {
            utils::dsb();
            self.backend.invalidate();
        }

        Ok(())
    }

    /// Program the user table base and record it; optionally flush all
    /// cached translations.
    pub fn set_user_page_directory(&mut self, addr: Word, invalidate: bool) -> Result<()> {
        self.backend.set_user_page_directory(addr, 0)?;
        self.user_pgd = Some(addr);

        if invalidate {
            utils::dsb();
            self.backend.invalidate();
        }

        Ok(())
    }

    /// Program both table bases
    pub fn set_page_directories(&mut self, kern: Word, user: Word, invalidate: bool) -> Result<()> {
        self.set_user_page_directory(user, invalidate)?;
        self.set_kernel_page_directory(kern, invalidate)
    }

    /// Map `virt` to `phys` in the live tables.
    ///
    /// Requires both directory bases recorded and the hardware MMU on;
    /// boot-time mapping uses the raw path in [`crate::boot`] instead.
    /// The covering directory is chosen by comparing `virt` against the
    /// split's high-memory threshold.
    pub fn map(
        &mut self,
        virt: Word,
        phys: Word,
        kind: EntryKind,
        access: AccessClass,
        flags: EntryFlags,
        invalidate: bool,
    ) -> Result<()> {
        if self.kern_pgd.is_none() || self.user_pgd.is_none() {
            return Err(Error::NoPageDirectories);
        }

        if !self.backend.is_enabled() {
            return Err(Error::NotEnabled);
        }

        let entry = MmuEntry::new(phys, virt, kind, access, flags);
        self.backend.create_entry(&entry)?;

        if invalidate {
            utils::dsb();
            self.backend.invalidate();
        }

        Ok(())
    }

    /// Map into an arbitrary, possibly inactive, directory.
    ///
    /// Used to build a new address space without disturbing the live
    /// one; never invalidates global TLB state.
    pub fn map_into(
        &mut self,
        dir_base: Word,
        virt: Word,
        phys: Word,
        kind: EntryKind,
        access: AccessClass,
        flags: EntryFlags,
    ) -> Result<()> {
        let entry = MmuEntry::new(phys, virt, kind, access, flags);
        self.backend.create_new_entry(dir_base, &entry)
    }

    /// Flush all cached translations (DSB issued here, before the
    /// flush).
    pub fn invalidate(&mut self) {
        utils::dsb();
        self.backend.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    /// Backend double recording facade interactions
    struct MockBackend {
        enabled: bool,
        split: AddressSpaceSplit,
        kern_pgd: Option<Word>,
        user_pgd: Option<Word>,
        entries: Vec<(Option<Word>, MmuEntry)>,
        invalidations: usize,
    }

    impl MockBackend {
        fn new(enabled: bool) -> Self {
            Self {
                enabled,
                split: AddressSpaceSplit::NoSplit,
                kern_pgd: None,
                user_pgd: None,
                entries: Vec::new(),
                invalidations: 0,
            }
        }
    }

    impl MmuBackend for MockBackend {
        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn enable(&mut self) -> Result<()> {
            self.enabled = true;
            Ok(())
        }

        fn disable(&mut self) -> Result<()> {
            self.enabled = false;
            Ok(())
        }

        fn set_split(&mut self, split: AddressSpaceSplit) -> Result<()> {
            self.split = split;
            Ok(())
        }

        fn capture_state(&mut self) -> Result<()> {
            Ok(())
        }

        fn set_kernel_page_directory(&mut self, addr: Word, _flags: Word) -> Result<()> {
            if addr % (1 << 14) != 0 {
                return Err(Error::Unaligned);
            }
            self.kern_pgd = Some(addr);
            Ok(())
        }

        fn set_user_page_directory(&mut self, addr: Word, _flags: Word) -> Result<()> {
            if addr % (1 << 14) != 0 {
                return Err(Error::Unaligned);
            }
            self.user_pgd = Some(addr);
            Ok(())
        }

        fn create_entry(&mut self, entry: &MmuEntry) -> Result<()> {
            self.entries.push((None, *entry));
            Ok(())
        }

        fn create_new_entry(&mut self, dir_base: Word, entry: &MmuEntry) -> Result<()> {
            self.entries.push((Some(dir_base), *entry));
            Ok(())
        }

        fn invalidate(&mut self) {
            self.invalidations += 1;
        }

        fn virt_to_phys(&self, virt: Word) -> Word {
            if self.enabled {
                0
            } else {
                virt
            }
        }

        fn required_directory_size(&self, _space: TableSpace) -> Word {
            1 << 14
        }

        fn required_table_region_size(&self, _space: TableSpace) -> Word {
            1 << 20
        }

        fn required_alignment(&self, _target: AlignFor) -> Word {
            1 << 14
        }
    }

    fn mmu(enabled: bool) -> Mmu<MockBackend> {
        Mmu::new(MockBackend::new(enabled))
    }

    #[test_case(AddressSpaceSplit::NoSplit, 0; "no split")]
    #[test_case(AddressSpaceSplit::Split1G3G, 1 << 30; "one gig user")]
    #[test_case(AddressSpaceSplit::Split2G2G, 1 << 31; "two gig user")]
    fn test_high_threshold_values(split: AddressSpaceSplit, expected: Word) {
        assert_eq!(split.high_threshold(), expected);
    }

    #[test_case(AddressSpaceSplit::Split1G3G; "one gig")]
    #[test_case(AddressSpaceSplit::Split2G2G; "two gig")]
    fn test_is_high_memory_boundaries(split: AddressSpaceSplit) {
        let threshold = split.high_threshold();

        assert!(!split.is_high_memory(threshold - 1));
        assert!(split.is_high_memory(threshold));
        assert!(split.is_high_memory(Word::MAX));
    }

    #[test]
    fn test_split_divisor_round_trip() {
        for split in [
            AddressSpaceSplit::NoSplit,
            AddressSpaceSplit::Split1G3G,
            AddressSpaceSplit::Split2G2G,
        ] {
            assert_eq!(AddressSpaceSplit::from_divisor(split.divisor()), Ok(split));
        }
        assert_eq!(AddressSpaceSplit::from_divisor(5), Err(Error::UnsupportedSplit));
    }

    #[test]
    fn test_access_class_domains() {
        use crate::config::domain;

        assert_eq!(AccessClass::User.domain(), domain::USER);
        assert_eq!(AccessClass::KernelUser.domain(), domain::USER);
        assert_eq!(AccessClass::Kernel.domain(), domain::KERNEL);
        assert_eq!(AccessClass::KernelReadOnly.domain(), domain::KERNEL);
        assert_eq!(AccessClass::Device.domain(), domain::KERNEL);
    }

    #[test]
    fn test_set_split_rejected_while_enabled() {
        let mut mmu = mmu(true);

        assert_eq!(mmu.set_split(AddressSpaceSplit::Split2G2G), Err(Error::AlreadyEnabled));
        // previous split untouched
        assert_eq!(mmu.split(), AddressSpaceSplit::NoSplit);
        assert_eq!(mmu.backend().split, AddressSpaceSplit::NoSplit);
    }

    #[test]
    fn test_enable_disable_state_machine() {
        let mut mmu = mmu(false);

        assert_eq!(mmu.disable(), Err(Error::NotEnabled));
        assert_eq!(mmu.enable(), Ok(()));
        assert_eq!(mmu.enable(), Err(Error::AlreadyEnabled));
        assert_eq!(mmu.disable(), Ok(()));
    }

    #[test]
    fn test_map_requires_page_directories() {
        let mut mmu = mmu(true);

        let err = mmu.map(
            0x8010_0000,
            0x0010_0000,
            EntryKind::DirectoryEntry,
            AccessClass::Kernel,
            EntryFlags::empty(),
            false,
        );
        assert_eq!(err, Err(Error::NoPageDirectories));
    }

    #[test]
    fn test_map_requires_enabled() {
        let mut mmu = mmu(false);
        mmu.set_page_directories(0x0030_0000, 0x0034_0000, false).unwrap();

        let err = mmu.map(
            0x8010_0000,
            0x0010_0000,
            EntryKind::DirectoryEntry,
            AccessClass::Kernel,
            EntryFlags::empty(),
            false,
        );
        assert_eq!(err, Err(Error::NotEnabled));
    }

    #[test]
    fn test_map_invalidate_flag() {
        let mut mmu = mmu(true);
        mmu.set_page_directories(0x0030_0000, 0x0034_0000, false).unwrap();

        mmu.map(
            0x8010_0000,
            0x0010_0000,
            EntryKind::DirectoryEntry,
            AccessClass::Kernel,
            EntryFlags::CACHED,
            true,
        )
        .unwrap();

        assert_eq!(mmu.backend().entries.len(), 1);
        assert_eq!(mmu.backend().invalidations, 1);
    }

    #[test]
    fn test_map_into_never_invalidates() {
        let mut mmu = mmu(true);

        mmu.map_into(
            0x0100_0000,
            0x0000_1000,
            0x0200_0000,
            EntryKind::TableEntry,
            AccessClass::User,
            EntryFlags::CACHED | EntryFlags::BUFFERED,
        )
        .unwrap();

        assert_eq!(mmu.backend().invalidations, 0);
        let (dir, entry) = mmu.backend().entries[0];
        assert_eq!(dir, Some(0x0100_0000));
        assert_eq!(entry.access, AccessClass::User);
    }

    #[test]
    fn test_set_page_directory_failure_leaves_state() {
        let mut mmu = mmu(false);

        assert_eq!(mmu.set_user_page_directory(0x123, false), Err(Error::Unaligned));
        assert_eq!(mmu.user_page_directory(), None);
        assert_eq!(mmu.backend().user_pgd, None);
    }

    #[test]
    fn test_directory_at_physical_zero_is_usable() {
        let mut mmu = mmu(true);
        mmu.set_page_directories(0x0030_0000, 0, false).unwrap();

        assert_eq!(mmu.user_page_directory(), Some(0));
        mmu.map(
            0x0000_1000,
            0x0200_0000,
            EntryKind::TableEntry,
            AccessClass::User,
            EntryFlags::empty(),
            false,
        )
        .unwrap();
        assert_eq!(mmu.backend().entries.len(), 1);
    }

    #[test]
    fn test_set_page_directories_records_both() {
        let mut mmu = mmu(false);

        mmu.set_page_directories(0x0030_0000, 0x0034_0000, true).unwrap();
        assert_eq!(mmu.kernel_page_directory(), Some(0x0030_0000));
        assert_eq!(mmu.user_page_directory(), Some(0x0034_0000));
        assert_eq!(mmu.backend().invalidations, 2);
    }
}
