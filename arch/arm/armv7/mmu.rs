//! ARMv7-A short-descriptor page tables
//!
//! Translates generic [`MmuEntry`] requests into first-level (section /
//! table pointer) and second-level (small page) descriptor words, owns
//! the TTBR0/TTBR1 selection for a given virtual address, and drives
//! the SCTLR/TTBCR/DACR state machine through the [`SysRegs`] seam.
//!
//! Access permissions use the simplified access model (SCTLR.AFE = 1):
//! one two-bit value per descriptor, no APX bit.

use crate::arch::arm::coproc::{sctlr, ttbcr, ttbr, SysRegs};
use crate::arch::arm::{dacr_with_domain, DomainAccess, DomainControl};
use crate::config::{DIRECTORY_ENTRIES, DIRECTORY_SIZE, PAGE_SHIFT, SECTION_MASK, SECTION_SHIFT, TABLE_SIZE};
use crate::mm::mmu::{AddressSpaceSplit, AlignFor, EntryKind, MmuBackend, MmuEntry, TableSpace};
use crate::mm::phys::PhysAccess;
use crate::utils;
use crate::{Error, Result, Word};

/// Simplified-access-model permission values
mod ap {
    use crate::Word;

    /// Kernel rw, no user
    pub const KRW_UNO: Word = 0b00;
    /// Kernel rw, user rw
    pub const KRW_URW: Word = 0b01;
    /// Kernel ro, no user
    pub const KRO_UNO: Word = 0b10;
    /// Kernel ro, user ro
    pub const KRO_URO: Word = 0b11;
}

/// First-level descriptor layout
mod l1 {
    use crate::Word;

    /// Type tag, bits [1:0]
    pub const TYPE_MASK: Word = 0b11;

    pub mod section {
        use crate::Word;

        pub const TYPE: Word = 0b10;
        pub const BASE_MASK: Word = 0xfff0_0000;
        pub const AP_SHIFT: u32 = 10;
        pub const AP_MASK: Word = 0b11 << AP_SHIFT;
        pub const DOMAIN_SHIFT: u32 = 5;
        pub const DOMAIN_MASK: Word = 0xf << DOMAIN_SHIFT;
        pub const CACHEABLE: Word = 1 << 3;
        pub const BUFFERABLE: Word = 1 << 2;
    }

    pub mod table {
        use crate::Word;

        pub const TYPE: Word = 0b01;
        pub const BASE_MASK: Word = 0xffff_fc00;
        pub const DOMAIN_SHIFT: u32 = 5;
        pub const DOMAIN_MASK: Word = 0xf << DOMAIN_SHIFT;
    }
}

/// Second-level descriptor layout
mod l2 {
    pub mod small {
        use crate::Word;

        pub const TYPE: Word = 0b10;
        pub const BASE_MASK: Word = 0xffff_f000;
        pub const AP_SHIFT: u32 = 4;
        pub const AP_MASK: Word = 0b11 << AP_SHIFT;
        pub const CACHEABLE: Word = 1 << 3;
        pub const BUFFERABLE: Word = 1 << 2;
    }
}

/// Descriptor encode/decode, pure and separately testable.
pub(crate) mod desc {
    use super::{ap, l1, l2};
    use crate::mm::mmu::{AccessClass, EntryFlags};
    use crate::Word;

    pub fn access_to_ap(access: AccessClass) -> Word {
        match access {
            AccessClass::User => ap::KRW_URW,
            AccessClass::KernelUser => ap::KRO_URO,
            AccessClass::Kernel => ap::KRW_UNO,
            AccessClass::KernelReadOnly => ap::KRO_UNO,
            AccessClass::Device => ap::KRW_UNO,
        }
    }

    /// Cacheability bits shared by the section and small-page formats
    /// (both keep C at bit 3 and B at bit 2). Device access forces both
    /// off regardless of the requested flags.
    pub fn memory_bits(access: AccessClass, flags: EntryFlags) -> Word {
        let mut bits = 0;

        if !access.forces_uncached() {
            if flags.contains(EntryFlags::CACHED) {
                bits |= l1::section::CACHEABLE;
            }
            if flags.contains(EntryFlags::BUFFERED) {
                bits |= l1::section::BUFFERABLE;
            }
        }

        bits
    }

    pub fn encode_section(phys: Word, ap: Word, domain: u8, mem_bits: Word) -> Word {
        (phys & l1::section::BASE_MASK)
            | (ap << l1::section::AP_SHIFT)
            | ((domain as Word) << l1::section::DOMAIN_SHIFT)
            | mem_bits
            | l1::section::TYPE
    }

    pub fn encode_table(table_base: Word, domain: u8) -> Word {
        (table_base & l1::table::BASE_MASK)
            | ((domain as Word) << l1::table::DOMAIN_SHIFT)
            | l1::table::TYPE
    }

    pub fn encode_small_page(phys: Word, ap: Word, mem_bits: Word) -> Word {
        (phys & l2::small::BASE_MASK) | (ap << l2::small::AP_SHIFT) | mem_bits | l2::small::TYPE
    }

    /// Decode a first-level descriptor to `(base, ap, domain)`, masked
    /// to the bits the format defines. A table pointer has no AP field
    /// and decodes it as zero; an invalid descriptor decodes as all
    /// zeroes.
    pub fn decode_directory(word: Word) -> (Word, Word, u8) {
        match word & l1::TYPE_MASK {
            l1::section::TYPE => (
                word & l1::section::BASE_MASK,
                (word & l1::section::AP_MASK) >> l1::section::AP_SHIFT,
                ((word & l1::section::DOMAIN_MASK) >> l1::section::DOMAIN_SHIFT) as u8,
            ),
            l1::table::TYPE => (
                word & l1::table::BASE_MASK,
                0,
                ((word & l1::table::DOMAIN_MASK) >> l1::table::DOMAIN_SHIFT) as u8,
            ),
            _ => (0, 0, 0),
        }
    }

    /// Decode a second-level descriptor to `(base, ap)`.
    pub fn decode_table(word: Word) -> (Word, Word) {
        if word & l2::small::TYPE != 0 {
            (word & l2::small::BASE_MASK, (word & l2::small::AP_MASK) >> l2::small::AP_SHIFT)
        } else {
            (0, 0)
        }
    }
}

/// ARMv7-A MMU backend.
///
/// `R` is the CP15 register seam, `P` the physical-memory capability
/// the descriptor words are written through. The cached split divisor
/// and directory bases mirror hardware and are only trusted after
/// [`MmuBackend::capture_state`] or a successful self-driven enable.
pub struct Armv7Mmu<R: SysRegs, P: PhysAccess> {
    regs: R,
    phys: P,
    init: bool,
    split: AddressSpaceSplit,
    kern_pgd: Word,
    user_pgd: Word,
}

impl<R: SysRegs, P: PhysAccess> Armv7Mmu<R, P> {
    pub fn new(regs: R, phys: P) -> Self {
        Self {
            regs,
            phys,
            init: false,
            split: AddressSpaceSplit::NoSplit,
            kern_pgd: 0,
            user_pgd: 0,
        }
    }

    pub fn split(&self) -> AddressSpaceSplit {
        self.split
    }

    pub fn phys_mut(&mut self) -> &mut P {
        &mut self.phys
    }

    #[cfg(test)]
    pub fn regs(&self) -> &R {
        &self.regs
    }

    /// The user table base alignment shrinks as the split devotes more
    /// address space to the kernel.
    fn user_table_alignment(&self) -> Word {
        1 << (14 - self.split.divisor())
    }

    /// Base of the directory the walk hardware consults for `virt`.
    /// With N = 0 only TTBR0 exists and everything is low.
    fn active_directory(&self, virt: Word) -> Word {
        let n = self.split.divisor();

        if n > 0 && virt >= (1 << (32 - n)) {
            self.kern_pgd
        } else {
            self.user_pgd
        }
    }

    fn directory_slot(dir_base: Word, virt: Word) -> Word {
        dir_base + (virt >> SECTION_SHIFT) * 4
    }

    fn table_slot(table_base: Word, virt: Word) -> Word {
        table_base + ((virt >> PAGE_SHIFT) & 0xff) * 4
    }

    /// Write one descriptor for `entry`. `Directory*` kinds treat
    /// `base` as a first-level directory; `Table*` kinds as the 1 KiB
    /// second-level segment itself.
    fn write_raw(&mut self, base: Word, entry: &MmuEntry) -> Result<()> {
        let ap = desc::access_to_ap(entry.access);
        let mem = desc::memory_bits(entry.access, entry.flags);

        match entry.kind {
            EntryKind::DirectoryEntry => {
                let word = desc::encode_section(entry.phys, ap, entry.access.domain(), mem);
                self.phys.write_word(Self::directory_slot(base, entry.virt), word);
            }
            EntryKind::DirectoryTable => {
                let word = desc::encode_table(entry.phys, entry.access.domain());
                self.phys.write_word(Self::directory_slot(base, entry.virt), word);
            }
            EntryKind::DirectoryInvalidate => {
                self.phys.write_word(Self::directory_slot(base, entry.virt), 0);
            }
            EntryKind::TableEntry => {
                let word = desc::encode_small_page(entry.phys, ap, mem);
                self.phys.write_word(Self::table_slot(base, entry.virt), word);
            }
            EntryKind::TableInvalidate => {
                self.phys.write_word(Self::table_slot(base, entry.virt), 0);
            }
        }

        Ok(())
    }
}

impl<R: SysRegs, P: PhysAccess> MmuBackend for Armv7Mmu<R, P> {
    fn is_enabled(&self) -> bool {
        self.regs.sctlr() & sctlr::M != 0
    }

    fn enable(&mut self) -> Result<()> {
        if self.is_enabled() {
            return Err(Error::AlreadyEnabled);
        }

        self.regs.set_sctlr(self.regs.sctlr() | sctlr::M | sctlr::AFE);
        utils::isb();

        // we programmed this state ourselves, no capture needed
        self.init = true;

        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        if !self.is_enabled() {
            return Err(Error::NotEnabled);
        }

        self.regs.set_sctlr(self.regs.sctlr() & !sctlr::M);
        utils::isb();

        Ok(())
    }

    fn set_split(&mut self, split: AddressSpaceSplit) -> Result<()> {
        if self.is_enabled() {
            return Err(Error::AlreadyEnabled);
        }

        let reg = (self.regs.ttbcr() & !ttbcr::N_MASK) | split.divisor();
        self.regs.set_ttbcr(reg);
        self.split = split;

        Ok(())
    }

    fn capture_state(&mut self) -> Result<()> {
        if !self.is_enabled() {
            return Err(Error::NotEnabled);
        }

        let n = self.regs.ttbcr() & ttbcr::N_MASK;
        self.split = AddressSpaceSplit::from_divisor(n)?;

        if n > 0 {
            self.user_pgd = self.regs.ttbr0() & !(self.user_table_alignment() - 1);
            self.kern_pgd = self.regs.ttbr1() & ttbr::BASE_MASK;
        } else {
            self.user_pgd = self.regs.ttbr0() & ttbr::BASE_MASK;
            self.kern_pgd = self.user_pgd;
        }

        self.init = true;

        log::debug!(
            "captured mmu state: n={} kern_pgd={:#010x} user_pgd={:#010x}",
            n,
            self.kern_pgd,
            self.user_pgd
        );

        Ok(())
    }

    fn set_kernel_page_directory(&mut self, addr: Word, flags: Word) -> Result<()> {
        if !is_aligned!(addr, DIRECTORY_SIZE) {
            return Err(Error::Unaligned);
        }

        self.regs.set_ttbr1(addr | flags);
        self.kern_pgd = addr;

        Ok(())
    }

    fn set_user_page_directory(&mut self, addr: Word, flags: Word) -> Result<()> {
        if !is_aligned!(addr, self.user_table_alignment()) {
            return Err(Error::Unaligned);
        }

        self.regs.set_ttbr0(addr | flags);
        self.user_pgd = addr;

        Ok(())
    }

    fn create_entry(&mut self, entry: &MmuEntry) -> Result<()> {
        if !self.init {
            return Err(Error::NotInitialized);
        }

        let dir = self.active_directory(entry.virt);

        match entry.kind {
            EntryKind::DirectoryEntry | EntryKind::DirectoryTable | EntryKind::DirectoryInvalidate => {
                self.write_raw(dir, entry)
            }
            EntryKind::TableEntry | EntryKind::TableInvalidate => {
                // the covering first-level entry must already point at
                // a table, otherwise there is nowhere to write
                let l1_word = self.phys.read_word(Self::directory_slot(dir, entry.virt));
                if l1_word & l1::TYPE_MASK != l1::table::TYPE {
                    return Err(Error::NotFound);
                }

                self.write_raw(l1_word & l1::table::BASE_MASK, entry)
            }
        }
    }

    fn create_new_entry(&mut self, dir_base: Word, entry: &MmuEntry) -> Result<()> {
        self.write_raw(dir_base, entry)
    }

    fn invalidate(&mut self) {
        self.regs.invalidate_tlb();
    }

    fn virt_to_phys(&self, virt: Word) -> Word {
        if !self.is_enabled() {
            return virt;
        }

        let dir = self.active_directory(virt);
        let l1_word = self.phys.read_word(Self::directory_slot(dir, virt));

        match l1_word & l1::TYPE_MASK {
            l1::section::TYPE => (l1_word & l1::section::BASE_MASK) | (virt & SECTION_MASK),
            l1::table::TYPE => {
                let l2_word = self.phys.read_word(Self::table_slot(l1_word & l1::table::BASE_MASK, virt));

                if l2_word & l2::small::TYPE != 0 {
                    (l2_word & l2::small::BASE_MASK) | (virt & (crate::config::PAGE_SIZE - 1))
                } else {
                    0
                }
            }
            _ => 0,
        }
    }

    fn required_directory_size(&self, space: TableSpace) -> Word {
        match space {
            TableSpace::Kernel => DIRECTORY_SIZE,
            TableSpace::User => DIRECTORY_SIZE >> self.split.divisor(),
        }
    }

    fn required_table_region_size(&self, space: TableSpace) -> Word {
        let user_sections = (DIRECTORY_ENTRIES as Word) >> self.split.divisor();

        match space {
            TableSpace::User => user_sections * TABLE_SIZE,
            TableSpace::Kernel => (DIRECTORY_ENTRIES as Word - user_sections) * TABLE_SIZE,
        }
    }

    fn required_alignment(&self, target: AlignFor) -> Word {
        match target {
            AlignFor::Directory => DIRECTORY_SIZE,
            AlignFor::Table => TABLE_SIZE,
        }
    }
}

impl<R: SysRegs, P: PhysAccess> DomainControl for Armv7Mmu<R, P> {
    fn set_domain(&mut self, domain: u8, access: DomainAccess) -> Result<()> {
        let reg = dacr_with_domain(self.regs.dacr(), domain, access)?;
        self.regs.set_dacr(reg);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::arm::coproc::MockRegs;
    use crate::mm::mmu::{AccessClass, EntryFlags};
    use crate::mm::phys::FakePhys;
    use test_case::test_case;

    const USER_DIR: Word = 0x0003_0000;
    const KERN_DIR: Word = 0x0004_0000;
    const TABLES: Word = 0x0008_0000;

    fn enabled_mmu(split: AddressSpaceSplit) -> Armv7Mmu<MockRegs, FakePhys> {
        let regs = MockRegs {
            sctlr: sctlr::M | sctlr::AFE,
            ttbr0: USER_DIR | 0x18, // attribute bits must be masked off
            ttbr1: KERN_DIR | 0x18,
            ttbcr: split.divisor(),
            ..MockRegs::default()
        };

        let mut mmu = Armv7Mmu::new(regs, FakePhys::new());
        mmu.capture_state().unwrap();
        mmu
    }

    #[test_case(AccessClass::User; "user")]
    #[test_case(AccessClass::KernelUser; "kernel user")]
    #[test_case(AccessClass::Kernel; "kernel")]
    #[test_case(AccessClass::KernelReadOnly; "kernel read only")]
    #[test_case(AccessClass::Device; "device")]
    fn test_section_round_trip(access: AccessClass) {
        let ap = desc::access_to_ap(access);
        let word = desc::encode_section(0x4520_0000, ap, access.domain(), 0);

        assert_eq!(desc::decode_directory(word), (0x4520_0000, ap, access.domain()));
    }

    #[test]
    fn test_table_pointer_decodes_ap_as_zero() {
        let word = desc::encode_table(0x0008_0400, 1);
        let (base, ap, domain) = desc::decode_directory(word);

        assert_eq!(base, 0x0008_0400);
        assert_eq!(ap, 0);
        assert_eq!(domain, 1);
    }

    #[test]
    fn test_invalid_descriptor_decodes_zero() {
        assert_eq!(desc::decode_directory(0), (0, 0, 0));
    }

    #[test]
    fn test_small_page_round_trip() {
        let ap = desc::access_to_ap(AccessClass::User);
        let word = desc::encode_small_page(0x0123_4000, ap, 0);

        assert_eq!(desc::decode_table(word), (0x0123_4000, ap));
    }

    #[test]
    fn test_device_access_never_cached() {
        let bits = desc::memory_bits(AccessClass::Device, EntryFlags::CACHED | EntryFlags::BUFFERED);
        assert_eq!(bits, 0);

        let bits = desc::memory_bits(AccessClass::Kernel, EntryFlags::CACHED | EntryFlags::BUFFERED);
        assert_eq!(bits, l1::section::CACHEABLE | l1::section::BUFFERABLE);
    }

    #[test]
    fn test_enable_sets_mmu_and_afe() {
        let mut mmu = Armv7Mmu::new(MockRegs::new(), FakePhys::new());
        assert!(!mmu.is_enabled());

        mmu.enable().unwrap();
        assert!(mmu.is_enabled());
        assert_eq!(mmu.regs().sctlr & sctlr::AFE, sctlr::AFE);
        assert_eq!(mmu.enable(), Err(Error::AlreadyEnabled));

        mmu.disable().unwrap();
        assert!(!mmu.is_enabled());
        assert_eq!(mmu.regs().sctlr & sctlr::AFE, sctlr::AFE);
    }

    #[test]
    fn test_capture_state_masks_ttbr_attributes() {
        let mmu = enabled_mmu(AddressSpaceSplit::Split2G2G);

        assert_eq!(mmu.split(), AddressSpaceSplit::Split2G2G);
        assert_eq!(mmu.user_pgd, USER_DIR);
        assert_eq!(mmu.kern_pgd, KERN_DIR);
    }

    #[test]
    fn test_capture_state_requires_enabled() {
        let mut mmu = Armv7Mmu::new(MockRegs::new(), FakePhys::new());
        assert_eq!(mmu.capture_state(), Err(Error::NotEnabled));
    }

    #[test]
    fn test_capture_state_no_split_uses_single_directory() {
        let mut mmu = enabled_mmu(AddressSpaceSplit::NoSplit);
        mmu.regs.ttbr0 = USER_DIR;
        mmu.capture_state().unwrap();

        assert_eq!(mmu.kern_pgd, USER_DIR);
        assert_eq!(mmu.active_directory(0xffff_0000), USER_DIR);
    }

    #[test]
    fn test_create_entry_requires_capture() {
        let mut mmu = Armv7Mmu::new(MockRegs::new(), FakePhys::new());
        let entry = MmuEntry::new(0, 0, EntryKind::DirectoryEntry, AccessClass::Kernel, EntryFlags::empty());

        assert_eq!(mmu.create_entry(&entry), Err(Error::NotInitialized));
    }

    #[test]
    fn test_table_entry_before_directory_is_not_found() {
        let mut mmu = enabled_mmu(AddressSpaceSplit::Split2G2G);
        let entry = MmuEntry::new(
            0x0010_0000,
            0x8010_0000,
            EntryKind::TableEntry,
            AccessClass::Kernel,
            EntryFlags::empty(),
        );

        assert_eq!(mmu.create_entry(&entry), Err(Error::NotFound));
        assert_eq!(mmu.phys.written_words(), 0);
    }

    #[test]
    fn test_section_entry_routes_by_split() {
        let mut mmu = enabled_mmu(AddressSpaceSplit::Split2G2G);

        let low = MmuEntry::new(0x0010_0000, 0x0010_0000, EntryKind::DirectoryEntry, AccessClass::User, EntryFlags::empty());
        let high = MmuEntry::new(0x0020_0000, 0x8020_0000, EntryKind::DirectoryEntry, AccessClass::Kernel, EntryFlags::empty());
        mmu.create_entry(&low).unwrap();
        mmu.create_entry(&high).unwrap();

        // low went to the user directory, high to the kernel directory
        assert_ne!(mmu.phys.read_word(USER_DIR + (0x0010_0000 >> 20) * 4), 0);
        assert_ne!(mmu.phys.read_word(KERN_DIR + (0x8020_0000 >> 20) * 4), 0);
    }

    #[test]
    fn test_identity_section_translates_identity() {
        let mut mmu = enabled_mmu(AddressSpaceSplit::NoSplit);
        let entry = MmuEntry::new(0, 0, EntryKind::DirectoryEntry, AccessClass::Kernel, EntryFlags::empty());
        mmu.create_entry(&entry).unwrap();

        assert_eq!(mmu.virt_to_phys(0x0000_0500), 0x0000_0500);
    }

    #[test]
    fn test_high_half_alias_through_small_pages() {
        let mut mmu = enabled_mmu(AddressSpaceSplit::Split2G2G);

        // table segment wired into the kernel directory, then one page
        let link = MmuEntry::new(TABLES, 0x8000_8000, EntryKind::DirectoryTable, AccessClass::Kernel, EntryFlags::empty());
        mmu.create_entry(&link).unwrap();

        let page = MmuEntry::new(0x0000_8000, 0x8000_8000, EntryKind::TableEntry, AccessClass::Kernel, EntryFlags::empty());
        mmu.create_entry(&page).unwrap();

        assert_eq!(mmu.virt_to_phys(0x8000_8123), 0x0000_8123);
    }

    #[test]
    fn test_virt_to_phys_unmapped_is_zero() {
        let mmu = enabled_mmu(AddressSpaceSplit::Split2G2G);
        assert_eq!(mmu.virt_to_phys(0x4000_0000), 0);
    }

    #[test]
    fn test_virt_to_phys_identity_when_disabled() {
        let mmu = Armv7Mmu::new(MockRegs::new(), FakePhys::new());
        assert_eq!(mmu.virt_to_phys(0xdead_b000), 0xdead_b000);
    }

    #[test]
    fn test_invalidate_entries_removes_mapping() {
        let mut mmu = enabled_mmu(AddressSpaceSplit::NoSplit);
        let entry = MmuEntry::new(0, 0, EntryKind::DirectoryEntry, AccessClass::Kernel, EntryFlags::empty());
        mmu.create_entry(&entry).unwrap();

        let inval = MmuEntry::new(0, 0, EntryKind::DirectoryInvalidate, AccessClass::Kernel, EntryFlags::empty());
        mmu.create_entry(&inval).unwrap();

        assert_eq!(mmu.virt_to_phys(0x0000_0500), 0);
    }

    #[test]
    fn test_tlb_invalidation_is_idempotent() {
        let mut mmu = enabled_mmu(AddressSpaceSplit::NoSplit);
        let entry = MmuEntry::new(0, 0, EntryKind::DirectoryEntry, AccessClass::Kernel, EntryFlags::empty());
        mmu.create_entry(&entry).unwrap();

        mmu.invalidate();
        let before = mmu.virt_to_phys(0x0000_0100);
        mmu.invalidate();

        assert_eq!(mmu.virt_to_phys(0x0000_0100), before);
        assert_eq!(mmu.regs().tlb_flushes, 2);
    }

    #[test_case(AddressSpaceSplit::Split2G2G, 1 << 13; "two gig split halves alignment")]
    #[test_case(AddressSpaceSplit::Split1G3G, 1 << 12; "one gig split quarters alignment")]
    fn test_unaligned_user_directory_rejected(split: AddressSpaceSplit, align: Word) {
        let mut mmu = Armv7Mmu::new(MockRegs::new(), FakePhys::new());
        mmu.set_split(split).unwrap();

        let before = mmu.regs().ttbr0;
        assert_eq!(mmu.set_user_page_directory(align / 2, 0), Err(Error::Unaligned));
        assert_eq!(mmu.regs().ttbr0, before);

        mmu.set_user_page_directory(align, 0).unwrap();
        assert_eq!(mmu.regs().ttbr0, align);
    }

    #[test]
    fn test_unaligned_kernel_directory_rejected() {
        let mut mmu = Armv7Mmu::new(MockRegs::new(), FakePhys::new());

        assert_eq!(mmu.set_kernel_page_directory(0x2000, 0), Err(Error::Unaligned));
        assert_eq!(mmu.regs().ttbr1, 0);
    }

    #[test]
    fn test_set_split_programs_ttbcr() {
        let mut mmu = Armv7Mmu::new(MockRegs::new(), FakePhys::new());

        mmu.set_split(AddressSpaceSplit::Split1G3G).unwrap();
        assert_eq!(mmu.regs().ttbcr & ttbcr::N_MASK, 2);
    }

    #[test_case(AddressSpaceSplit::NoSplit, 0x4000, 0x0, 0x40_0000; "no split")]
    #[test_case(AddressSpaceSplit::Split1G3G, 0x1000, 0x30_0000, 0x10_0000; "one gig user")]
    #[test_case(AddressSpaceSplit::Split2G2G, 0x2000, 0x20_0000, 0x20_0000; "two gig user")]
    fn test_capacity_queries(split: AddressSpaceSplit, user_dir: Word, kern_tables: Word, user_tables: Word) {
        let mut mmu = Armv7Mmu::new(MockRegs::new(), FakePhys::new());
        mmu.set_split(split).unwrap();

        assert_eq!(mmu.required_directory_size(TableSpace::Kernel), DIRECTORY_SIZE);
        assert_eq!(mmu.required_directory_size(TableSpace::User), user_dir);
        assert_eq!(mmu.required_table_region_size(TableSpace::Kernel), kern_tables);
        assert_eq!(mmu.required_table_region_size(TableSpace::User), user_tables);
        assert_eq!(mmu.required_alignment(AlignFor::Directory), DIRECTORY_SIZE);
        assert_eq!(mmu.required_alignment(AlignFor::Table), TABLE_SIZE);
    }

    #[test]
    fn test_domain_programming() {
        let mut mmu = Armv7Mmu::new(MockRegs::new(), FakePhys::new());

        mmu.set_domain(0, DomainAccess::Client).unwrap();
        mmu.set_domain(1, DomainAccess::Client).unwrap();
        assert_eq!(mmu.regs().dacr, 0b0101);

        assert_eq!(mmu.set_domain(16, DomainAccess::Client), Err(Error::InvalidArgument));
    }
}
