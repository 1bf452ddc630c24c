//! ARMv6 short-descriptor page tables
//!
//! Same first-level/second-level structure as the ARMv7 backend but
//! with the classic access-permission encoding: a two-bit AP field
//! plus the APX extension bit, selected by enabling the extended page
//! table format (SCTLR.XP) instead of the v7 access-flag model.

use crate::arch::arm::coproc::{sctlr, ttbcr, ttbr, SysRegs};
use crate::arch::arm::{dacr_with_domain, DomainAccess, DomainControl};
use crate::config::{DIRECTORY_ENTRIES, DIRECTORY_SIZE, PAGE_SHIFT, SECTION_MASK, SECTION_SHIFT, TABLE_SIZE};
use crate::mm::mmu::{
    AccessClass, AddressSpaceSplit, AlignFor, EntryKind, MmuBackend, MmuEntry, TableSpace,
};
use crate::mm::phys::PhysAccess;
use crate::utils;
use crate::{Error, Result, Word};

/// Classic permissions as `APX << 2 | AP`
mod ap {
    use crate::Word;

    /// Kernel rw, no user
    pub const KRW: Word = 0b001;
    /// Kernel rw, user ro
    pub const KRW_URO: Word = 0b010;
    /// Kernel rw, user rw
    pub const URW: Word = 0b011;
    /// Kernel ro, no user
    pub const KRO: Word = 0b101;

    pub const AP_MASK: Word = 0b011;
    pub const APX: Word = 0b100;
}

mod l1 {
    use crate::Word;

    pub const TYPE_MASK: Word = 0b11;

    pub mod section {
        use crate::Word;

        pub const TYPE: Word = 0b10;
        pub const BASE_MASK: Word = 0xfff0_0000;
        pub const AP_SHIFT: u32 = 10;
        pub const APX_BIT: Word = 1 << 15;
        pub const DOMAIN_SHIFT: u32 = 5;
        pub const DOMAIN_MASK: Word = 0xf << DOMAIN_SHIFT;
        pub const CACHEABLE: Word = 1 << 3;
        pub const BUFFERABLE: Word = 1 << 2;
    }

    /// Coarse page table pointer
    pub mod coarse {
        use crate::Word;

        pub const TYPE: Word = 0b01;
        pub const BASE_MASK: Word = 0xffff_fc00;
        pub const DOMAIN_SHIFT: u32 = 5;
    }
}

mod l2 {
    pub mod small {
        use crate::Word;

        pub const TYPE: Word = 0b10;
        pub const BASE_MASK: Word = 0xffff_f000;
        pub const AP_SHIFT: u32 = 4;
        pub const APX_BIT: Word = 1 << 9;
        pub const CACHEABLE: Word = 1 << 3;
        pub const BUFFERABLE: Word = 1 << 2;
    }
}

fn access_to_ap(access: AccessClass) -> Word {
    match access {
        AccessClass::User => ap::URW,
        AccessClass::KernelUser => ap::KRW_URO,
        AccessClass::Kernel => ap::KRW,
        AccessClass::KernelReadOnly => ap::KRO,
        AccessClass::Device => ap::KRW,
    }
}

fn memory_bits(access: AccessClass, flags: crate::mm::mmu::EntryFlags) -> Word {
    use crate::mm::mmu::EntryFlags;

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

fn encode_section(phys: Word, ap: Word, domain: u8, mem_bits: Word) -> Word {
    let apx = if ap & ap::APX != 0 { l1::section::APX_BIT } else { 0 };

    (phys & l1::section::BASE_MASK)
        | ((ap & ap::AP_MASK) << l1::section::AP_SHIFT)
        | apx
        | ((domain as Word) << l1::section::DOMAIN_SHIFT)
        | mem_bits
        | l1::section::TYPE
}

fn encode_coarse(table_base: Word, domain: u8) -> Word {
    (table_base & l1::coarse::BASE_MASK) | ((domain as Word) << l1::coarse::DOMAIN_SHIFT) | l1::coarse::TYPE
}

fn encode_small_page(phys: Word, ap: Word, mem_bits: Word) -> Word {
    let apx = if ap & ap::APX != 0 { l2::small::APX_BIT } else { 0 };

    (phys & l2::small::BASE_MASK) | ((ap & ap::AP_MASK) << l2::small::AP_SHIFT) | apx | mem_bits | l2::small::TYPE
}

/// ARMv6 MMU backend over the [`SysRegs`] and [`PhysAccess`] seams.
pub struct Armv6Mmu<R: SysRegs, P: PhysAccess> {
    regs: R,
    phys: P,
    init: bool,
    split: AddressSpaceSplit,
    kern_pgd: Word,
    user_pgd: Word,
}

impl<R: SysRegs, P: PhysAccess> Armv6Mmu<R, P> {
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

    fn user_table_alignment(&self) -> Word {
        1 << (14 - self.split.divisor())
    }

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

    fn write_raw(&mut self, base: Word, entry: &MmuEntry) -> Result<()> {
        let ap = access_to_ap(entry.access);
        let mem = memory_bits(entry.access, entry.flags);

        match entry.kind {
            EntryKind::DirectoryEntry => {
                let word = encode_section(entry.phys, ap, entry.access.domain(), mem);
                self.phys.write_word(Self::directory_slot(base, entry.virt), word);
            }
            EntryKind::DirectoryTable => {
                let word = encode_coarse(entry.phys, entry.access.domain());
                self.phys.write_word(Self::directory_slot(base, entry.virt), word);
            }
            EntryKind::DirectoryInvalidate => {
                self.phys.write_word(Self::directory_slot(base, entry.virt), 0);
            }
            EntryKind::TableEntry => {
                let word = encode_small_page(entry.phys, ap, mem);
                self.phys.write_word(Self::table_slot(base, entry.virt), word);
            }
            EntryKind::TableInvalidate => {
                self.phys.write_word(Self::table_slot(base, entry.virt), 0);
            }
        }

        Ok(())
    }
}

impl<R: SysRegs, P: PhysAccess> MmuBackend for Armv6Mmu<R, P> {
    fn is_enabled(&self) -> bool {
        self.regs.sctlr() & sctlr::M != 0
    }

    fn enable(&mut self) -> Result<()> {
        if self.is_enabled() {
            return Err(Error::AlreadyEnabled);
        }

        // XP selects the extended descriptor format the encoders emit
        self.regs.set_sctlr(self.regs.sctlr() | sctlr::M | sctlr::XP);
        utils::isb();
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
                let l1_word = self.phys.read_word(Self::directory_slot(dir, entry.virt));
                if l1_word & l1::TYPE_MASK != l1::coarse::TYPE {
                    return Err(Error::NotFound);
                }

                self.write_raw(l1_word & l1::coarse::BASE_MASK, entry)
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
            l1::coarse::TYPE => {
                let l2_word = self.phys.read_word(Self::table_slot(l1_word & l1::coarse::BASE_MASK, virt));

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

impl<R: SysRegs, P: PhysAccess> DomainControl for Armv6Mmu<R, P> {
    fn set_domain(&mut self, domain: u8, access: DomainAccess) -> Result<()> {
        let reg = dacr_with_domain(self.regs.dacr(), domain, access)?;
        self.regs.set_dacr(reg);

        Ok(())
    }
}
