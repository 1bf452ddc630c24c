//! CP15 system-register access
//!
//! The backends never touch the coprocessor directly; all register
//! traffic goes through [`SysRegs`] so the index arithmetic and
//! descriptor encoding are host-testable against a mock register file.

use crate::Word;

/// System control register (SCTLR) bits
pub mod sctlr {
    use crate::Word;

    /// MMU enable
    pub const M: Word = 1 << 0;
    /// Subpage AP bits disabled (ARMv6 extended page tables)
    pub const XP: Word = 1 << 23;
    /// Access flag enable (ARMv7 simplified access model)
    pub const AFE: Word = 1 << 29;
}

/// Translation table base control register (TTBCR) fields
pub mod ttbcr {
    use crate::Word;

    /// Split divisor N, bits [2:0]
    pub const N_MASK: Word = 0b111;
}

/// Translation table base registers (TTBR0/TTBR1)
pub mod ttbr {
    use crate::Word;

    /// Base address field of a 16 KiB aligned table; the low bits hold
    /// walk attributes and must be masked off when reading the address
    /// back.
    pub const BASE_MASK: Word = 0xffff_c000;
}

/// The CP15 registers the short-descriptor backends program.
///
/// Register access itself cannot fail; invalid values are caught by the
/// callers before they reach this layer.
pub trait SysRegs {
    fn sctlr(&self) -> Word;
    fn set_sctlr(&mut self, value: Word);

    fn ttbr0(&self) -> Word;
    fn set_ttbr0(&mut self, value: Word);

    fn ttbr1(&self) -> Word;
    fn set_ttbr1(&mut self, value: Word);

    fn ttbcr(&self) -> Word;
    fn set_ttbcr(&mut self, value: Word);

    fn dacr(&self) -> Word;
    fn set_dacr(&mut self, value: Word);

    /// Invalidate the entire unified TLB (TLBIALL).
    fn invalidate_tlb(&mut self);
}

/// Live coprocessor access on the target.
#[cfg(target_arch = "arm")]
pub struct Cp15;

#[cfg(target_arch = "arm")]
impl SysRegs for Cp15 {
    fn sctlr(&self) -> Word {
        let value: Word;
        unsafe { core::arch::asm!("mrc p15, 0, {}, c1, c0, 0", out(reg) value, options(nostack, preserves_flags)) };
        value
    }

    fn set_sctlr(&mut self, value: Word) {
        unsafe { core::arch::asm!("mcr p15, 0, {}, c1, c0, 0", in(reg) value, options(nostack, preserves_flags)) };
    }

    fn ttbr0(&self) -> Word {
        let value: Word;
        unsafe { core::arch::asm!("mrc p15, 0, {}, c2, c0, 0", out(reg) value, options(nostack, preserves_flags)) };
        value
    }

    fn set_ttbr0(&mut self, value: Word) {
        unsafe { core::arch::asm!("mcr p15, 0, {}, c2, c0, 0", in(reg) value, options(nostack, preserves_flags)) };
    }

    fn ttbr1(&self) -> Word {
        let value: Word;
        unsafe { core::arch::asm!("mrc p15, 0, {}, c2, c0, 1", out(reg) value, options(nostack, preserves_flags)) };
        value
    }

    fn set_ttbr1(&mut self, value: Word) {
        unsafe { core::arch::asm!("mcr p15, 0, {}, c2, c0, 1", in(reg) value, options(nostack, preserves_flags)) };
    }

    fn ttbcr(&self) -> Word {
        let value: Word;
        unsafe { core::arch::asm!("mrc p15, 0, {}, c2, c0, 2", out(reg) value, options(nostack, preserves_flags)) };
        value
    }

    fn set_ttbcr(&mut self, value: Word) {
        unsafe { core::arch::asm!("mcr p15, 0, {}, c2, c0, 2", in(reg) value, options(nostack, preserves_flags)) };
    }

    fn dacr(&self) -> Word {
        let value: Word;
        unsafe { core::arch::asm!("mrc p15, 0, {}, c3, c0, 0", out(reg) value, options(nostack, preserves_flags)) };
        value
    }

    fn set_dacr(&mut self, value: Word) {
        unsafe { core::arch::asm!("mcr p15, 0, {}, c3, c0, 0", in(reg) value, options(nostack, preserves_flags)) };
    }

    fn invalidate_tlb(&mut self) {
        unsafe { core::arch::asm!("mcr p15, 0, {}, c8, c7, 0", in(reg) 0u32, options(nostack, preserves_flags)) };
    }
}

/// In-memory register file for host tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockRegs {
    pub sctlr: Word,
    pub ttbr0: Word,
    pub ttbr1: Word,
    pub ttbcr: Word,
    pub dacr: Word,
    pub tlb_flushes: usize,
}

#[cfg(test)]
impl MockRegs {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl SysRegs for MockRegs {
    fn sctlr(&self) -> Word {
        self.sctlr
    }

    fn set_sctlr(&mut self, value: Word) {
        self.sctlr = value;
    }

    fn ttbr0(&self) -> Word {
        self.ttbr0
    }

    fn set_ttbr0(&mut self, value: Word) {
        self.ttbr0 = value;
    }

    fn ttbr1(&self) -> Word {
        self.ttbr1
    }

    fn set_ttbr1(&mut self, value: Word) {
        self.ttbr1 = value;
    }

    fn ttbcr(&self) -> Word {
        self.ttbcr
    }

    fn set_ttbcr(&mut self, value: Word) {
        self.ttbcr = value;
    }

    fn dacr(&self) -> Word {
        self.dacr
    }

    fn set_dacr(&mut self, value: Word) {
        self.dacr = value;
    }

    fn invalidate_tlb(&mut self) {
        self.tlb_flushes += 1;
    }
}
