//! Architecture-specific code
//!
//! One MMU backend per supported architecture revision, selected at
//! build time through cargo features. Everything above this module
//! programs against [`crate::mm::mmu::MmuBackend`]; the `ArchMmu` alias
//! names the revision this kernel was built for.

pub mod arm;

cfg_if::cfg_if! {
    if #[cfg(feature = "armv7")] {
        pub use arm::armv7::Armv7Mmu as ArchMmu;
    } else if #[cfg(feature = "armv6")] {
        pub use arm::armv6::Armv6Mmu as ArchMmu;
    } else {
        compile_error!("enable at least one of the armv6/armv7 features");
    }
}
