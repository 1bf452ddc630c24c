//! Boot-time mappers
//!
//! Two one-shot procedures take the CPU from reset to a fully mapped
//! kernel address space:
//!
//! - Phase A ([`early`]): MMU off, executing at physical addresses.
//!   Writes identity and high-half alias sections straight into the
//!   reserved page directories, programs split/domain/table-base state
//!   and enables translation.
//! - Phase B ([`init`]): MMU on, executing through the high-half alias.
//!   Re-captures hardware state, builds the final small-page kernel
//!   tables in the reserved table region and links them into the live
//!   directory.
//!
//! Boot metadata (memory extent, initrd, machine id) comes in through
//! the [`meta::BootMeta`] collaborator.

pub mod early;
pub mod init;
pub mod meta;

pub use early::{enable_boot_mapping, EarlyHandoff};
pub use init::{init_kernel_tables, BootHandoff};
pub use meta::{BootMeta, StaticMeta};
