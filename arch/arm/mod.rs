//! ARM (AArch32) support
//!
//! Shared pieces of the 32-bit ARM world: the CP15 system-register
//! seam and the domain access-control model both short-descriptor
//! backends use.

use crate::{Error, Result};

pub mod coproc;

#[cfg(feature = "armv6")]
pub mod armv6;
#[cfg(feature = "armv7")]
pub mod armv7;

/// Highest valid domain index (DACR holds 16 two-bit fields)
pub const DOMAIN_MAX: u8 = 15;

/// DACR access field values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DomainAccess {
    /// All accesses fault
    NoAccess = 0b00,
    /// Accesses checked against descriptor permission bits
    Client = 0b01,
    /// Accesses never checked (permission bits ignored)
    Manager = 0b11,
}

/// Domain access-control programming, implemented by every ARM backend.
pub trait DomainControl {
    /// Set the access field of one domain, leaving the others untouched.
    fn set_domain(&mut self, domain: u8, access: DomainAccess) -> Result<()>;
}

/// Read-modify-write of one two-bit DACR field
pub(crate) fn dacr_with_domain(dacr: crate::Word, domain: u8, access: DomainAccess) -> Result<crate::Word> {
    if domain > DOMAIN_MAX {
        return Err(Error::InvalidArgument);
    }

    let shift = domain as u32 * 2;
    Ok((dacr & !(0b11 << shift)) | ((access as crate::Word) << shift))
}
