//! Bit manipulation helpers
//!
//! Pure word-sized bit utilities backing the address-space geometry
//! checks.

use crate::Word;

/// True iff `x` is a non-zero power of two.
#[inline]
pub const fn is_power_of_two(x: Word) -> bool {
    (x != 0) && (x & (x - 1)) == 0
}
