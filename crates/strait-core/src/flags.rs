//! Session and per-message flag sets.
//!
//! Both sets travel as 16-bit words. Bits outside the defined masks are
//! reserved; a receiver ignores them, a sender must leave them zero.

use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::status::{Result, Status};

/// Session-level framing options, negotiated once per message in the
/// common header.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, AsBytes, FromBytes, FromZeroes)]
#[repr(transparent)]
pub struct CommonFlags(u16);

impl CommonFlags {
    pub const NONE: Self = Self(0);
    /// Body scalars travel big-endian instead of little-endian.
    pub const BIG_ENDIAN_FORMAT: Self = Self(0x0001);
    /// `size_t`-domain values travel as 4 bytes instead of 8.
    pub const BITNESS_32: Self = Self(0x0002);
    /// Reserves further framing options behind an extension point.
    pub const EXTENDED_FORMAT: Self = Self(0x0004);

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// A session's flags must include every mandatory bit and none of the
    /// forbidden bits declared by a party.
    pub fn check(self, mandatory: Self, forbidden: Self) -> Result {
        if self.contains(mandatory) && !self.intersects(forbidden) {
            Ok(())
        } else {
            Err(Status::ErrorNotCompatibleCommonFlagsSettings)
        }
    }
}

/// Per-data-message codec options.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, AsBytes, FromBytes, FromZeroes)]
#[repr(transparent)]
pub struct DataFlags(u16);

impl DataFlags {
    pub const NONE: Self = Self(0);
    /// Peer struct layouts may use different alignment.
    pub const ALIGNMENT_MAY_DIFFER: Self = Self(0x0001);
    /// Integer fields are framed with a one-byte size prefix.
    pub const INTEGER_SIZES_MAY_DIFFER: Self = Self(0x0002);
    /// Pointer fields are honored; without this bit they are refused.
    pub const ALLOW_UNMANAGED_POINTERS: Self = Self(0x0004);
    /// Build a pointer/offset map to detect shared and cyclic pointees.
    /// Implies `ALLOW_UNMANAGED_POINTERS`.
    pub const CHECK_RECURSIVE_POINTERS: Self = Self(0x0008);
    /// Sender serialized to an interface version other than its current one.
    pub const INTERFACE_VERSIONS_DIFFER: Self = Self(0x0010);
    /// Never take the bulk-copy fast path, whatever the type promises.
    pub const NO_ASSIGNABLE_OPTIMIZATIONS: Self = Self(0x0020);

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// A message's data flags must include every mandatory bit and none of
    /// the forbidden bits declared by the target struct.
    pub fn check(self, mandatory: Self, forbidden: Self) -> Result {
        if self.contains(mandatory) && !self.intersects(forbidden) {
            Ok(())
        } else {
            Err(Status::ErrorNotCompatibleDataFlagsSettings)
        }
    }
}
