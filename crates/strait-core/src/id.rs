//! 128-bit struct identifiers.

use zerocopy::{AsBytes, FromBytes, FromZeroes};

/// Identifies one logical struct type across peers. Equal ids received from
/// different parties denote the same type, whatever revision each side was
/// built against.
///
/// On the wire an id occupies 16 bytes: `high` then `low`, each
/// little-endian, independent of the session byte order (ids appear in
/// framing, which is always little-endian).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct Id {
    pub high: u64,
    pub low: u64,
}

static_assertions::assert_eq_size!(Id, [u8; 16]);

impl Id {
    pub const fn new(high: u64, low: u64) -> Self {
        Self { high, low }
    }

    /// Derive a stable id from a canonical type name. The input byte string
    /// is protocol-level identity and must never change for a given type
    /// once peers in the wild know it.
    pub fn from_name(name: &[u8]) -> Self {
        let hash = blake3::hash(name);
        let bytes = hash.as_bytes();
        Self {
            high: u64::from_le_bytes(bytes[0..8].try_into().unwrap()),
            low: u64::from_le_bytes(bytes[8..16].try_into().unwrap()),
        }
    }

    /// Wire form: 16 little-endian bytes.
    pub fn to_wire_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.high.to_le_bytes());
        out[8..].copy_from_slice(&self.low.to_le_bytes());
        out
    }

    pub fn from_wire_bytes(bytes: [u8; 16]) -> Self {
        Self {
            high: u64::from_le_bytes(bytes[..8].try_into().unwrap()),
            low: u64::from_le_bytes(bytes[8..].try_into().unwrap()),
        }
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b = self.to_wire_bytes();
        write!(
            f,
            "{}-{}-{}-{}-{}",
            hex::encode(&b[0..4]),
            hex::encode(&b[4..6]),
            hex::encode(&b[6..8]),
            hex::encode(&b[8..10]),
            hex::encode(&b[10..16]),
        )
    }
}
