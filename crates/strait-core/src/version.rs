//! Protocol and interface version arithmetic.
//!
//! Protocol versions describe the framing itself; interface versions
//! describe a released set of structs; a struct additionally carries its
//! own private-version history so peers built against different releases
//! can meet at the highest revision both understand.

/// Protocol versions this build speaks, ordered highest first. The leading
/// entry is the preferred version a party advertises.
pub const PROTOCOL_VERSIONS: &[u8] = &[1];

/// Placeholder for "no version negotiated yet".
pub const INTERFACE_VERSION_UNDEFINED: u32 = u32::MAX;

pub fn latest_protocol_version() -> u8 {
    PROTOCOL_VERSIONS[0]
}

pub fn is_protocol_version_supported(version: u8) -> bool {
    PROTOCOL_VERSIONS.contains(&version)
}

/// A received interface version is acceptable iff it falls inside the
/// handler's floor and the struct's current version.
pub fn is_interface_version_compatible(received: u32, minimum: u32, current: u32) -> bool {
    minimum <= received && received <= current
}

/// Highest private version a peer limited to `peer_version` can decode.
///
/// `private_versions` is the struct's revision history, highest first and
/// strictly decreasing. Returns `None` when the peer predates the oldest
/// revision this build knows how to emit.
pub fn best_compat_version(private_versions: &[u32], peer_version: u32) -> Option<u32> {
    debug_assert!(private_versions_well_formed(private_versions));
    private_versions.iter().copied().find(|&v| v <= peer_version)
}

/// Non-empty and strictly decreasing; the leading entry is the struct's
/// current private version.
pub fn private_versions_well_formed(private_versions: &[u32]) -> bool {
    !private_versions.is_empty() && private_versions.windows(2).all(|w| w[0] > w[1])
}
