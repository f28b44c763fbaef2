//! Version conversion: meeting an older peer at the highest struct
//! revision both sides understand.

use strait_core::version::best_compat_version;
use strait_core::Status;

use crate::context::{DeContext, SerContext};
use crate::serializable::Serializable;
use crate::Result;

/// Serialize-side prelude. When the negotiated interface version is not
/// this build's, find the highest private version of `T` the peer can
/// take. Current version: proceed normally. Peer predates every revision
/// we can emit: `ErrorNotSupportedInterfaceVersion`. Otherwise hand off to
/// the struct's converter, which writes the legacy layout and returns
/// `Err(NoFurtherProcessingRequired)`.
pub fn to_old_struct_if_needed<T: Serializable>(value: &T, ctx: &mut SerContext<'_>) -> Result {
    if !ctx.interface_versions_differ() {
        return Ok(());
    }

    let target = best_compat_version(T::PRIVATE_VERSIONS, ctx.interface_version())
        .ok_or(Status::ErrorNotSupportedInterfaceVersion)?;
    if target == T::INTERFACE_VERSION {
        return Ok(());
    }

    tracing::debug!(id = %T::ID, revision = target, "serializing legacy struct revision");
    value.to_version(target, ctx)
}

/// Deserialize-side dual: decode the peer's revision through the struct's
/// converter and fold it into the current layout.
pub fn from_old_struct_if_needed<T: Serializable>(value: &mut T, ctx: &mut DeContext<'_>) -> Result {
    if !ctx.interface_versions_differ() {
        return Ok(());
    }

    let target = best_compat_version(T::PRIVATE_VERSIONS, ctx.interface_version())
        .ok_or(Status::ErrorNotSupportedInterfaceVersion)?;
    if target == T::INTERFACE_VERSION {
        return Ok(());
    }

    tracing::debug!(id = %T::ID, revision = target, "decoding legacy struct revision");
    value.from_version(target, ctx)
}
