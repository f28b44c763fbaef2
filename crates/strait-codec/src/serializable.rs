//! Top-level message structs and the common preludes their generated
//! routines share.

use strait_core::{DataFlags, Id};

use crate::body::Field;
use crate::context::{DeContext, SerContext};
use crate::Result;

/// A struct that can travel as the payload of a data message.
///
/// The constants describe the struct's identity and revision history; the
/// conversion hooks are supplied by types that keep legacy layouts alive.
/// `PRIVATE_VERSIONS` lists every revision this build can still emit or
/// accept, highest first and strictly decreasing, with the leading entry
/// equal to `INTERFACE_VERSION`.
pub trait Serializable: Field + Default + 'static {
    const ID: Id;
    const INTERFACE_VERSION: u32;
    const PRIVATE_VERSIONS: &'static [u32];
    /// True for types that contribute no body bytes. Handlers with an
    /// empty output reply with a status acknowledgment instead of a data
    /// message.
    const EMPTY: bool = false;
    /// Data flags this struct insists on.
    const MANDATORY_DATA_FLAGS: DataFlags = DataFlags::NONE;
    /// Data flags this struct refuses.
    const FORBIDDEN_DATA_FLAGS: DataFlags = DataFlags::NONE;

    /// Lowest revision this build still understands.
    fn minimum_interface_version() -> u32 {
        *Self::PRIVATE_VERSIONS.last().expect("private versions are never empty")
    }

    /// Re-express `self` in the layout of revision `target` and serialize
    /// that, returning `Err(NoFurtherProcessingRequired)` once the legacy
    /// bytes are written. The default refuses: a type without converters
    /// cannot talk to older peers.
    fn to_version(&self, target: u32, ctx: &mut SerContext<'_>) -> Result {
        let _ = (target, ctx);
        Err(crate::Status::ErrorNotSupportedInterfaceVersion)
    }

    /// Decode the layout of revision `target` and fold it into `self`,
    /// returning `Err(NoFurtherProcessingRequired)` once done.
    fn from_version(&mut self, target: u32, ctx: &mut DeContext<'_>) -> Result {
        let _ = (target, ctx);
        Err(crate::Status::ErrorNotSupportedInterfaceVersion)
    }
}

/// Prelude of every generated serialize routine for a [`Serializable`]
/// struct: run the version converter when the negotiated interface version
/// is not this build's, then check the struct's data-flag policy.
///
/// Expands to early returns, so it must open the routine.
#[macro_export]
macro_rules! serialize_common {
    ($ty:ty, $value:expr, $ctx:expr) => {
        match $crate::convert::to_old_struct_if_needed::<$ty>($value, $ctx) {
            Err($crate::Status::NoFurtherProcessingRequired) => return Ok(()),
            Err(err) => return Err(err),
            Ok(()) => {}
        }
        $crate::framing::test_data_flags_compatibility::<$ty>($ctx.data_flags())?;
    };
    ($ty:ty, $value:expr, $ctx:expr, assignable) => {
        $crate::serialize_common!($ty, $value, $ctx);
        $crate::serialize_assignable_field!($ty, $value, $ctx,
            Some(<$ty as $crate::Serializable>::INTERFACE_VERSION));
    };
}

/// Deserialize twin of [`serialize_common!`].
#[macro_export]
macro_rules! deserialize_common {
    ($ty:ty, $value:expr, $ctx:expr) => {
        match $crate::convert::from_old_struct_if_needed::<$ty>($value, $ctx) {
            Err($crate::Status::NoFurtherProcessingRequired) => return Ok(()),
            Err(err) => return Err(err),
            Ok(()) => {}
        }
        $crate::framing::test_data_flags_compatibility::<$ty>($ctx.data_flags())?;
    };
    ($ty:ty, $value:expr, $ctx:expr, assignable) => {
        $crate::deserialize_common!($ty, $value, $ctx);
        $crate::deserialize_assignable_field!($ty, $value, $ctx,
            Some(<$ty as $crate::Serializable>::INTERFACE_VERSION));
    };
}

/// Attempt the block copy of an assignable struct and return early when it
/// fully handled the value. Falls through when the settings or layout
/// demand field-by-field emission. Plain nested types (no interface
/// version) pass `None`.
#[macro_export]
macro_rules! serialize_assignable_field {
    ($ty:ty, $value:expr, $ctx:expr, $latest:expr) => {
        match $crate::assignable::serialize_assignable::<$ty>($value, $latest, $ctx) {
            Err($crate::Status::NoFurtherProcessingRequired) => return Ok(()),
            Ok(()) | Err($crate::Status::ErrorNotSupportedSerializationSettingsForStruct) => {}
            Err(err) => return Err(err),
        }
    };
}

/// Deserialize twin of [`serialize_assignable_field!`].
#[macro_export]
macro_rules! deserialize_assignable_field {
    ($ty:ty, $value:expr, $ctx:expr, $latest:expr) => {
        match $crate::assignable::deserialize_assignable::<$ty>($value, $latest, $ctx) {
            Err($crate::Status::NoFurtherProcessingRequired) => return Ok(()),
            Ok(()) | Err($crate::Status::ErrorNotSupportedSerializationSettingsForStruct) => {}
            Err(err) => return Err(err),
        }
    };
}
