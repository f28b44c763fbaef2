//! The simply-assignable fast path: structs that may cross the wire as one
//! raw byte block when the session's transforms permit.

use strait_core::{Result, Status};
use zerocopy::{AsBytes, FromBytes};

use crate::context::{DeContext, SerContext};

/// How strong a layout promise a type makes, and therefore which data
/// flags can still defeat its bulk copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignableKind {
    /// No padding, no variable-width integers, alignment of one.
    /// Copyable under every flag combination.
    Always,
    /// Every field is a fixed-width scalar (or another fixed-size type).
    /// Copyable unless peer alignments may differ.
    FixedSize,
    /// Aligned to one but may contain width-transformable integers.
    /// Copyable unless the integer width transform is active.
    AlignedToOne,
    /// Layout is assignment-equivalent only when nothing is transformed.
    Plain,
}

/// A struct that may be transferred as raw bytes under the conditions of
/// its [`AssignableKind`]. The zerocopy bounds are what make the block
/// copy sound: no padding on the way out, any byte pattern valid on the
/// way in.
pub trait Assignable: AsBytes + FromBytes {
    const KIND: AssignableKind;
    /// True when the type's bytes mean the same thing under either byte
    /// order (single-byte fields, byte arrays).
    const ENDIANNESS_TOLERANT: bool = false;
}

fn settings_allow<T: Assignable>(
    no_optimizations: bool,
    alignment_may_differ: bool,
    integer_sizes_may_differ: bool,
) -> bool {
    if no_optimizations {
        return false;
    }
    match T::KIND {
        AssignableKind::Always => true,
        AssignableKind::FixedSize => !alignment_may_differ,
        AssignableKind::AlignedToOne => !integer_sizes_may_differ,
        AssignableKind::Plain => !alignment_may_differ && !integer_sizes_may_differ,
    }
}

/// Attempt the bulk copy of one struct.
///
/// Outcome protocol, intercepted by the `serialize_common!` family:
/// `Err(NoFurtherProcessingRequired)` means the whole struct was written
/// and the caller must not also emit fields.
/// `Err(ErrorNotSupportedSerializationSettingsForStruct)` means the
/// session settings defeat this type's promise: emit field by field.
/// `Ok(())` means the fast path does not apply here (newer layout than
/// the negotiated interface version, or byte orders differ): emit field
/// by field.
///
/// `latest_version` is the struct's current interface version when the
/// type is versioned; plain nested types pass `None`.
pub fn serialize_assignable<T: Assignable>(
    value: &T,
    latest_version: Option<u32>,
    ctx: &mut SerContext<'_>,
) -> Result {
    if let Some(latest) = latest_version {
        if latest > ctx.interface_version() {
            return Ok(());
        }
    }
    if !T::ENDIANNESS_TOLERANT && ctx.endianness_differs() {
        return Ok(());
    }
    if !settings_allow::<T>(
        ctx.no_assignable_optimizations(),
        ctx.alignment_may_differ(),
        ctx.integer_sizes_may_differ(),
    ) {
        return Err(Status::ErrorNotSupportedSerializationSettingsForStruct);
    }

    ctx.write_bytes(value.as_bytes())?;
    Err(Status::NoFurtherProcessingRequired)
}

/// Mirror of [`serialize_assignable`] with the same outcome protocol.
pub fn deserialize_assignable<T: Assignable>(
    value: &mut T,
    latest_version: Option<u32>,
    ctx: &mut DeContext<'_>,
) -> Result {
    if let Some(latest) = latest_version {
        if latest > ctx.interface_version() {
            return Ok(());
        }
    }
    if !T::ENDIANNESS_TOLERANT && ctx.endianness_differs() {
        return Ok(());
    }
    if !settings_allow::<T>(
        ctx.no_assignable_optimizations(),
        ctx.alignment_may_differ(),
        ctx.integer_sizes_may_differ(),
    ) {
        return Err(Status::ErrorNotSupportedSerializationSettingsForStruct);
    }

    ctx.read_into(value.as_bytes_mut())?;
    Err(Status::NoFurtherProcessingRequired)
}

/// Whole-slice variant: one block write for `n` elements when eligible.
pub fn serialize_assignable_slice<T: Assignable>(
    items: &[T],
    latest_version: Option<u32>,
    ctx: &mut SerContext<'_>,
) -> Result {
    if let Some(latest) = latest_version {
        if latest > ctx.interface_version() {
            return Ok(());
        }
    }
    if !T::ENDIANNESS_TOLERANT && ctx.endianness_differs() {
        return Ok(());
    }
    if !settings_allow::<T>(
        ctx.no_assignable_optimizations(),
        ctx.alignment_may_differ(),
        ctx.integer_sizes_may_differ(),
    ) {
        return Err(Status::ErrorNotSupportedSerializationSettingsForStruct);
    }

    ctx.write_bytes(items.as_bytes())?;
    Err(Status::NoFurtherProcessingRequired)
}

pub fn deserialize_assignable_slice<T: Assignable>(
    items: &mut [T],
    latest_version: Option<u32>,
    ctx: &mut DeContext<'_>,
) -> Result {
    if let Some(latest) = latest_version {
        if latest > ctx.interface_version() {
            return Ok(());
        }
    }
    if !T::ENDIANNESS_TOLERANT && ctx.endianness_differs() {
        return Ok(());
    }
    if !settings_allow::<T>(
        ctx.no_assignable_optimizations(),
        ctx.alignment_may_differ(),
        ctx.integer_sizes_may_differ(),
    ) {
        return Err(Status::ErrorNotSupportedSerializationSettingsForStruct);
    }

    ctx.read_into(items.as_bytes_mut())?;
    Err(Status::NoFurtherProcessingRequired)
}
