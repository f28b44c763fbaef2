//! The body codec: per-type dispatch between block transfer and
//! field-by-field traversal.
//!
//! Bytes are emitted and consumed in field-declaration order; recursion
//! into nested values is strictly depth-first. Pointer fields are honored
//! only when the session allows them, and shared/cyclic pointees are
//! reconstructed through the context's pointer map.

use std::cell::RefCell;
use std::rc::Rc;

use strait_core::{CommonFlags, DataFlags, Id, Result, Status};
use zerocopy::{AsBytes, FromBytes};

use crate::assignable::{
    deserialize_assignable_slice, serialize_assignable_slice, Assignable,
};
use crate::context::{DeContext, SerContext};
use crate::primitives::{
    deserialize_size_t, read_integer, read_integer_sized, read_primitive, serialize_size_t,
    write_integer, write_primitive, Primitive, WireInteger,
};

/// A value that can appear in a message body.
///
/// Deserialization fills a default-constructed value in place, which keeps
/// arrays and nested structs allocation-free on the slow path.
pub trait Field: Sized {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result;
    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result;

    /// Slice hook so element types can substitute a single block transfer.
    /// The default walks elements one by one.
    fn serialize_slice(items: &[Self], ctx: &mut SerContext<'_>) -> Result {
        for item in items {
            item.serialize(ctx)?;
        }
        Ok(())
    }

    fn deserialize_slice(items: &mut [Self], ctx: &mut DeContext<'_>) -> Result {
        for item in items {
            item.deserialize(ctx)?;
        }
        Ok(())
    }
}

// ── Integers ─────────────────────────────────────────────────────────────────

/// Block transfer for integer slices. One width prefix covers the whole
/// run; a per-element prefix only appears on the per-element fallback,
/// mirrored exactly on decode.
fn serialize_integer_slice<T>(items: &[T], ctx: &mut SerContext<'_>) -> Result
where
    T: WireInteger + AsBytes,
{
    if !ctx.endianness_differs() || T::SIZE == 1 {
        if ctx.integer_sizes_may_differ() {
            write_primitive(T::SIZE as u8, ctx)?;
        }
        ctx.write_bytes(items.as_bytes())
    } else {
        for item in items {
            write_integer(*item, ctx)?;
        }
        Ok(())
    }
}

fn deserialize_integer_slice<T>(items: &mut [T], ctx: &mut DeContext<'_>) -> Result
where
    T: WireInteger + AsBytes + FromBytes,
{
    if !ctx.endianness_differs() || T::SIZE == 1 {
        if ctx.integer_sizes_may_differ() {
            let sender_size = read_primitive::<u8>(ctx)? as usize;
            if sender_size != T::SIZE {
                for item in items {
                    *item = read_integer_sized(sender_size, ctx)?;
                }
                return Ok(());
            }
        }
        ctx.read_into(items.as_bytes_mut())
    } else {
        for item in items {
            *item = read_integer(ctx)?;
        }
        Ok(())
    }
}

macro_rules! integer_field {
    ($($ty:ty),* $(,)?) => {$(
        impl Field for $ty {
            fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
                write_integer(*self, ctx)
            }

            fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
                *self = read_integer(ctx)?;
                Ok(())
            }

            fn serialize_slice(items: &[Self], ctx: &mut SerContext<'_>) -> Result {
                serialize_integer_slice(items, ctx)
            }

            fn deserialize_slice(items: &mut [Self], ctx: &mut DeContext<'_>) -> Result {
                deserialize_integer_slice(items, ctx)
            }
        }
    )*};
}

integer_field!(u8, i8, u16, i16, u32, i32, u64, i64);

// ── Floats ───────────────────────────────────────────────────────────────────

fn serialize_float_slice<T>(items: &[T], ctx: &mut SerContext<'_>) -> Result
where
    T: Primitive + AsBytes,
{
    if !ctx.endianness_differs() {
        ctx.write_bytes(items.as_bytes())
    } else {
        for item in items {
            write_primitive(*item, ctx)?;
        }
        Ok(())
    }
}

fn deserialize_float_slice<T>(items: &mut [T], ctx: &mut DeContext<'_>) -> Result
where
    T: Primitive + AsBytes + FromBytes,
{
    if !ctx.endianness_differs() {
        ctx.read_into(items.as_bytes_mut())
    } else {
        for item in items {
            *item = read_primitive(ctx)?;
        }
        Ok(())
    }
}

macro_rules! float_field {
    ($($ty:ty),* $(,)?) => {$(
        impl Field for $ty {
            fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
                write_primitive(*self, ctx)
            }

            fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
                *self = read_primitive(ctx)?;
                Ok(())
            }

            fn serialize_slice(items: &[Self], ctx: &mut SerContext<'_>) -> Result {
                serialize_float_slice(items, ctx)
            }

            fn deserialize_slice(items: &mut [Self], ctx: &mut DeContext<'_>) -> Result {
                deserialize_float_slice(items, ctx)
            }
        }
    )*};
}

float_field!(f32, f64);

impl Field for bool {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        write_primitive(u8::from(*self), ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        *self = read_primitive::<u8>(ctx)? != 0;
        Ok(())
    }
}

// ── Shared core types ────────────────────────────────────────────────────────

impl Field for Id {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        self.high.serialize(ctx)?;
        self.low.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        self.high.deserialize(ctx)?;
        self.low.deserialize(ctx)
    }
}

impl Field for CommonFlags {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        self.bits().serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        let mut bits = 0u16;
        bits.deserialize(ctx)?;
        *self = CommonFlags::from_bits(bits);
        Ok(())
    }
}

impl Field for DataFlags {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        self.bits().serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        let mut bits = 0u16;
        bits.deserialize(ctx)?;
        *self = DataFlags::from_bits(bits);
        Ok(())
    }
}

// ── Compounds ────────────────────────────────────────────────────────────────

impl<T: Field, const N: usize> Field for [T; N] {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        T::serialize_slice(self, ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        T::deserialize_slice(self, ctx)
    }
}

impl<T: Field + Default> Field for Vec<T> {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        serialize_size_t(self.len() as u64, ctx)?;
        T::serialize_slice(self, ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        let len = usize::try_from(deserialize_size_t(ctx)?)
            .map_err(|_| Status::ErrorDataCorrupted)?;
        // Every non-empty element costs at least one wire byte, so a length
        // beyond the remaining input cannot be honest.
        if std::mem::size_of::<T>() != 0 && len > ctx.remaining() {
            return Err(Status::ErrorDataCorrupted);
        }
        let mut items: Vec<T> = Vec::new();
        items.try_reserve(len).map_err(|_| Status::ErrorNoMemory)?;
        items.resize_with(len, T::default);
        T::deserialize_slice(&mut items, ctx)?;
        *self = items;
        Ok(())
    }
}

impl Field for String {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        serialize_size_t(self.len() as u64, ctx)?;
        ctx.write_bytes(self.as_bytes())
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        let len = usize::try_from(deserialize_size_t(ctx)?)
            .map_err(|_| Status::ErrorDataCorrupted)?;
        if len > ctx.remaining() {
            return Err(Status::ErrorDataCorrupted);
        }
        let bytes = ctx.read_bytes(len)?.to_vec();
        *self = String::from_utf8(bytes).map_err(|_| Status::ErrorDataCorrupted)?;
        Ok(())
    }
}

// ── Pointer graphs ───────────────────────────────────────────────────────────

/// A nullable graph edge. Serializing one requires
/// `ALLOW_UNMANAGED_POINTERS`; shared and cyclic pointees additionally
/// require `CHECK_RECURSIVE_POINTERS`, under which each pointee is written
/// once and later references carry the offset of its first occurrence.
///
/// On decode, each new pointee is allocated once, registered with the
/// context's added-pointers container, and shared references are restored
/// so that `Rc::ptr_eq` holds exactly where it held for the sender.
impl<T: Field + Default + 'static> Field for Option<Rc<RefCell<T>>> {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        if !ctx.allow_unmanaged_pointers() {
            return Err(Status::ErrorNotSupportedSerializationSettingsForStruct);
        }

        if ctx.check_recursive_pointers() {
            if !ctx.has_pointers_map() {
                return Err(Status::ErrorInvalidArgument);
            }
            match self {
                None => serialize_size_t(0, ctx),
                Some(rc) => {
                    let address = Rc::as_ptr(rc) as usize;
                    if let Some(offset) = ctx.pointer_offset(address) {
                        serialize_size_t(offset, ctx)
                    } else {
                        serialize_size_t(1, ctx)?;
                        let offset = ctx.position() as u64;
                        ctx.record_pointer(address, offset)?;
                        rc.borrow().serialize(ctx)
                    }
                }
            }
        } else {
            match self {
                None => write_primitive(0u8, ctx),
                Some(rc) => {
                    write_primitive(1u8, ctx)?;
                    rc.borrow().serialize(ctx)
                }
            }
        }
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        if !ctx.allow_unmanaged_pointers() {
            return Err(Status::ErrorNotSupportedSerializationSettingsForStruct);
        }

        if ctx.check_recursive_pointers() {
            if !ctx.has_pointers_map() {
                return Err(Status::ErrorInvalidArgument);
            }
            match deserialize_size_t(ctx)? {
                0 => {
                    *self = None;
                    Ok(())
                }
                1 => {
                    let rc = Rc::new(RefCell::new(T::default()));
                    let offset = ctx.tell() as u64;
                    ctx.record_decoded_pointer(offset, rc.clone())?;
                    ctx.track_allocation(rc.clone())?;
                    rc.borrow_mut().deserialize(ctx)?;
                    *self = Some(rc);
                    Ok(())
                }
                offset => {
                    // A back-reference can only point at already-read bytes.
                    if offset >= ctx.tell() as u64 {
                        return Err(Status::ErrorInternal);
                    }
                    let pointee =
                        ctx.lookup_pointer(offset).ok_or(Status::ErrorDataCorrupted)?;
                    let rc = pointee
                        .downcast::<RefCell<T>>()
                        .map_err(|_| Status::ErrorInvalidType)?;
                    *self = Some(rc);
                    Ok(())
                }
            }
        } else {
            match read_primitive::<u8>(ctx)? {
                0 => {
                    *self = None;
                    Ok(())
                }
                1 => {
                    let rc = Rc::new(RefCell::new(T::default()));
                    ctx.track_allocation(rc.clone())?;
                    rc.borrow_mut().deserialize(ctx)?;
                    *self = Some(rc);
                    Ok(())
                }
                _ => Err(Status::ErrorDataCorrupted),
            }
        }
    }
}

// ── Assignable struct helpers ────────────────────────────────────────────────

/// Slice path for assignable element types: one block when the session
/// permits, per-element traversal otherwise. Used by generated
/// `serialize_slice` overrides.
pub fn serialize_assignable_elements<T>(
    items: &[T],
    latest_version: Option<u32>,
    ctx: &mut SerContext<'_>,
) -> Result
where
    T: Assignable + Field,
{
    match serialize_assignable_slice(items, latest_version, ctx) {
        Err(Status::NoFurtherProcessingRequired) => Ok(()),
        Ok(()) | Err(Status::ErrorNotSupportedSerializationSettingsForStruct) => {
            for item in items {
                item.serialize(ctx)?;
            }
            Ok(())
        }
        Err(other) => Err(other),
    }
}

pub fn deserialize_assignable_elements<T>(
    items: &mut [T],
    latest_version: Option<u32>,
    ctx: &mut DeContext<'_>,
) -> Result
where
    T: Assignable + Field,
{
    match deserialize_assignable_slice(items, latest_version, ctx) {
        Err(Status::NoFurtherProcessingRequired) => Ok(()),
        Ok(()) | Err(Status::ErrorNotSupportedSerializationSettingsForStruct) => {
            for item in items {
                item.deserialize(ctx)?;
            }
            Ok(())
        }
        Err(other) => Err(other),
    }
}

/// Implements [`Field`] for a fieldless enum with an explicit integer
/// representation. The discriminant travels through the integer codec;
/// a value this build does not know is `ErrorDataCorrupted`.
#[macro_export]
macro_rules! enum_field {
    ($ty:ty as $repr:ty { $($variant:path = $value:literal),+ $(,)? }) => {
        impl $crate::body::Field for $ty {
            fn serialize(&self, ctx: &mut $crate::context::SerContext<'_>) -> $crate::Result {
                $crate::primitives::write_integer(*self as $repr, ctx)
            }

            fn deserialize(&mut self, ctx: &mut $crate::context::DeContext<'_>) -> $crate::Result {
                let raw: $repr = $crate::primitives::read_integer(ctx)?;
                *self = match raw {
                    $( $value => $variant, )+
                    _ => return Err($crate::Status::ErrorDataCorrupted),
                };
                Ok(())
            }
        }
    };
}
