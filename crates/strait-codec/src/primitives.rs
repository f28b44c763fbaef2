//! Scalar codec: endianness, the integer width transform, and the
//! negotiated-width `size_t` domain.

use strait_core::{Result, Status};

use crate::context::{DeContext, SerContext};

/// Widest integer the wire format admits. A size prefix above this is
/// rejected before any read.
pub const MAX_INTEGER_WIRE_SIZE: usize = 8;

/// A fixed-layout scalar the codec can emit directly, honoring the
/// session byte order.
pub trait Primitive: Copy + Default {
    const SIZE: usize;

    fn write_wire(self, big_endian: bool, out: &mut [u8]);
    fn read_wire(big_endian: bool, bytes: &[u8]) -> Self;
}

macro_rules! primitive_impl {
    ($($ty:ty),* $(,)?) => {$(
        impl Primitive for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            fn write_wire(self, big_endian: bool, out: &mut [u8]) {
                let bytes = if big_endian {
                    self.to_be_bytes()
                } else {
                    self.to_le_bytes()
                };
                out.copy_from_slice(&bytes);
            }

            fn read_wire(big_endian: bool, bytes: &[u8]) -> Self {
                let array = bytes.try_into().expect("caller sized the read");
                if big_endian {
                    <$ty>::from_be_bytes(array)
                } else {
                    <$ty>::from_le_bytes(array)
                }
            }
        }
    )*};
}

primitive_impl!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// An integer that takes part in the width transform: under
/// `INTEGER_SIZES_MAY_DIFFER` it is framed by a one-byte size prefix and
/// may be widened or narrowed on decode.
pub trait WireInteger: Primitive {
    const SIGNED: bool;

    /// Value as a 128-bit signed integer, sign- or zero-extended per the
    /// type's signedness.
    fn to_wide(self) -> i128;
    /// Lossless by construction; callers range-check first.
    fn from_wide(wide: i128) -> Self;
}

macro_rules! wire_integer_impl {
    ($($ty:ty => $signed:expr),* $(,)?) => {$(
        impl WireInteger for $ty {
            const SIGNED: bool = $signed;

            fn to_wide(self) -> i128 {
                self as i128
            }

            fn from_wide(wide: i128) -> Self {
                wide as $ty
            }
        }
    )*};
}

wire_integer_impl!(
    u8 => false, u16 => false, u32 => false, u64 => false,
    i8 => true, i16 => true, i32 => true, i64 => true,
);

/// Emit one scalar at its native width, swapped to the session byte order.
pub fn write_primitive<T: Primitive>(value: T, ctx: &mut SerContext<'_>) -> Result {
    let mut buf = [0u8; MAX_INTEGER_WIRE_SIZE];
    value.write_wire(ctx.big_endian(), &mut buf[..T::SIZE]);
    ctx.write_bytes(&buf[..T::SIZE])
}

pub fn read_primitive<T: Primitive>(ctx: &mut DeContext<'_>) -> Result<T> {
    let big_endian = ctx.big_endian();
    let bytes = ctx.read_bytes(T::SIZE)?;
    Ok(T::read_wire(big_endian, bytes))
}

/// Emit one integer, with the sender-size prefix when the session allows
/// integer widths to differ.
pub fn write_integer<T: WireInteger>(value: T, ctx: &mut SerContext<'_>) -> Result {
    if ctx.integer_sizes_may_differ() {
        write_primitive(T::SIZE as u8, ctx)?;
    }
    write_primitive(value, ctx)
}

pub fn read_integer<T: WireInteger>(ctx: &mut DeContext<'_>) -> Result<T> {
    if ctx.integer_sizes_may_differ() {
        let sender_size = read_primitive::<u8>(ctx)? as usize;
        read_integer_sized(sender_size, ctx)
    } else {
        read_primitive(ctx)
    }
}

/// Decode one integer that the sender emitted at `sender_size` bytes.
///
/// Widening extends by the target type's signedness. Narrowing is checked:
/// a value the target cannot represent is `ErrorDataCorrupted` (a
/// buffer-level `ErrorOverflow` surfaced at the schema level).
pub fn read_integer_sized<T: WireInteger>(sender_size: usize, ctx: &mut DeContext<'_>) -> Result<T> {
    if sender_size > MAX_INTEGER_WIRE_SIZE {
        return Err(Status::ErrorTypeSizeIsTooBig);
    }
    if sender_size == 0 {
        return Err(Status::ErrorDataCorrupted);
    }
    if sender_size == T::SIZE {
        return read_primitive(ctx);
    }

    let big_endian = ctx.big_endian();
    let bytes = ctx.read_bytes(sender_size)?;
    let wide = decode_wide(bytes, big_endian, T::SIGNED);
    if sender_size > T::SIZE && !fits_in::<T>(wide) {
        return Err(Status::ErrorDataCorrupted);
    }
    Ok(T::from_wide(wide))
}

fn decode_wide(bytes: &[u8], big_endian: bool, signed: bool) -> i128 {
    let mut accum: u128 = 0;
    if big_endian {
        for &byte in bytes {
            accum = (accum << 8) | u128::from(byte);
        }
    } else {
        for &byte in bytes.iter().rev() {
            accum = (accum << 8) | u128::from(byte);
        }
    }

    let bits = bytes.len() * 8;
    if signed && accum >> (bits - 1) & 1 == 1 {
        // Sign-extend from the sender's sign bit.
        accum |= u128::MAX << bits;
    }
    accum as i128
}

fn fits_in<T: WireInteger>(wide: i128) -> bool {
    let bits = (T::SIZE * 8) as u32;
    if T::SIGNED {
        let min = -(1i128 << (bits - 1));
        let max = (1i128 << (bits - 1)) - 1;
        min <= wide && wide <= max
    } else {
        wide >= 0 && wide <= (1i128 << bits) - 1
    }
}

/// Emit a `size_t`-domain value (lengths, offsets, pointer markers) at the
/// session-negotiated width: 4 bytes under `BITNESS_32`, 8 otherwise,
/// independent of this build's native width.
pub fn serialize_size_t(value: u64, ctx: &mut SerContext<'_>) -> Result {
    if ctx.bitness32() {
        let narrow = u32::try_from(value).map_err(|_| Status::ErrorOverflow)?;
        write_primitive(narrow, ctx)
    } else {
        write_primitive(value, ctx)
    }
}

pub fn deserialize_size_t(ctx: &mut DeContext<'_>) -> Result<u64> {
    if ctx.bitness32() {
        Ok(u64::from(read_primitive::<u32>(ctx)?))
    } else {
        read_primitive(ctx)
    }
}
