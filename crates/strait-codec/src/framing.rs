//! Context processor: the common header and the data sub-headers.
//!
//! Exactly one common header opens every message. Header fields are always
//! little-endian, whatever `BIG_ENDIAN_FORMAT` says, so the byte-order bit
//! itself can be read before any swap logic runs.

use strait_core::version::{
    is_interface_version_compatible, is_protocol_version_supported, INTERFACE_VERSION_UNDEFINED,
};
use strait_core::{BinWalker, CommonFlags, DataFlags, Id, SerSink, Status};

use crate::context::{CommonContext, DeContext, MessageType, SerContext};
use crate::serializable::Serializable;
use crate::Result;

/// On-wire size of the common header: protocol version, message type,
/// common flags.
pub const COMMON_HEADER_SIZE: usize = 4;

/// Write the common header straight to a sink.
pub fn write_common_header(
    protocol_version: u8,
    message_type: MessageType,
    common_flags: CommonFlags,
    sink: &mut dyn SerSink,
) -> Result {
    if !is_protocol_version_supported(protocol_version) {
        return Err(Status::ErrorNotSupportedProtocolVersion);
    }
    sink.write_bytes(&[protocol_version, message_type as u8])?;
    sink.write_bytes(&common_flags.bits().to_le_bytes())
}

/// Write the common header of the message a context is assembling.
pub fn serialize_common_context(ctx: &mut SerContext<'_>) -> Result {
    if !is_protocol_version_supported(ctx.protocol_version()) {
        return Err(Status::ErrorNotSupportedProtocolVersion);
    }
    let header = [ctx.protocol_version(), ctx.message_type() as u8];
    ctx.write_bytes(&header)?;
    let flags = ctx.common_flags().bits().to_le_bytes();
    ctx.write_bytes(&flags)
}

/// Read a common header. Protocol-version acceptance is the caller's
/// policy (a server checks its advertised list and answers with a status
/// reply on failure).
pub fn deserialize_common_context(walker: &mut BinWalker) -> Result<CommonContext> {
    let [protocol_version] = walker.read_array::<1>()?;
    let [raw_type] = walker.read_array::<1>()?;
    let message_type = MessageType::try_from(raw_type)?;
    let common_flags = CommonFlags::from_bits(u16::from_le_bytes(walker.read_array::<2>()?));
    Ok(CommonContext::new(protocol_version, message_type, common_flags))
}

/// Write the data sub-header for a `T`-typed payload and settle the
/// context's version/pointer bookkeeping.
pub fn serialize_data_context<T: Serializable>(ctx: &mut SerContext<'_>) -> Result {
    if ctx.interface_version() == INTERFACE_VERSION_UNDEFINED {
        ctx.set_interface_version(T::INTERFACE_VERSION);
    }
    if !is_interface_version_compatible(
        ctx.interface_version(),
        T::minimum_interface_version(),
        T::INTERFACE_VERSION,
    ) {
        return Err(Status::ErrorNotSupportedInterfaceVersion);
    }

    if ctx.check_recursive_pointers() {
        if !ctx.has_pointers_map() {
            return Err(Status::ErrorInvalidArgument);
        }
        ctx.add_data_flags(DataFlags::ALLOW_UNMANAGED_POINTERS);
    }

    if T::INTERFACE_VERSION != ctx.interface_version() {
        ctx.set_interface_versions_differ(true);
        ctx.add_data_flags(DataFlags::INTERFACE_VERSIONS_DIFFER);
    }

    ctx.write_bytes(&T::ID.to_wire_bytes())?;
    let flags = ctx.data_flags().bits().to_le_bytes();
    ctx.write_bytes(&flags)?;
    let version = ctx.interface_version().to_le_bytes();
    ctx.write_bytes(&version)?;

    if ctx.message_type() == MessageType::InOut {
        if ctx.output_interface_version() == INTERFACE_VERSION_UNDEFINED {
            return Err(Status::ErrorInvalidArgument);
        }
        let out_version = ctx.output_interface_version().to_le_bytes();
        ctx.write_bytes(&out_version)?;
    }

    Ok(())
}

/// Read the data sub-header into the context and return the target id.
pub fn deserialize_data_context(ctx: &mut DeContext<'_>) -> Result<Id> {
    let id = Id::from_wire_bytes(ctx.read_array::<16>()?);
    ctx.set_id(id);

    let flags = DataFlags::from_bits(u16::from_le_bytes(ctx.read_array::<2>()?));
    ctx.set_data_flags(flags);

    let version = u32::from_le_bytes(ctx.read_array::<4>()?);
    ctx.set_interface_version(version);

    if ctx.message_type() == MessageType::InOut {
        let out_version = u32::from_le_bytes(ctx.read_array::<4>()?);
        ctx.set_output_interface_version(out_version);
    }

    Ok(id)
}

/// Typed validation of a decoded data sub-header, run once the target
/// struct is known.
///
/// `minimum_supported` is normally `T::minimum_interface_version()`;
/// handlers may raise the floor above the interface-wide minimum.
pub fn deserialize_data_context_postprocess<T: Serializable>(
    ctx: &mut DeContext<'_>,
    id: Id,
    minimum_supported: u32,
) -> Result {
    if T::ID != id {
        return Err(Status::ErrorMismatchOfStructId);
    }

    if ctx.allow_unmanaged_pointers() && !ctx.has_added_pointers() {
        return Err(Status::ErrorInvalidArgument);
    }
    if ctx.check_recursive_pointers() {
        if !ctx.has_pointers_map() {
            return Err(Status::ErrorInvalidArgument);
        }
        if !ctx.allow_unmanaged_pointers() {
            return Err(Status::ErrorNotCompatibleDataFlagsSettings);
        }
    }

    if !is_interface_version_compatible(
        ctx.interface_version(),
        minimum_supported,
        T::INTERFACE_VERSION,
    ) {
        return Err(Status::ErrorNotSupportedInterfaceVersion);
    }
    if ctx.interface_version() != T::INTERFACE_VERSION {
        ctx.set_interface_versions_differ(true);
    }

    Ok(())
}

/// In-out variant: additionally validates the requested output version
/// against the output struct's range.
pub fn deserialize_in_out_data_context_postprocess<In: Serializable, Out: Serializable>(
    ctx: &mut DeContext<'_>,
    id: Id,
    minimum_input_supported: u32,
    minimum_output_supported: u32,
) -> Result {
    deserialize_data_context_postprocess::<In>(ctx, id, minimum_input_supported)?;

    if ctx.output_interface_version() != INTERFACE_VERSION_UNDEFINED
        && !is_interface_version_compatible(
            ctx.output_interface_version(),
            minimum_output_supported,
            Out::INTERFACE_VERSION,
        )
    {
        return Err(Status::ErrorNotSupportedInOutInterfaceVersion);
    }

    Ok(())
}

/// Check a message's data flags against a struct's declared policy.
pub fn test_data_flags_compatibility<T: Serializable>(flags: DataFlags) -> Result {
    flags.check(T::MANDATORY_DATA_FLAGS, T::FORBIDDEN_DATA_FLAGS)
}

/// Serialize one complete data message: common header, data sub-header,
/// body.
pub fn serialize_message<T: Serializable>(value: &T, ctx: &mut SerContext<'_>) -> Result {
    serialize_common_context(ctx)?;
    serialize_data_context::<T>(ctx)?;
    value.serialize(ctx)
}

/// Decode one complete data message addressed to `T`, wiring up pointer
/// bookkeeping as the message's flags demand. Client-side counterpart of
/// the server dispatch path.
pub fn deserialize_message<T: Serializable>(walker: &mut BinWalker) -> Result<T> {
    let common = deserialize_common_context(walker)?;
    if !is_protocol_version_supported(common.protocol_version) {
        return Err(Status::ErrorNotSupportedProtocolVersion);
    }
    if !matches!(common.message_type, MessageType::Data | MessageType::InOut) {
        return Err(Status::ErrorInvalidArgument);
    }

    let mut pointers_map = std::collections::HashMap::new();
    let mut added_pointers = crate::context::AddedPointers::new();

    let mut ctx = DeContext::new(walker, common);
    let id = deserialize_data_context(&mut ctx)?;
    if ctx.allow_unmanaged_pointers() {
        ctx.set_added_pointers(&mut added_pointers);
    }
    if ctx.check_recursive_pointers() {
        ctx.set_pointers_map(&mut pointers_map);
    }
    deserialize_data_context_postprocess::<T>(&mut ctx, id, T::minimum_interface_version())?;

    let mut value = T::default();
    value.deserialize(&mut ctx)?;
    Ok(value)
}
