//! Status messages: structured error replies a party sends instead of a
//! data reply, rich enough for the peer to retry with adjusted parameters.

use strait_core::status::NO_ERROR_CODE;
use strait_core::{BinWalker, CommonFlags, DataFlags, Id, SerSink, Status};

use crate::context::MessageType;
use crate::framing::{deserialize_common_context, write_common_header};
use crate::Result;

/// Decoded form of a status message. Bodies are bit-exact and
/// discriminated by the status code; codes not listed here carry no body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusReply {
    /// Explicit acknowledgment (`NO_ERROR_CODE`). Never sent in place of a
    /// data reply; only when the peer asked for an acknowledgment.
    Ack,
    /// The peer's protocol range and what the session must carry.
    NotSupportedProtocolVersion {
        versions: Vec<u8>,
        mandatory_common_flags: CommonFlags,
    },
    /// The acceptable interface-version range for the offending struct.
    NotSupportedInterfaceVersion {
        id: Id,
        min_supported: u32,
        current: u32,
    },
    /// Ranges for both sides of an in-out request.
    NotSupportedInOutInterfaceVersion {
        input_id: Id,
        input_min_supported: u32,
        input_current: u32,
        output_id: Id,
        output_min_supported: u32,
        output_current: u32,
    },
    NotCompatibleCommonFlags {
        forbidden: CommonFlags,
        mandatory: CommonFlags,
    },
    NotCompatibleDataFlags {
        forbidden: DataFlags,
        mandatory: DataFlags,
        id: Id,
    },
    /// Any other status; no body.
    Other(Status),
}

impl StatusReply {
    /// The `Status` this reply reports, `None` for an acknowledgment.
    pub fn status(&self) -> Option<Status> {
        Status::from_code(self.code())
    }

    pub fn code(&self) -> u32 {
        match self {
            StatusReply::Ack => NO_ERROR_CODE,
            StatusReply::NotSupportedProtocolVersion { .. } => {
                Status::ErrorNotSupportedProtocolVersion.code()
            }
            StatusReply::NotSupportedInterfaceVersion { .. } => {
                Status::ErrorNotSupportedInterfaceVersion.code()
            }
            StatusReply::NotSupportedInOutInterfaceVersion { .. } => {
                Status::ErrorNotSupportedInOutInterfaceVersion.code()
            }
            StatusReply::NotCompatibleCommonFlags { .. } => {
                Status::ErrorNotCompatibleCommonFlagsSettings.code()
            }
            StatusReply::NotCompatibleDataFlags { .. } => {
                Status::ErrorNotCompatibleDataFlagsSettings.code()
            }
            StatusReply::Other(status) => status.code(),
        }
    }
}

/// Serialize a full status message: common header, code, body.
pub fn serialize_status(
    protocol_version: u8,
    common_flags: CommonFlags,
    reply: &StatusReply,
    out: &mut dyn SerSink,
) -> Result {
    write_common_header(protocol_version, MessageType::Status, common_flags, out)?;
    out.write_bytes(&reply.code().to_le_bytes())?;

    match reply {
        StatusReply::Ack | StatusReply::Other(_) => Ok(()),
        StatusReply::NotSupportedProtocolVersion {
            versions,
            mandatory_common_flags,
        } => {
            let count = u8::try_from(versions.len()).map_err(|_| Status::ErrorInvalidArgument)?;
            out.write_bytes(&[count])?;
            out.write_bytes(versions)?;
            out.write_bytes(&mandatory_common_flags.bits().to_le_bytes())
        }
        StatusReply::NotSupportedInterfaceVersion {
            id,
            min_supported,
            current,
        } => {
            out.write_bytes(&id.to_wire_bytes())?;
            out.write_bytes(&min_supported.to_le_bytes())?;
            out.write_bytes(&current.to_le_bytes())
        }
        StatusReply::NotSupportedInOutInterfaceVersion {
            input_id,
            input_min_supported,
            input_current,
            output_id,
            output_min_supported,
            output_current,
        } => {
            out.write_bytes(&input_id.to_wire_bytes())?;
            out.write_bytes(&input_min_supported.to_le_bytes())?;
            out.write_bytes(&input_current.to_le_bytes())?;
            out.write_bytes(&output_id.to_wire_bytes())?;
            out.write_bytes(&output_min_supported.to_le_bytes())?;
            out.write_bytes(&output_current.to_le_bytes())
        }
        StatusReply::NotCompatibleCommonFlags {
            forbidden,
            mandatory,
        } => {
            out.write_bytes(&forbidden.bits().to_le_bytes())?;
            out.write_bytes(&mandatory.bits().to_le_bytes())
        }
        StatusReply::NotCompatibleDataFlags {
            forbidden,
            mandatory,
            id,
        } => {
            out.write_bytes(&forbidden.bits().to_le_bytes())?;
            out.write_bytes(&mandatory.bits().to_le_bytes())?;
            out.write_bytes(&id.to_wire_bytes())
        }
    }
}

/// Bare status reply carrying only a code. What a server falls back to
/// when a failure has no richer body.
pub fn serialize_status_full_context(
    protocol_version: u8,
    common_flags: CommonFlags,
    status: Status,
    out: &mut dyn SerSink,
) -> Result {
    serialize_status(protocol_version, common_flags, &StatusReply::Other(status), out)
}

/// Parse a complete status message, header included.
pub fn deserialize_status(walker: &mut BinWalker) -> Result<StatusReply> {
    let common = deserialize_common_context(walker)?;
    if common.message_type != MessageType::Status {
        return Err(Status::ErrorInvalidArgument);
    }
    deserialize_status_body(walker)
}

/// Parse the code and body of a status message whose common header was
/// already consumed.
pub fn deserialize_status_body(walker: &mut BinWalker) -> Result<StatusReply> {
    let code = u32::from_le_bytes(walker.read_array::<4>()?);
    if code == NO_ERROR_CODE {
        return Ok(StatusReply::Ack);
    }
    let status = Status::from_code(code).ok_or(Status::ErrorDataCorrupted)?;

    Ok(match status {
        Status::ErrorNotSupportedProtocolVersion => {
            let [count] = walker.read_array::<1>()?;
            let versions = walker.read_bytes(count as usize)?.to_vec();
            let mandatory_common_flags =
                CommonFlags::from_bits(u16::from_le_bytes(walker.read_array::<2>()?));
            StatusReply::NotSupportedProtocolVersion {
                versions,
                mandatory_common_flags,
            }
        }
        Status::ErrorNotSupportedInterfaceVersion => StatusReply::NotSupportedInterfaceVersion {
            id: Id::from_wire_bytes(walker.read_array::<16>()?),
            min_supported: u32::from_le_bytes(walker.read_array::<4>()?),
            current: u32::from_le_bytes(walker.read_array::<4>()?),
        },
        Status::ErrorNotSupportedInOutInterfaceVersion => {
            StatusReply::NotSupportedInOutInterfaceVersion {
                input_id: Id::from_wire_bytes(walker.read_array::<16>()?),
                input_min_supported: u32::from_le_bytes(walker.read_array::<4>()?),
                input_current: u32::from_le_bytes(walker.read_array::<4>()?),
                output_id: Id::from_wire_bytes(walker.read_array::<16>()?),
                output_min_supported: u32::from_le_bytes(walker.read_array::<4>()?),
                output_current: u32::from_le_bytes(walker.read_array::<4>()?),
            }
        }
        Status::ErrorNotCompatibleCommonFlagsSettings => StatusReply::NotCompatibleCommonFlags {
            forbidden: CommonFlags::from_bits(u16::from_le_bytes(walker.read_array::<2>()?)),
            mandatory: CommonFlags::from_bits(u16::from_le_bytes(walker.read_array::<2>()?)),
        },
        Status::ErrorNotCompatibleDataFlagsSettings => StatusReply::NotCompatibleDataFlags {
            forbidden: DataFlags::from_bits(u16::from_le_bytes(walker.read_array::<2>()?)),
            mandatory: DataFlags::from_bits(u16::from_le_bytes(walker.read_array::<2>()?)),
            id: Id::from_wire_bytes(walker.read_array::<16>()?),
        },
        other => StatusReply::Other(other),
    })
}
