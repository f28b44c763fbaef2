//! Service structs: the fixed message set peers use to discover each
//! other's protocol range, session requirements, and served interfaces.
//!
//! Service structs never version-convert; their set is pinned by the
//! protocol version itself, so every one of them lives at interface
//! version 0 with a single private revision.

use strait_codec::assignable::{Assignable, AssignableKind};
use strait_codec::body::{deserialize_assignable_elements, serialize_assignable_elements, Field};
use strait_codec::context::{DeContext, SerContext};
use strait_codec::{
    deserialize_assignable_field, deserialize_common, serialize_assignable_field,
    serialize_common, Result, Serializable,
};
use strait_core::version::is_protocol_version_supported;
use strait_core::{CommonFlags, DataFlags, Id, Status};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

/// One served interface: its id, the current interface version, and the
/// data-flag policy every message addressed to it must satisfy.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct InterfaceDesc {
    pub id: Id,
    pub version: u32,
    pub mandatory_data_flags: DataFlags,
    pub forbidden_data_flags: DataFlags,
}

static_assertions::assert_eq_size!(InterfaceDesc, [u8; 24]);

impl InterfaceDesc {
    pub fn is_valid(&self) -> bool {
        !self.mandatory_data_flags.intersects(self.forbidden_data_flags)
    }
}

impl Assignable for InterfaceDesc {
    const KIND: AssignableKind = AssignableKind::FixedSize;
}

impl Field for InterfaceDesc {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        serialize_assignable_field!(InterfaceDesc, self, ctx, None);
        self.id.serialize(ctx)?;
        self.version.serialize(ctx)?;
        self.mandatory_data_flags.serialize(ctx)?;
        self.forbidden_data_flags.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        deserialize_assignable_field!(InterfaceDesc, self, ctx, None);
        self.id.deserialize(ctx)?;
        self.version.deserialize(ctx)?;
        self.mandatory_data_flags.deserialize(ctx)?;
        self.forbidden_data_flags.deserialize(ctx)
    }

    fn serialize_slice(items: &[Self], ctx: &mut SerContext<'_>) -> Result {
        serialize_assignable_elements(items, None, ctx)
    }

    fn deserialize_slice(items: &mut [Self], ctx: &mut DeContext<'_>) -> Result {
        deserialize_assignable_elements(items, None, ctx)
    }
}

/// Everything a party advertises about itself: supported protocol
/// versions (highest first), the common flags a session with it must and
/// must not carry, and the interfaces it serves. Sent as the reply to a
/// `GetSettings` request.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PartySettings {
    pub protocol_versions: Vec<u8>,
    pub mandatory_common_flags: CommonFlags,
    pub forbidden_common_flags: CommonFlags,
    pub interfaces: Vec<InterfaceDesc>,
}

impl PartySettings {
    pub fn is_valid(&self) -> bool {
        !self.protocol_versions.is_empty()
            && self.protocol_versions.windows(2).all(|w| w[0] > w[1])
            && self
                .protocol_versions
                .iter()
                .all(|&v| is_protocol_version_supported(v))
            && !self.mandatory_common_flags.intersects(self.forbidden_common_flags)
            && self.interfaces.iter().all(InterfaceDesc::is_valid)
    }

    pub fn latest_protocol_version(&self) -> Option<u8> {
        self.protocol_versions.first().copied()
    }

    pub fn interface(&self, id: Id) -> Option<&InterfaceDesc> {
        self.interfaces.iter().find(|desc| desc.id == id)
    }

    /// Work out what a session between `self` and `peer` must look like:
    /// the highest protocol version both speak and the union of both
    /// parties' mandatory common flags. Fails when the protocol ranges do
    /// not meet or one side insists on flags the other forbids.
    pub fn compatible_with(&self, peer: &PartySettings) -> Result<SessionPreferences> {
        let protocol_version = self
            .protocol_versions
            .iter()
            .copied()
            .find(|v| peer.protocol_versions.contains(v))
            .ok_or(Status::ErrorNotSupportedProtocolVersion)?;

        let common_flags = self.mandatory_common_flags.union(peer.mandatory_common_flags);
        if common_flags.intersects(self.forbidden_common_flags)
            || common_flags.intersects(peer.forbidden_common_flags)
        {
            return Err(Status::ErrorNotCompatibleCommonFlagsSettings);
        }

        Ok(SessionPreferences {
            protocol_version,
            common_flags,
        })
    }
}

/// Outcome of matching two parties' settings: what every message of the
/// session carries in its common header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPreferences {
    pub protocol_version: u8,
    pub common_flags: CommonFlags,
}

impl Field for PartySettings {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        serialize_common!(PartySettings, self, ctx);
        self.protocol_versions.serialize(ctx)?;
        self.mandatory_common_flags.serialize(ctx)?;
        self.forbidden_common_flags.serialize(ctx)?;
        self.interfaces.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        deserialize_common!(PartySettings, self, ctx);
        self.protocol_versions.deserialize(ctx)?;
        self.mandatory_common_flags.deserialize(ctx)?;
        self.forbidden_common_flags.deserialize(ctx)?;
        self.interfaces.deserialize(ctx)
    }
}

impl Serializable for PartySettings {
    const ID: Id = Id::new(0x9d16_0744_66ce_1d2e, 0x8ac1_54d2_4f16_6c90);
    const INTERFACE_VERSION: u32 = 0;
    const PRIVATE_VERSIONS: &'static [u32] = &[0];
}

/// Placeholder output for operations that answer with a plain status
/// acknowledgment instead of a data reply.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NullOutput;

impl Field for NullOutput {
    fn serialize(&self, _ctx: &mut SerContext<'_>) -> Result {
        Ok(())
    }

    fn deserialize(&mut self, _ctx: &mut DeContext<'_>) -> Result {
        Ok(())
    }
}

impl Serializable for NullOutput {
    const ID: Id = Id::new(0x1763_19a2_0f52_9b47, 0xadd5_35c9_9799_20e6);
    const INTERFACE_VERSION: u32 = 0;
    const PRIVATE_VERSIONS: &'static [u32] = &[0];
    const EMPTY: bool = true;
}

/// Query for the descriptor of one served interface.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct GetInterfaceProperties {
    pub id: Id,
}

impl Assignable for GetInterfaceProperties {
    const KIND: AssignableKind = AssignableKind::FixedSize;
}

impl Field for GetInterfaceProperties {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        serialize_common!(GetInterfaceProperties, self, ctx, assignable);
        self.id.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        deserialize_common!(GetInterfaceProperties, self, ctx, assignable);
        self.id.deserialize(ctx)
    }
}

impl Serializable for GetInterfaceProperties {
    const ID: Id = Id::new(0xe74c_2f91_5a1b_08d3, 0x4b6f_90ad_6e01_c2b7);
    const INTERFACE_VERSION: u32 = 0;
    const PRIVATE_VERSIONS: &'static [u32] = &[0];
}

/// Reply to [`GetInterfaceProperties`]. A served interface echoes its
/// descriptor; an unknown id answers with a zeroed descriptor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct InterfaceProperties {
    pub desc: InterfaceDesc,
}

impl Assignable for InterfaceProperties {
    const KIND: AssignableKind = AssignableKind::FixedSize;
}

impl Field for InterfaceProperties {
    fn serialize(&self, ctx: &mut SerContext<'_>) -> Result {
        serialize_common!(InterfaceProperties, self, ctx, assignable);
        self.desc.serialize(ctx)
    }

    fn deserialize(&mut self, ctx: &mut DeContext<'_>) -> Result {
        deserialize_common!(InterfaceProperties, self, ctx, assignable);
        self.desc.deserialize(ctx)
    }
}

impl Serializable for InterfaceProperties {
    const ID: Id = Id::new(0x21c5_7ba0_93ef_46d8, 0xf00a_4de2_b85c_6319);
    const INTERFACE_VERSION: u32 = 0;
    const PRIVATE_VERSIONS: &'static [u32] = &[0];
}
