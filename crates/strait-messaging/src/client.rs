//! Client-side session: probe the peer's settings, negotiate the session,
//! build typed requests, and interpret whatever comes back.

use std::collections::HashMap;

use strait_codec::context::{MessageType, SerContext};
use strait_codec::framing::{
    deserialize_common_context, deserialize_message, serialize_message, write_common_header,
};
use strait_codec::status_msg::{deserialize_status_body, StatusReply};
use strait_codec::{Result, Serializable, Status};
use strait_core::{BinVector, BinWalker, CommonFlags, DataFlags};

use crate::service_structs::{PartySettings, SessionPreferences};

/// What a peer answered: the typed payload, or a status message carrying
/// the reason and, for version/flag disputes, the acceptable ranges to
/// retry with.
#[derive(Debug)]
pub enum Reply<Out> {
    Data(Out),
    Status(StatusReply),
}

/// One client's view of a session with a serving party.
///
/// Construction only fixes this side's requirements; the session becomes
/// usable once the peer's settings have been accepted and the two
/// parties' requirements proved compatible.
#[derive(Debug)]
pub struct Client {
    own: PartySettings,
    peer: Option<PartySettings>,
    session: Option<SessionPreferences>,
}

impl Client {
    pub fn new(own: PartySettings) -> Result<Self> {
        if !own.is_valid() {
            return Err(Status::ErrorInvalidArgument);
        }
        Ok(Self {
            own,
            peer: None,
            session: None,
        })
    }

    pub fn settings(&self) -> &PartySettings {
        &self.own
    }

    pub fn peer_settings(&self) -> Option<&PartySettings> {
        self.peer.as_ref()
    }

    pub fn session(&self) -> Option<SessionPreferences> {
        self.session
    }

    pub fn is_ready(&self) -> bool {
        self.session.is_some()
    }

    /// The settings probe: a bare `GetSettings` message at our preferred
    /// protocol version.
    pub fn get_settings_request(&self) -> Result<BinVector> {
        let mut out = BinVector::new();
        write_common_header(
            self.own.protocol_versions[0],
            MessageType::GetSettings,
            CommonFlags::NONE,
            &mut out,
        )?;
        Ok(out)
    }

    /// Digest the reply to the settings probe and fix the session
    /// parameters. A status reply (e.g. an unsupported protocol version
    /// with the peer's range) surfaces as its error.
    pub fn accept_settings(&mut self, reply: &mut BinWalker) -> Result {
        let start = reply.tell();
        let common = deserialize_common_context(reply)?;
        if common.message_type == MessageType::Status {
            let status = deserialize_status_body(reply)?;
            tracing::warn!(code = status.code(), "peer refused the settings probe");
            return Err(status.status().unwrap_or(Status::ErrorDataCorrupted));
        }

        reply.seek(start);
        let peer: PartySettings = deserialize_message(reply)?;
        if !peer.is_valid() {
            return Err(Status::ErrorDataCorrupted);
        }

        let session = self.own.compatible_with(&peer)?;
        tracing::debug!(
            protocol_version = session.protocol_version,
            "session negotiated"
        );
        self.peer = Some(peer);
        self.session = Some(session);
        Ok(())
    }

    /// Serialize one request at the highest struct revision the peer
    /// accepts, honoring the peer's per-interface data-flag policy.
    pub fn encode_request<In: Serializable>(
        &self,
        value: &In,
        data_flags: DataFlags,
    ) -> Result<BinVector> {
        self.encode(value, data_flags, MessageType::Data, None)
    }

    /// As [`encode_request`](Self::encode_request), additionally asking
    /// the peer to answer with `Out` at a revision this build accepts.
    pub fn encode_in_out_request<In: Serializable, Out: Serializable>(
        &self,
        value: &In,
        data_flags: DataFlags,
    ) -> Result<BinVector> {
        let peer = self.peer.as_ref().ok_or(Status::ErrorNotInited)?;
        let out_version = peer
            .interface(Out::ID)
            .map_or(Out::INTERFACE_VERSION, |desc| {
                Out::INTERFACE_VERSION.min(desc.version)
            });
        self.encode(value, data_flags, MessageType::InOut, Some(out_version))
    }

    fn encode<In: Serializable>(
        &self,
        value: &In,
        data_flags: DataFlags,
        message_type: MessageType,
        output_interface_version: Option<u32>,
    ) -> Result<BinVector> {
        let session = self.session.ok_or(Status::ErrorNotInited)?;
        let peer = self.peer.as_ref().ok_or(Status::ErrorNotInited)?;

        let desc = peer.interface(In::ID).ok_or(Status::ErrorNoSuchHandler)?;
        data_flags.check(desc.mandatory_data_flags, desc.forbidden_data_flags)?;
        let interface_version = In::INTERFACE_VERSION.min(desc.version);

        let mut out = BinVector::new();
        let mut pointers_map = HashMap::new();
        let mut ctx = SerContext::new(
            &mut out,
            session.protocol_version,
            session.common_flags,
            data_flags,
            interface_version,
        )
        .with_message_type(message_type);
        if let Some(version) = output_interface_version {
            ctx = ctx.with_output_interface_version(version);
        }
        if data_flags.contains(DataFlags::CHECK_RECURSIVE_POINTERS) {
            ctx = ctx.with_pointers_map(&mut pointers_map);
        }
        serialize_message(value, &mut ctx)?;
        Ok(out)
    }

    /// Interpret one reply: a data message decodes to `Out`, a status
    /// message is handed back for the caller to act on.
    pub fn decode_reply<Out: Serializable>(&self, reply: &mut BinWalker) -> Result<Reply<Out>> {
        let start = reply.tell();
        let common = deserialize_common_context(reply)?;
        match common.message_type {
            MessageType::Status => Ok(Reply::Status(deserialize_status_body(reply)?)),
            MessageType::Data | MessageType::InOut => {
                reply.seek(start);
                Ok(Reply::Data(deserialize_message(reply)?))
            }
            MessageType::GetSettings => Err(Status::ErrorDataCorrupted),
        }
    }
}
