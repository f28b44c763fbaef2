//! The serving dispatch loop: one entry point that takes request bytes
//! and produces reply bytes, data or status.

use std::collections::HashMap;
use std::sync::Arc;

use strait_codec::context::{AddedPointers, CommonContext, DeContext, MessageType, SerContext};
use strait_codec::framing::{
    deserialize_common_context, deserialize_data_context, serialize_message,
};
use strait_codec::status_msg::{serialize_status, serialize_status_full_context, StatusReply};
use strait_codec::{Result, Serializable, Status};
use strait_core::{BinVector, BinWalker, DataFlags};

use crate::handler::ClientId;
use crate::registry::HandlerRegistry;
use crate::service_structs::PartySettings;

/// Serves one party's interfaces. The registry is constructor-injected
/// and may be shared; the server itself holds only the party settings.
///
/// Thread model: `handle_message` is `&self` and may run on many worker
/// threads at once; each call owns its own contexts and buffers.
#[derive(Debug)]
pub struct Server {
    settings: Option<PartySettings>,
    registry: Arc<HandlerRegistry>,
}

impl Server {
    /// A server ready to dispatch. `ErrorInvalidArgument` when the
    /// settings do not hold together.
    pub fn new(settings: PartySettings, registry: Arc<HandlerRegistry>) -> Result<Self> {
        let mut server = Self::uninitialized(registry);
        server.init(settings)?;
        Ok(server)
    }

    /// A server that refuses traffic until [`init`](Self::init) succeeds.
    pub fn uninitialized(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            settings: None,
            registry,
        }
    }

    pub fn init(&mut self, settings: PartySettings) -> Result {
        if self.settings.is_some() {
            return Err(Status::ErrorAlreadyInited);
        }
        if !settings.is_valid() {
            return Err(Status::ErrorInvalidArgument);
        }
        self.settings = Some(settings);
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.settings.is_some()
    }

    pub fn settings(&self) -> Option<&PartySettings> {
        self.settings.as_ref()
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Entry point for one client request. On return, `output` holds the
    /// complete reply: a data message on success, a status message
    /// otherwise. An error comes back only when even the status reply
    /// could not be produced.
    pub fn handle_message(
        &self,
        input: &mut BinWalker,
        client: &ClientId,
        output: &mut BinVector,
    ) -> Result {
        let settings = self.settings.as_ref().ok_or(Status::ErrorNotInited)?;
        output.clear();

        let common = deserialize_common_context(input)?;

        if !settings.protocol_versions.contains(&common.protocol_version) {
            tracing::warn!(
                version = common.protocol_version,
                "unsupported protocol version, replying with our range"
            );
            return serialize_status(
                settings.protocol_versions[0],
                settings.mandatory_common_flags,
                &StatusReply::NotSupportedProtocolVersion {
                    versions: settings.protocol_versions.clone(),
                    mandatory_common_flags: settings.mandatory_common_flags,
                },
                output,
            );
        }

        let outcome = match common.message_type {
            MessageType::GetSettings => self.handle_get_settings(common.protocol_version, output),
            MessageType::Data | MessageType::InOut => common
                .common_flags
                .check(
                    settings.mandatory_common_flags,
                    settings.forbidden_common_flags,
                )
                .and_then(|()| self.handle_data(common, input, client, output)),
            MessageType::Status => Err(Status::ErrorDataCorrupted),
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(Status::ErrorNotCompatibleCommonFlagsSettings) if output.is_empty() => {
                serialize_status(
                    common.protocol_version,
                    settings.mandatory_common_flags,
                    &StatusReply::NotCompatibleCommonFlags {
                        forbidden: settings.forbidden_common_flags,
                        mandatory: settings.mandatory_common_flags,
                    },
                    output,
                )
            }
            Err(err) if output.is_empty() => {
                tracing::warn!(error = %err, "request failed, replying with status");
                serialize_status_full_context(
                    common.protocol_version,
                    settings.mandatory_common_flags,
                    err,
                    output,
                )
            }
            // A handler already produced a richer status reply.
            Err(_) => Ok(()),
        }
    }

    fn handle_get_settings(&self, protocol_version: u8, output: &mut BinVector) -> Result {
        let settings = self.settings.as_ref().ok_or(Status::ErrorNotInited)?;
        let mut ctx = SerContext::new(
            output,
            protocol_version,
            settings.mandatory_common_flags,
            DataFlags::NONE,
            PartySettings::INTERFACE_VERSION,
        );
        serialize_message(settings, &mut ctx)
    }

    fn handle_data(
        &self,
        common: CommonContext,
        input: &mut BinWalker,
        client: &ClientId,
        output: &mut BinVector,
    ) -> Result {
        let mut added_pointers = AddedPointers::new();
        let mut pointers_map = HashMap::new();

        let mut ctx = DeContext::new(input, common);
        let id = deserialize_data_context(&mut ctx)?;
        if ctx.allow_unmanaged_pointers() {
            ctx.set_added_pointers(&mut added_pointers);
        }
        if ctx.check_recursive_pointers() {
            ctx.set_pointers_map(&mut pointers_map);
        }

        match self.registry.find_one(id) {
            Ok(handler) => handler.handle_data(&mut ctx, client, output),
            Err(Status::ErrorMoreEntries) => {
                let handlers = self.registry.find_all(id)?;
                let body_position = ctx.tell();
                let mut outcome: Result = Ok(());
                // Every subscriber decodes the same body from its own
                // rewound cursor; replies are appended in invocation order.
                for handler in handlers {
                    ctx.seek(body_position);
                    ctx.reset_pointer_state();
                    if let Err(err) = handler.handle_data(&mut ctx, client, output) {
                        tracing::warn!(%id, error = %err, "multicast handler failed");
                        outcome = Err(err);
                    }
                }
                outcome
            }
            Err(err) => Err(err),
        }
    }
}
