//! Data handlers: the object-safe dispatch surface and the typed adapter
//! that bridges it to plain Rust callbacks.

use std::collections::HashMap;
use std::marker::PhantomData;

use bytes::Bytes;
use strait_codec::context::{AddedPointers, DeContext, MessageType, SerContext};
use strait_codec::framing::{
    deserialize_data_context_postprocess, deserialize_in_out_data_context_postprocess,
    serialize_message,
};
use strait_codec::status_msg::{serialize_status, StatusReply};
use strait_codec::{Field, Result, Serializable, Status};
use strait_core::version::INTERFACE_VERSION_UNDEFINED;
use strait_core::{BinVector, DataFlags};

/// Opaque transport-level identity of the requesting peer, passed through
/// to handler callbacks untouched.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClientId(pub Bytes);

impl ClientId {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for ClientId {
    fn from(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }
}

/// One registered message processor. The context arrives positioned at the
/// data body, with the sub-header already decoded into it.
pub trait DataHandler: Send + Sync {
    /// Interface-version floor this handler accepts, normally the input
    /// struct's minimum. A handler may raise it above the interface-wide
    /// minimum.
    fn min_interface_version(&self) -> u32;

    fn handle_data(
        &self,
        ctx: &mut DeContext<'_>,
        client: &ClientId,
        output: &mut BinVector,
    ) -> Result;
}

/// Adapts a typed callback into a [`DataHandler`]: validates the decoded
/// sub-header against the input/output types, decodes the request, invokes
/// the callback, and serializes the reply with the session's negotiated
/// parameters and the sender's requested output interface version.
pub struct TypedHandler<In, Out, F> {
    min_input_version: u32,
    min_output_version: u32,
    for_temp_use_heap: bool,
    callback: F,
    _marker: PhantomData<fn(In) -> Out>,
}

impl<In, Out, F> TypedHandler<In, Out, F>
where
    In: Serializable,
    Out: Serializable,
    F: Fn(&In, Option<&mut AddedPointers>, &ClientId, &mut Out) -> Result + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self {
            min_input_version: In::minimum_interface_version(),
            min_output_version: Out::minimum_interface_version(),
            for_temp_use_heap: false,
            callback,
            _marker: PhantomData,
        }
    }

    /// Raise the input-version floor above the interface-wide minimum.
    #[must_use]
    pub fn with_minimum_input_version(mut self, version: u32) -> Self {
        self.min_input_version = version;
        self
    }

    #[must_use]
    pub fn with_minimum_output_version(mut self, version: u32) -> Self {
        self.min_output_version = version;
        self
    }

    /// Decode into heap temporaries instead of stack locals. A memory
    /// control knob for large structs; not wire-visible.
    #[must_use]
    pub fn with_heap_temporaries(mut self) -> Self {
        self.for_temp_use_heap = true;
        self
    }

    fn version_mismatch_reply(
        &self,
        ctx: &DeContext<'_>,
        output: &mut BinVector,
    ) -> Result {
        let reply = if ctx.message_type() == MessageType::InOut {
            StatusReply::NotSupportedInOutInterfaceVersion {
                input_id: In::ID,
                input_min_supported: self.min_input_version,
                input_current: In::INTERFACE_VERSION,
                output_id: Out::ID,
                output_min_supported: self.min_output_version,
                output_current: Out::INTERFACE_VERSION,
            }
        } else {
            StatusReply::NotSupportedInterfaceVersion {
                id: In::ID,
                min_supported: self.min_input_version,
                current: In::INTERFACE_VERSION,
            }
        };
        serialize_status(ctx.protocol_version(), ctx.common_flags(), &reply, output)
    }

    fn reply(&self, ctx: &DeContext<'_>, value: &Out, output: &mut BinVector) -> Result {
        if Out::EMPTY {
            return serialize_status(
                ctx.protocol_version(),
                ctx.common_flags(),
                &StatusReply::Ack,
                output,
            );
        }

        let out_version = if ctx.output_interface_version() != INTERFACE_VERSION_UNDEFINED {
            ctx.output_interface_version()
        } else {
            Out::INTERFACE_VERSION
        };
        // The reply re-derives its own version-difference bit.
        let reply_flags = ctx.data_flags().difference(DataFlags::INTERFACE_VERSIONS_DIFFER);

        let mut pointers_map = HashMap::new();
        let mut out_ctx = SerContext::new(
            output,
            ctx.protocol_version(),
            ctx.common_flags(),
            reply_flags,
            out_version,
        );
        if reply_flags.contains(DataFlags::CHECK_RECURSIVE_POINTERS) {
            out_ctx = out_ctx.with_pointers_map(&mut pointers_map);
        }
        serialize_message(value, &mut out_ctx)
    }
}

impl<In, Out, F> DataHandler for TypedHandler<In, Out, F>
where
    In: Serializable,
    Out: Serializable,
    F: Fn(&In, Option<&mut AddedPointers>, &ClientId, &mut Out) -> Result + Send + Sync,
{
    fn min_interface_version(&self) -> u32 {
        self.min_input_version
    }

    fn handle_data(
        &self,
        ctx: &mut DeContext<'_>,
        client: &ClientId,
        output: &mut BinVector,
    ) -> Result {
        let id = ctx.id();
        let checked = if ctx.message_type() == MessageType::InOut {
            deserialize_in_out_data_context_postprocess::<In, Out>(
                ctx,
                id,
                self.min_input_version,
                self.min_output_version,
            )
        } else {
            deserialize_data_context_postprocess::<In>(ctx, id, self.min_input_version)
        };
        if let Err(err) = checked {
            if matches!(
                err,
                Status::ErrorNotSupportedInterfaceVersion
                    | Status::ErrorNotSupportedInOutInterfaceVersion
            ) {
                tracing::warn!(%id, error = %err, "interface version outside handler range");
                self.version_mismatch_reply(ctx, output)?;
            }
            return Err(err);
        }

        ctx.set_aux_heap(self.for_temp_use_heap);

        if self.for_temp_use_heap {
            let mut input = Box::new(In::default());
            input.deserialize(ctx)?;
            let mut out_value = Box::new(Out::default());
            (self.callback)(&input, ctx.added_pointers_mut(), client, &mut out_value)?;
            self.reply(ctx, &out_value, output)
        } else {
            let mut input = In::default();
            input.deserialize(ctx)?;
            let mut out_value = Out::default();
            (self.callback)(&input, ctx.added_pointers_mut(), client, &mut out_value)?;
            self.reply(ctx, &out_value, output)
        }
    }
}

impl<In, Out, F> std::fmt::Debug for TypedHandler<In, Out, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedHandler")
            .field("min_input_version", &self.min_input_version)
            .field("min_output_version", &self.min_output_version)
            .field("for_temp_use_heap", &self.for_temp_use_heap)
            .finish_non_exhaustive()
    }
}
