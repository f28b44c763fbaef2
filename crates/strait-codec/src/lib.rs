//! strait-codec — the wire engine: serialization contexts, the primitive
//! and body codecs, the simply-assignable fast path, per-struct version
//! conversion, message framing, and status replies.
//!
//! # Wire layout
//!
//! Every message starts with a common header (protocol version, message
//! type, common flags), always little-endian so the byte-order bit can be
//! read before any swap logic runs. A `Data` message follows with a data
//! sub-header (struct id, data flags, interface version; `InOut` requests
//! add the expected output interface version) and then the struct body,
//! emitted in field-declaration order, depth-first. A `Status` message
//! follows with a status code and a code-dependent body.
//!
//! # Fast and slow paths
//!
//! Types that opt into an [`Assignable`](assignable::Assignable) kind are
//! transferred as one raw byte block whenever the session's data flags
//! permit; otherwise the body codec walks them field by field, applying
//! endianness and integer-width transforms per scalar.

pub mod assignable;
pub mod body;
pub mod context;
pub mod convert;
pub mod framing;
pub mod primitives;
pub mod serializable;
pub mod status_msg;

pub use assignable::{Assignable, AssignableKind};
pub use body::Field;
pub use context::{AddedPointers, CommonContext, DeContext, MessageType, SerContext};
pub use serializable::Serializable;
pub use status_msg::StatusReply;

// Re-exported so macro expansions resolve through this crate alone.
pub use strait_core::{Result, Status};
