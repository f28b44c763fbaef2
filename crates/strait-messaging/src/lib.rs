//! strait-messaging — the request/response layer on top of the codec:
//! typed data handlers, the handler registry, the serving dispatch loop,
//! the client-side session, and the service structs peers exchange to
//! negotiate with each other.

pub mod client;
pub mod handler;
pub mod registry;
pub mod server;
pub mod service_structs;

pub use client::{Client, Reply};
pub use handler::{ClientId, DataHandler, TypedHandler};
pub use registry::{HandlerRegistry, ServiceTag};
pub use server::Server;
pub use service_structs::{
    GetInterfaceProperties, InterfaceDesc, InterfaceProperties, NullOutput, PartySettings,
    SessionPreferences,
};
