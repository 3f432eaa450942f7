//! Inbound side of the protocol: decoded calls queued by transport threads and
//! applied on the tick thread.

mod apply;
mod pending;
mod queue;

pub use pending::PendingCall;
pub use queue::{
    ClientEvents, ClientInbound, InboundQueue, ServerEvents, ServerInbound, client_queue,
    server_queue,
};
