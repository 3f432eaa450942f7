//! Transport contract consumed by the replication core.
//!
//! The core never opens a socket. A transport moves whole frames and reports
//! connection changes through the [`ServerEvents`] and [`ClientEvents`] sinks
//! it receives when it starts; those may be called from any thread. Socket
//! failures must surface as disconnect notifications.

mod loopback;

pub use loopback::{LoopbackHub, LoopbackTransport};

use crate::dispatch::{ClientEvents, ServerEvents};
use crate::error::TransportError;
use crate::session::{ConnectionId, SendTarget};
use crate::wire::Message;

pub trait Transport {
    fn start_server(
        &mut self,
        max_connections: usize,
        events: ServerEvents,
    ) -> Result<(), TransportError>;

    fn stop_server(&mut self);

    fn disconnect_client(&mut self, connection: ConnectionId);

    fn server_send(&mut self, message: &Message, target: SendTarget) -> Result<(), TransportError>;

    fn client_connect(&mut self, address: &str, events: ClientEvents) -> Result<(), TransportError>;

    fn client_disconnect(&mut self);

    fn client_send(&mut self, message: &Message) -> Result<(), TransportError>;

    /// Server-side id of this process's own client half, once the transport
    /// has accepted it. The server uses it to recognise the host connection.
    fn local_connection(&self) -> Option<ConnectionId> {
        None
    }
}
