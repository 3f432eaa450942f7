use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, info};
use parking_lot::Mutex;

use crate::dispatch::{ClientEvents, ServerEvents};
use crate::error::TransportError;
use crate::session::{ConnectionId, SendTarget};
use crate::wire::Message;

use super::Transport;

#[derive(Debug)]
struct HubState {
    server: Option<ServerEvents>,
    max_connections: usize,
    clients: BTreeMap<ConnectionId, ClientEvents>,
    next_id: u32,
}

impl Default for HubState {
    fn default() -> Self {
        Self {
            server: None,
            max_connections: 0,
            clients: BTreeMap::new(),
            next_id: 1,
        }
    }
}

/// In-process meeting point for one server and any number of clients.
/// Frames are delivered synchronously into the receiving side's inbound queue.
#[derive(Debug, Clone, Default)]
pub struct LoopbackHub {
    state: Arc<Mutex<HubState>>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transport(&self) -> LoopbackTransport {
        LoopbackTransport {
            hub: self.clone(),
            connection: None,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.state.lock().server.is_some()
    }

    pub fn connection_count(&self) -> usize {
        self.state.lock().clients.len()
    }
}

/// One endpoint on a [`LoopbackHub`]. May act as server, client, or both.
#[derive(Debug)]
pub struct LoopbackTransport {
    hub: LoopbackHub,
    connection: Option<ConnectionId>,
}

impl LoopbackTransport {
    /// Id the hub assigned to this endpoint's client half.
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.connection
    }
}

impl Transport for LoopbackTransport {
    fn start_server(
        &mut self,
        max_connections: usize,
        events: ServerEvents,
    ) -> Result<(), TransportError> {
        let mut state = self.hub.state.lock();
        if state.server.is_some() {
            return Err(TransportError::AlreadyListening);
        }
        state.server = Some(events);
        state.max_connections = max_connections;
        info!("Loopback server listening ({} connections max)", max_connections);
        Ok(())
    }

    fn stop_server(&mut self) {
        let mut state = self.hub.state.lock();
        if state.server.take().is_none() {
            return;
        }
        for (_, client) in std::mem::take(&mut state.clients) {
            client.disconnected();
        }
        info!("Loopback server stopped");
    }

    fn disconnect_client(&mut self, connection: ConnectionId) {
        let mut state = self.hub.state.lock();
        if let Some(client) = state.clients.remove(&connection) {
            client.disconnected();
            if let Some(server) = &state.server {
                server.disconnected(connection);
            }
        }
    }

    fn server_send(&mut self, message: &Message, target: SendTarget) -> Result<(), TransportError> {
        let state = self.hub.state.lock();
        if state.server.is_none() {
            return Err(TransportError::NotListening);
        }
        match target {
            SendTarget::Broadcast => {
                for client in state.clients.values() {
                    client.received(message.as_bytes().to_vec());
                }
            }
            SendTarget::Connection(id) => match state.clients.get(&id) {
                Some(client) => client.received(message.as_bytes().to_vec()),
                None => debug!("Dropping frame for departed {}", id),
            },
        }
        Ok(())
    }

    fn client_connect(
        &mut self,
        address: &str,
        events: ClientEvents,
    ) -> Result<(), TransportError> {
        let mut state = self.hub.state.lock();
        if let Some(id) = self.connection {
            if state.clients.contains_key(&id) {
                return Err(TransportError::AlreadyConnected);
            }
        }
        let Some(server) = state.server.clone() else {
            return Err(TransportError::NotListening);
        };
        if state.clients.len() >= state.max_connections {
            return Err(TransportError::ServerFull {
                max: state.max_connections,
            });
        }

        let id = ConnectionId(state.next_id);
        state.next_id += 1;
        events.connected();
        state.clients.insert(id, events);
        self.connection = Some(id);
        server.connected(id);
        debug!("Loopback client {} connected to {}", id, address);
        Ok(())
    }

    fn client_disconnect(&mut self) {
        let Some(id) = self.connection.take() else {
            return;
        };
        let mut state = self.hub.state.lock();
        if let Some(client) = state.clients.remove(&id) {
            client.disconnected();
            if let Some(server) = &state.server {
                server.disconnected(id);
            }
        }
    }

    fn client_send(&mut self, message: &Message) -> Result<(), TransportError> {
        let id = self.connection.ok_or(TransportError::NotConnected)?;
        let state = self.hub.state.lock();
        if !state.clients.contains_key(&id) {
            return Err(TransportError::NotConnected);
        }
        let server = state.server.as_ref().ok_or(TransportError::NotListening)?;
        server.received(id, message.as_bytes().to_vec());
        Ok(())
    }

    fn local_connection(&self) -> Option<ConnectionId> {
        self.connection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{ClientInbound, ServerInbound, client_queue, server_queue};
    use crate::wire::{Category, ConnectedCall, Frame};

    #[test]
    fn connection_ids_are_monotonic_and_never_reused() {
        let hub = LoopbackHub::new();
        let (server_events, server_queue) = server_queue(1024);
        hub.transport().start_server(8, server_events).unwrap();

        let mut a = hub.transport();
        let mut b = hub.transport();
        a.client_connect("loopback", client_queue(1024).0).unwrap();
        b.client_connect("loopback", client_queue(1024).0).unwrap();
        assert_eq!(a.connection_id(), Some(ConnectionId(1)));
        assert_eq!(b.connection_id(), Some(ConnectionId(2)));

        a.client_disconnect();
        a.client_connect("loopback", client_queue(1024).0).unwrap();
        assert_eq!(a.connection_id(), Some(ConnectionId(3)));

        let events = server_queue.drain(16);
        assert_eq!(
            events,
            vec![
                ServerInbound::Connected(ConnectionId(1)),
                ServerInbound::Connected(ConnectionId(2)),
                ServerInbound::Disconnected(ConnectionId(1)),
                ServerInbound::Connected(ConnectionId(3)),
            ]
        );
    }

    #[test]
    fn enforces_max_connections() {
        let hub = LoopbackHub::new();
        hub.transport().start_server(1, server_queue(1024).0).unwrap();

        hub.transport().client_connect("loopback", client_queue(1024).0).unwrap();
        let err = hub
            .transport()
            .client_connect("loopback", client_queue(1024).0)
            .unwrap_err();
        assert_eq!(err, TransportError::ServerFull { max: 1 });
    }

    #[test]
    fn connect_without_server_fails() {
        let hub = LoopbackHub::new();
        let err = hub
            .transport()
            .client_connect("loopback", client_queue(1024).0)
            .unwrap_err();
        assert_eq!(err, TransportError::NotListening);
    }

    #[test]
    fn targeted_send_reaches_one_client() {
        let hub = LoopbackHub::new();
        let mut server = hub.transport();
        server.start_server(4, server_queue(1024).0).unwrap();

        let (events_a, queue_a) = client_queue(1024);
        let (events_b, queue_b) = client_queue(1024);
        hub.transport().client_connect("loopback", events_a).unwrap();
        hub.transport().client_connect("loopback", events_b).unwrap();

        let message = Frame::Connected(ConnectedCall::new("Hello", vec![]))
            .encode(1024)
            .unwrap();
        server
            .server_send(&message, SendTarget::Connection(ConnectionId(2)))
            .unwrap();

        assert_eq!(queue_a.drain(8), vec![ClientInbound::Connected]);
        let b = queue_b.drain(8);
        assert_eq!(b.len(), 2);
        assert!(matches!(
            &b[1],
            ClientInbound::Call(call) if call.category() == Category::Connected
        ));
    }

    #[test]
    fn stop_server_disconnects_clients() {
        let hub = LoopbackHub::new();
        let mut server = hub.transport();
        server.start_server(4, server_queue(1024).0).unwrap();
        let (events, queue) = client_queue(1024);
        let mut client = hub.transport();
        client.client_connect("loopback", events).unwrap();

        server.stop_server();
        assert!(!hub.is_listening());
        assert_eq!(hub.connection_count(), 0);
        assert_eq!(
            queue.drain(8),
            vec![ClientInbound::Connected, ClientInbound::Disconnected]
        );
        assert_eq!(
            client.client_send(&Frame::Disconnected.encode(64).unwrap()),
            Err(TransportError::NotConnected)
        );
    }
}
