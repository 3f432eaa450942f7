use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use log::{debug, warn};

use crate::error::CodecError;
use crate::session::ConnectionId;
use crate::wire::Frame;

use super::pending::PendingCall;

/// Server-side inbound item, produced on transport threads.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerInbound {
    Connected(ConnectionId),
    Disconnected(ConnectionId),
    Call { from: ConnectionId, call: PendingCall },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientInbound {
    Connected,
    Disconnected,
    Call(PendingCall),
}

fn decode_frame(bytes: Vec<u8>, max_message_size: usize) -> Result<Frame, CodecError> {
    if bytes.len() > max_message_size {
        return Err(CodecError::MessageTooLarge {
            size: bytes.len(),
            max: max_message_size,
        });
    }
    Frame::decode(bytes)
}

/// Notification sink handed to a transport when the server starts. Cheap to
/// clone and safe to use from any thread; frames are decoded on the calling
/// thread and queued for the tick thread.
#[derive(Debug, Clone)]
pub struct ServerEvents {
    tx: Sender<ServerInbound>,
    max_message_size: usize,
}

impl ServerEvents {
    pub fn connected(&self, connection: ConnectionId) {
        self.push(ServerInbound::Connected(connection));
    }

    pub fn disconnected(&self, connection: ConnectionId) {
        self.push(ServerInbound::Disconnected(connection));
    }

    /// Raw frame from `from`. Malformed, oversized or misdirected frames are dropped.
    pub fn received(&self, from: ConnectionId, bytes: Vec<u8>) {
        let frame = match decode_frame(bytes, self.max_message_size) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping malformed frame from {}: {}", from, e);
                return;
            }
        };
        let category = frame.category();
        match PendingCall::for_server(frame) {
            Some(call) => self.push(ServerInbound::Call { from, call }),
            None => warn!(
                "Dropping {} frame from {}: server accepts commands only",
                category, from
            ),
        }
    }

    fn push(&self, item: ServerInbound) {
        if self.tx.send(item).is_err() {
            debug!("Server inbound queue closed");
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientEvents {
    tx: Sender<ClientInbound>,
    max_message_size: usize,
}

impl ClientEvents {
    pub fn connected(&self) {
        self.push(ClientInbound::Connected);
    }

    pub fn disconnected(&self) {
        self.push(ClientInbound::Disconnected);
    }

    pub fn received(&self, bytes: Vec<u8>) {
        let frame = match decode_frame(bytes, self.max_message_size) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping malformed frame from server: {}", e);
                return;
            }
        };
        let category = frame.category();
        match PendingCall::for_client(frame) {
            Some(call) => self.push(ClientInbound::Call(call)),
            None => warn!("Dropping unexpected {} frame from server", category),
        }
    }

    fn push(&self, item: ClientInbound) {
        if self.tx.send(item).is_err() {
            debug!("Client inbound queue closed");
        }
    }
}

/// Single-consumer end of an inbound queue, drained on the tick thread.
#[derive(Debug)]
pub struct InboundQueue<T> {
    rx: Receiver<T>,
}

impl<T> InboundQueue<T> {
    /// Takes up to `max` items without blocking.
    pub fn drain(&self, max: usize) -> Vec<T> {
        let mut items = Vec::new();
        while items.len() < max {
            match self.rx.try_recv() {
                Ok(item) => items.push(item),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        items
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

pub fn server_queue(max_message_size: usize) -> (ServerEvents, InboundQueue<ServerInbound>) {
    let (tx, rx) = unbounded();
    (ServerEvents { tx, max_message_size }, InboundQueue { rx })
}

pub fn client_queue(max_message_size: usize) -> (ClientEvents, InboundQueue<ClientInbound>) {
    let (tx, rx) = unbounded();
    (ClientEvents { tx, max_message_size }, InboundQueue { rx })
}
