use crate::entity::{ComponentRef, EntityId};
use crate::wire::{Category, ConnectedCall, Frame, RpcCall, SyncVarUpdate};

/// A decoded call waiting for the tick thread. Applied exactly once, in FIFO order.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingCall {
    /// Command, RPC or TargetRPC addressed at a component.
    Invoke { category: Category, call: RpcCall },
    SyncVar(SyncVarUpdate),
    /// Session-level call (spawn handshake, batched destroy).
    Session(ConnectedCall),
}

impl PendingCall {
    pub fn category(&self) -> Category {
        match self {
            PendingCall::Invoke { category, .. } => *category,
            PendingCall::SyncVar(_) => Category::SyncVar,
            PendingCall::Session(_) => Category::Connected,
        }
    }

    pub fn target(&self) -> Option<ComponentRef> {
        match self {
            PendingCall::Invoke { call, .. } => {
                Some(ComponentRef::new(call.entity_id, call.component_index))
            }
            PendingCall::SyncVar(update) => {
                Some(ComponentRef::new(update.entity_id, update.component_index))
            }
            PendingCall::Session(_) => None,
        }
    }

    pub fn entity(&self) -> Option<EntityId> {
        self.target().map(|target| target.entity)
    }

    /// Name of the method or field this call resolves.
    pub fn name(&self) -> &str {
        match self {
            PendingCall::Invoke { call, .. } => &call.method,
            PendingCall::SyncVar(update) => &update.field,
            PendingCall::Session(call) => &call.method,
        }
    }

    /// Frames a server may receive: only commands.
    pub(crate) fn for_server(frame: Frame) -> Option<Self> {
        match frame {
            Frame::Command(call) => Some(PendingCall::Invoke {
                category: Category::Command,
                call,
            }),
            _ => None,
        }
    }

    /// Frames a client may receive: everything the server pushes.
    pub(crate) fn for_client(frame: Frame) -> Option<Self> {
        match frame {
            Frame::Rpc(call) => Some(PendingCall::Invoke {
                category: Category::Rpc,
                call,
            }),
            Frame::TargetRpc(call) => Some(PendingCall::Invoke {
                category: Category::TargetRpc,
                call,
            }),
            Frame::SyncVar(update) => Some(PendingCall::SyncVar(update)),
            Frame::Connected(call) => Some(PendingCall::Session(call)),
            Frame::Command(_) | Frame::Disconnected => None,
        }
    }
}
