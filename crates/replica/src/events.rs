use crate::entity::EntityId;
use crate::error::ReplicationError;
use crate::session::ConnectionId;
use crate::wire::Category;

/// Session and replication events queued on the network context and drained by
/// the application with [`Network::drain_events`](crate::Network::drain_events).
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    ClientConnected {
        connection: ConnectionId,
        is_host: bool,
    },
    ClientDisconnected {
        connection: ConnectionId,
        reason: DisconnectReason,
        destroyed: usize,
    },
    PlayerSpawned {
        connection: ConnectionId,
        entity: EntityId,
    },
    OtherPlayersSpawned {
        connection: ConnectionId,
        count: usize,
    },
    EntitySpawned {
        entity: EntityId,
        prefab: usize,
    },
    EntityDestroyed {
        entity: EntityId,
    },
    SyncVarChanged {
        entity: EntityId,
        component_index: i32,
        field: String,
    },
    CallRejected {
        category: Category,
        connection: Option<ConnectionId>,
        error: ReplicationError,
    },
    ConnectedToServer,
    DisconnectedFromServer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    Remote,
    Kicked,
    ServerStopped,
}

impl DisconnectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisconnectReason::Remote => "disconnected",
            DisconnectReason::Kicked => "kicked",
            DisconnectReason::ServerStopped => "server stopped",
        }
    }
}
