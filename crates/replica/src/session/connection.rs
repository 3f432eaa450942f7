use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

/// Transport-assigned connection id. Monotonic and never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u32);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Destination of a server-originated frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendTarget {
    Broadcast,
    Connection(ConnectionId),
}

impl SendTarget {
    /// Maps the integer addressing used on the wire: `-1` broadcasts,
    /// any non-negative id targets one connection.
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            -1 => Some(SendTarget::Broadcast),
            id => u32::try_from(id).ok().map(|id| SendTarget::Connection(ConnectionId(id))),
        }
    }

    pub fn includes(&self, connection: ConnectionId) -> bool {
        match self {
            SendTarget::Broadcast => true,
            SendTarget::Connection(target) => *target == connection,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

/// One remote peer, from the server's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    id: ConnectionId,
    owned_entities: BTreeSet<EntityId>,
    player_entity: Option<EntityId>,
}

impl Connection {
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            owned_entities: BTreeSet::new(),
            player_entity: None,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn owned_entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.owned_entities.iter().copied()
    }

    pub fn owns(&self, entity: EntityId) -> bool {
        self.owned_entities.contains(&entity)
    }

    pub fn player_entity(&self) -> Option<EntityId> {
        self.player_entity
    }

    pub(crate) fn add_owned(&mut self, entity: EntityId) {
        self.owned_entities.insert(entity);
    }

    pub(crate) fn remove_owned(&mut self, entity: EntityId) -> bool {
        if self.player_entity == Some(entity) {
            self.player_entity = None;
        }
        self.owned_entities.remove(&entity)
    }

    /// Set once, on the connection's first avatar spawn.
    pub(crate) fn set_player_entity(&mut self, entity: EntityId) -> bool {
        if self.player_entity.is_some() {
            return false;
        }
        self.player_entity = Some(entity);
        true
    }

    pub(crate) fn take_owned(&mut self) -> Vec<EntityId> {
        self.player_entity = None;
        std::mem::take(&mut self.owned_entities).into_iter().collect()
    }
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` and leaves the registry untouched if the id is taken.
    pub fn insert(&mut self, id: ConnectionId) -> bool {
        if self.connections.contains_key(&id) {
            return false;
        }
        self.connections.insert(id, Connection::new(id));
        true
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Connection ids in ascending order.
    pub fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self.connections.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn owner_of(&self, entity: EntityId) -> Option<ConnectionId> {
        self.connections
            .values()
            .find(|c| c.owns(entity))
            .map(Connection::id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
