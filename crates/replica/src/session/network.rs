use std::collections::{HashMap, VecDeque};

use log::{debug, error};

use crate::behaviour::{Behaviour, BehaviourRegistry};
use crate::config::NetworkConfig;
use crate::dispatch::{ClientInbound, InboundQueue, ServerInbound};
use crate::entity::{ComponentRef, EntityId, PrefabTable, ReplicatedEntity, Transform, World};
use crate::error::{ReplicationError, Result};
use crate::events::{DisconnectReason, NetworkEvent};
use crate::stats::NetworkStats;
use crate::transport::Transport;
use crate::wire::{Frame, Message};

use super::connection::{ClientConnectionState, ConnectionId, ConnectionRegistry, SendTarget};
use super::Role;

/// Avatar chosen for a new connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSpawn {
    pub prefab: usize,
    pub transform: Transform,
}

pub type SpawnPolicy = Box<dyn FnMut(ConnectionId) -> Option<PlayerSpawn> + Send>;

pub(crate) struct ServerState {
    pub connections: ConnectionRegistry,
    pub host: Option<ConnectionId>,
    pub inbound: InboundQueue<ServerInbound>,
    pub kicked: HashMap<ConnectionId, DisconnectReason>,
}

pub(crate) struct ClientState {
    pub state: ClientConnectionState,
    pub inbound: InboundQueue<ClientInbound>,
}

/// Replication context. Owns the entity world and the server and client
/// session state; everything here runs on the tick thread.
///
/// A process may run the server half, the client half, or both (host mode).
/// Both halves share one [`World`].
pub struct Network<T: Transport> {
    pub(crate) transport: T,
    pub(crate) config: NetworkConfig,
    pub(crate) world: World,
    pub(crate) prefabs: PrefabTable,
    pub(crate) registry: BehaviourRegistry,
    pub(crate) stats: NetworkStats,
    pub(crate) events: VecDeque<NetworkEvent>,
    pub(crate) spawn_policy: Option<SpawnPolicy>,
    pub(crate) server: Option<ServerState>,
    pub(crate) client: Option<ClientState>,
}

impl<T: Transport> Network<T> {
    pub fn new(
        transport: T,
        config: NetworkConfig,
        prefabs: PrefabTable,
        registry: BehaviourRegistry,
    ) -> Self {
        Self {
            transport,
            config,
            world: World::new(),
            prefabs,
            registry,
            stats: NetworkStats::default(),
            events: VecDeque::new(),
            spawn_policy: None,
            server: None,
            client: None,
        }
    }

    /// Overrides the avatar choice for new connections. Without a policy the
    /// configured `player_prefab` is spawned at the origin, if set.
    pub fn set_spawn_policy<F>(&mut self, policy: F)
    where
        F: FnMut(ConnectionId) -> Option<PlayerSpawn> + Send + 'static,
    {
        self.spawn_policy = Some(Box::new(policy));
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn prefabs(&self) -> &PrefabTable {
        &self.prefabs
    }

    pub fn registry(&self) -> &BehaviourRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn role(&self) -> Role {
        let mut role = Role::empty();
        if self.server.is_some() {
            role |= Role::SERVER;
        }
        if self.client_state() != ClientConnectionState::Disconnected {
            role |= Role::CLIENT;
        }
        role
    }

    pub fn is_server(&self) -> bool {
        self.server.is_some()
    }

    pub fn client_state(&self) -> ClientConnectionState {
        self.client
            .as_ref()
            .map_or(ClientConnectionState::Disconnected, |c| c.state)
    }

    pub fn is_client_connected(&self) -> bool {
        self.client_state() == ClientConnectionState::Connected
    }

    pub fn connections(&self) -> Option<&ConnectionRegistry> {
        self.server.as_ref().map(|s| &s.connections)
    }

    /// Connection of the local client half, when running as host.
    pub fn host_connection(&self) -> Option<ConnectionId> {
        self.server.as_ref().and_then(|s| s.host)
    }

    pub fn entity(&self, id: EntityId) -> Option<&ReplicatedEntity> {
        self.world.get(id)
    }

    pub fn behaviour<B: Behaviour>(&self, component: ComponentRef) -> Option<&B> {
        self.world.component(component).ok()?.downcast_ref::<B>()
    }

    pub fn behaviour_mut<B: Behaviour>(&mut self, component: ComponentRef) -> Option<&mut B> {
        self.world.component_mut(component).ok()?.downcast_mut::<B>()
    }

    /// Address of the first `B` component on `entity`.
    pub fn find_component<B: Behaviour>(&self, entity: EntityId) -> Option<ComponentRef> {
        let (index, _) = self.world.get(entity)?.find::<B>()?;
        Some(ComponentRef::new(entity, index))
    }

    pub fn drain_events(&mut self) -> Vec<NetworkEvent> {
        self.events.drain(..).collect()
    }

    pub(crate) fn emit(&mut self, event: NetworkEvent) {
        self.events.push_back(event);
    }

    /// Applies queued inbound items: up to `apply_batch` for the server half,
    /// then up to `apply_batch` for the client half. Never blocks.
    /// Returns how many items were processed.
    pub fn tick(&mut self) -> usize {
        let batch = self.config.apply_batch;
        let mut processed = 0;

        let server_items = self
            .server
            .as_ref()
            .map(|s| s.inbound.drain(batch))
            .unwrap_or_default();
        for item in server_items {
            processed += 1;
            self.handle_server_inbound(item);
        }

        let client_items = self
            .client
            .as_ref()
            .map(|c| c.inbound.drain(batch))
            .unwrap_or_default();
        for item in client_items {
            processed += 1;
            self.handle_client_inbound(item);
        }

        processed
    }

    pub(crate) fn encode(&mut self, frame: &Frame) -> Result<Message> {
        frame.encode(self.config.max_message_size).map_err(|e| {
            self.stats.encode_failures += 1;
            error!("Failed to encode {} frame: {}", frame.category(), e);
            ReplicationError::from(e)
        })
    }

    pub(crate) fn server_send(&mut self, frame: &Frame, target: SendTarget) -> Result<()> {
        let copies = match (target, &self.server) {
            (_, None) => return Err(ReplicationError::NotServer),
            (SendTarget::Broadcast, Some(server)) => server.connections.len(),
            (SendTarget::Connection(_), Some(_)) => 1,
        };
        let message = self.encode(frame)?;
        self.transport.server_send(&message, target)?;
        self.stats.record_sent(message.len(), copies);
        debug!("Sent {} frame ({} bytes) to {:?}", frame.category(), message.len(), target);
        Ok(())
    }

    pub(crate) fn client_send(&mut self, frame: &Frame) -> Result<()> {
        if !self.is_client_connected() {
            return Err(ReplicationError::NotClient);
        }
        let message = self.encode(frame)?;
        self.transport.client_send(&message)?;
        self.stats.record_sent(message.len(), 1);
        debug!("Sent {} frame ({} bytes) to server", frame.category(), message.len());
        Ok(())
    }
}
