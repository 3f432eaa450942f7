use std::collections::HashMap;

use log::{debug, info, warn};

use crate::dispatch::{PendingCall, ServerInbound, server_queue};
use crate::entity::{ComponentRef, EntityId, ReplicatedEntity, Transform};
use crate::error::{ReplicationError, Result, TransportError};
use crate::events::{DisconnectReason, NetworkEvent};
use crate::transport::Transport;
use crate::wire::{Category, Frame, RpcCall, SyncVarUpdate, Value};

use super::connection::{ConnectionId, ConnectionRegistry, SendTarget};
use super::network::{Network, PlayerSpawn, ServerState};
use super::protocol::{self, PlayerRecord, SpawnFrame};

impl<T: Transport> Network<T> {
    pub fn start_server(&mut self) -> Result<()> {
        if self.server.is_some() {
            return Err(TransportError::AlreadyListening.into());
        }
        let (events, inbound) = server_queue(self.config.max_message_size);
        self.transport.start_server(self.config.max_connections, events)?;
        self.server = Some(ServerState {
            connections: ConnectionRegistry::new(),
            host: None,
            inbound,
            kicked: HashMap::new(),
        });
        info!("Server started ({} connections max)", self.config.max_connections);
        Ok(())
    }

    /// Disconnects every client, tears down server state and stops the transport.
    pub fn stop_server(&mut self) {
        let Some(mut server) = self.server.take() else {
            return;
        };
        for id in server.connections.ids() {
            let mut owned = self.world.owned_by(id);
            if let Some(mut connection) = server.connections.remove(id) {
                owned.extend(connection.take_owned());
            }
            owned.sort();
            owned.dedup();
            let destroyed = self.destroy_locally(&owned);
            self.emit(NetworkEvent::ClientDisconnected {
                connection: id,
                reason: DisconnectReason::ServerStopped,
                destroyed,
            });
        }
        self.transport.stop_server();

        if self.client.is_none() {
            self.world.clear();
        }
        info!("Server stopped");
    }

    /// Kicks one connection. The disconnect cascade runs when the transport
    /// reports the disconnect.
    pub fn disconnect_client(&mut self, connection: ConnectionId) -> Result<()> {
        let server = self.server.as_mut().ok_or(ReplicationError::NotServer)?;
        if !server.connections.contains(connection) {
            return Err(ReplicationError::UnknownConnection(connection));
        }
        server.kicked.insert(connection, DisconnectReason::Kicked);
        info!("Kicking {}", connection);
        self.transport.disconnect_client(connection);
        Ok(())
    }

    /// Spawns `prefab` at the origin. See [`Network::spawn_at`].
    pub fn spawn(
        &mut self,
        prefab: usize,
        owner: Option<ConnectionId>,
        server_authority: bool,
    ) -> Result<EntityId> {
        self.spawn_at(prefab, owner, server_authority, Transform::default())
    }

    /// Instantiates `prefab` under a fresh id and announces it to every
    /// connection except the host's, with the authority bit set only for the
    /// owning connection. With `server_authority` the server keeps ownership.
    ///
    /// The host shares the server's instance, so an entity owned by the host
    /// gets its authority bit set here. A transport failure towards one
    /// connection is logged and the rest still hear about the entity.
    pub fn spawn_at(
        &mut self,
        prefab: usize,
        owner: Option<ConnectionId>,
        server_authority: bool,
        transform: Transform,
    ) -> Result<EntityId> {
        let owner = if server_authority { None } else { owner };
        let id = self.instantiate_owned(prefab, owner, transform)?;

        let (recipients, host) = self.announce_recipients()?;
        if owner.is_some() && owner == host {
            if let Some(entity) = self.world.get_mut(id) {
                entity.set_authority(true);
            }
        }
        for connection in recipients.into_iter().filter(|c| Some(*c) != host) {
            let frame = SpawnFrame {
                prefab,
                entity: id,
                has_authority: Some(connection) == owner,
                transform,
                recipient_is_host: false,
            };
            let call = Frame::TargetRpc(frame.to_target_call());
            match self.server_send(&call, SendTarget::Connection(connection)) {
                Err(ReplicationError::Transport(e)) => {
                    warn!("Failed to announce {} to {}: {}", id, connection, e);
                }
                other => other?,
            }
        }
        Ok(id)
    }

    /// Destroys `entity` on behalf of `requester`. Without `server_authority`
    /// the requester must own the entity.
    pub fn destroy(
        &mut self,
        entity: EntityId,
        requester: Option<ConnectionId>,
        server_authority: bool,
    ) -> Result<()> {
        let server = self.server.as_ref().ok_or(ReplicationError::NotServer)?;
        let target = self.world.get(entity).ok_or(ReplicationError::UnresolvedTarget {
            entity,
            component_index: protocol::CORE_COMPONENT,
        })?;
        if !server_authority && target.owner() != requester {
            return Err(ReplicationError::AuthorityViolation {
                entity,
                reason: "requester does not own the entity",
            });
        }
        let host = server.host;
        let recipients = server.connections.ids();

        self.destroy_locally(&[entity]);
        let frame = Frame::TargetRpc(protocol::destroy_call(entity));
        for connection in recipients.into_iter().filter(|c| Some(*c) != host) {
            match self.server_send(&frame, SendTarget::Connection(connection)) {
                Err(ReplicationError::Transport(e)) => {
                    warn!("Failed to send destroy of {} to {}: {}", entity, connection, e);
                }
                other => other?,
            }
        }
        Ok(())
    }

    /// Broadcasts an RPC on `component`.
    pub fn send_rpc(
        &mut self,
        component: ComponentRef,
        method: &str,
        args: Vec<Value>,
    ) -> Result<()> {
        self.check_outbound(component, method, Category::Rpc, &args)?;
        let call = RpcCall::new(component.entity, component.index, method, args);
        self.server_send(&Frame::Rpc(call), SendTarget::Broadcast)
    }

    pub fn send_target_rpc(
        &mut self,
        connection: ConnectionId,
        component: ComponentRef,
        method: &str,
        args: Vec<Value>,
    ) -> Result<()> {
        let server = self.server.as_ref().ok_or(ReplicationError::NotServer)?;
        if !server.connections.contains(connection) {
            return Err(ReplicationError::UnknownConnection(connection));
        }
        self.check_outbound(component, method, Category::TargetRpc, &args)?;
        let call = RpcCall::new(component.entity, component.index, method, args);
        self.server_send(&Frame::TargetRpc(call), SendTarget::Connection(connection))
    }

    /// Pushes the current value of a synced field to every connection.
    pub fn send_sync_var(&mut self, component: ComponentRef, field: &str) -> Result<()> {
        if self.server.is_none() {
            return Err(ReplicationError::NotServer);
        }
        let slot = self.world.component_mut(component)?;
        let entry = self.registry.resolve_sync_var(slot.behaviour(), field)?;
        let value = entry
            .get(slot.behaviour_mut())
            .map_err(|e| ReplicationError::resolution(field, e.to_string()))?;

        let update = SyncVarUpdate {
            entity_id: component.entity,
            component_index: component.index,
            field: field.to_string(),
            value,
        };
        self.server_send(&Frame::SyncVar(update), SendTarget::Broadcast)
    }

    fn check_outbound(
        &self,
        component: ComponentRef,
        method: &str,
        category: Category,
        args: &[Value],
    ) -> Result<()> {
        if self.server.is_none() {
            return Err(ReplicationError::NotServer);
        }
        let slot = self.world.component(component)?;
        self.registry
            .resolve_method(slot.behaviour(), method, category, args)
            .map(|_| ())
    }

    fn announce_recipients(&self) -> Result<(Vec<ConnectionId>, Option<ConnectionId>)> {
        let server = self.server.as_ref().ok_or(ReplicationError::NotServer)?;
        Ok((server.connections.ids(), server.host))
    }

    /// Registers a new server-side entity, records its owner and runs start hooks.
    fn instantiate_owned(
        &mut self,
        prefab: usize,
        owner: Option<ConnectionId>,
        transform: Transform,
    ) -> Result<EntityId> {
        let server = self.server.as_ref().ok_or(ReplicationError::NotServer)?;
        if let Some(owner) = owner {
            if !server.connections.contains(owner) {
                return Err(ReplicationError::UnknownConnection(owner));
            }
        }
        let behaviours = self.prefabs.instantiate(prefab)?;

        let mut id = EntityId::generate();
        while self.world.contains(id) {
            id = EntityId::generate();
        }
        let entity =
            ReplicatedEntity::new(id, prefab, owner, owner.is_none(), transform, behaviours);
        self.world.insert(entity)?;
        if let (Some(owner), Some(server)) = (owner, self.server.as_mut()) {
            if let Some(connection) = server.connections.get_mut(owner) {
                connection.add_owned(id);
            }
        }
        if let Some(entity) = self.world.get_mut(id) {
            entity.start();
        }

        info!("Spawned entity {} (prefab {}, owner {:?})", id, prefab, owner);
        self.emit(NetworkEvent::EntitySpawned { entity: id, prefab });
        Ok(id)
    }

    /// Removes entities from the world and from their owners' bookkeeping.
    /// Returns how many were actually present.
    pub(crate) fn destroy_locally(&mut self, entities: &[EntityId]) -> usize {
        let mut destroyed = 0;
        for &id in entities {
            let Some(entity) = self.world.remove(id) else {
                continue;
            };
            if let (Some(owner), Some(server)) = (entity.owner(), self.server.as_mut()) {
                if let Some(connection) = server.connections.get_mut(owner) {
                    connection.remove_owned(id);
                }
            }
            destroyed += 1;
            debug!("Destroyed entity {}", id);
            self.emit(NetworkEvent::EntityDestroyed { entity: id });
        }
        destroyed
    }

    pub(crate) fn handle_server_inbound(&mut self, item: ServerInbound) {
        match item {
            ServerInbound::Connected(id) => self.on_client_connected(id),
            ServerInbound::Disconnected(id) => self.on_client_disconnected(id),
            ServerInbound::Call { from, call } => {
                self.stats.frames_received += 1;
                let category = call.category();
                match self.apply_server_call(from, call) {
                    Ok(()) => self.stats.calls_applied += 1,
                    Err(e) => self.reject(category, Some(from), e),
                }
            }
        }
    }

    fn apply_server_call(&mut self, from: ConnectionId, call: PendingCall) -> Result<()> {
        let call = match call {
            PendingCall::Invoke {
                category: Category::Command,
                call,
            } => call,
            other => {
                return Err(ReplicationError::resolution(
                    other.name(),
                    "server only accepts commands",
                ));
            }
        };
        let entity = self.world.get(call.entity_id).ok_or(ReplicationError::UnresolvedTarget {
            entity: call.entity_id,
            component_index: call.component_index,
        })?;
        if entity.owner() != Some(from) {
            return Err(ReplicationError::AuthorityViolation {
                entity: call.entity_id,
                reason: "command from a connection that does not own the entity",
            });
        }
        self.invoke(Category::Command, &call, Some(from))
    }

    fn on_client_connected(&mut self, id: ConnectionId) {
        let local = self.client.is_some() && self.transport.local_connection() == Some(id);
        let Some(server) = self.server.as_mut() else {
            return;
        };
        if !server.connections.insert(id) {
            warn!("Ignoring duplicate connect for {}", id);
            return;
        }
        if local {
            server.host = Some(id);
        }
        let is_host = server.host == Some(id);
        info!("Client {} connected{}", id, if is_host { " (host)" } else { "" });
        self.emit(NetworkEvent::ClientConnected { connection: id, is_host });

        let spawn = match self.spawn_policy.as_mut() {
            Some(policy) => policy(id),
            None => self.config.player_prefab.map(|prefab| PlayerSpawn {
                prefab,
                transform: Transform::default(),
            }),
        };
        if let Some(spawn) = spawn {
            if let Err(e) = self.spawn_player(id, spawn) {
                warn!("Failed to spawn player for {}: {}", id, e);
            }
        }
        if let Err(e) = self.replicate_existing_players(id) {
            warn!("Failed to replicate existing players to {}: {}", id, e);
        }
    }

    /// Spawns the avatar of `id` and announces it to every connection,
    /// the host included.
    fn spawn_player(&mut self, id: ConnectionId, spawn: PlayerSpawn) -> Result<()> {
        let entity = self.instantiate_owned(spawn.prefab, Some(id), spawn.transform)?;
        if let Some(connection) = self.server.as_mut().and_then(|s| s.connections.get_mut(id)) {
            connection.set_player_entity(entity);
        }

        let (recipients, host) = self.announce_recipients()?;
        for connection in recipients {
            let frame = SpawnFrame {
                prefab: spawn.prefab,
                entity,
                has_authority: connection == id,
                transform: spawn.transform,
                recipient_is_host: Some(connection) == host,
            };
            let call = Frame::Connected(frame.to_connected_call());
            self.server_send(&call, SendTarget::Connection(connection))?;
        }
        self.emit(NetworkEvent::PlayerSpawned { connection: id, entity });
        Ok(())
    }

    /// Tells `id` about every avatar that existed before it joined.
    fn replicate_existing_players(&mut self, id: ConnectionId) -> Result<()> {
        let server = self.server.as_ref().ok_or(ReplicationError::NotServer)?;
        let players: Vec<PlayerRecord> = server
            .connections
            .ids()
            .into_iter()
            .filter(|c| *c != id)
            .filter_map(|c| server.connections.get(c)?.player_entity())
            .filter_map(|entity| self.world.get(entity))
            .map(|entity| PlayerRecord {
                entity: entity.id(),
                prefab: entity.prefab(),
                transform: entity.transform,
            })
            .collect();
        if players.is_empty() {
            return Ok(());
        }

        let count = players.len();
        let call = protocol::spawn_players_call(&players);
        self.server_send(&Frame::Connected(call), SendTarget::Connection(id))?;
        self.emit(NetworkEvent::OtherPlayersSpawned { connection: id, count });
        Ok(())
    }

    fn on_client_disconnected(&mut self, id: ConnectionId) {
        let Some(server) = self.server.as_mut() else {
            return;
        };
        let Some(connection) = server.connections.get_mut(id) else {
            debug!("Disconnect for unknown {}", id);
            return;
        };
        let mut owned = connection.take_owned();
        let reason = server.kicked.remove(&id).unwrap_or(DisconnectReason::Remote);
        let host = server.host;

        owned.extend(self.world.owned_by(id));
        owned.sort();
        owned.dedup();
        let destroyed = self.destroy_locally(&owned);

        if !owned.is_empty() {
            let frame = Frame::Connected(protocol::destroy_many_call(&owned));
            let recipients = self.connections().map(|c| c.ids()).unwrap_or_default();
            for connection in recipients.into_iter().filter(|c| *c != id && Some(*c) != host) {
                if let Err(e) = self.server_send(&frame, SendTarget::Connection(connection)) {
                    warn!("Failed to send destroy batch to {}: {}", connection, e);
                }
            }
        }

        info!("Client {} {} ({} entities destroyed)", id, reason.as_str(), destroyed);
        self.emit(NetworkEvent::ClientDisconnected {
            connection: id,
            reason,
            destroyed,
        });

        if let Some(server) = self.server.as_mut() {
            server.connections.remove(id);
            if server.host == Some(id) {
                server.host = None;
            }
        }
    }
}
