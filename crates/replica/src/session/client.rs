use log::{debug, info, warn};

use crate::dispatch::{ClientInbound, PendingCall, client_queue};
use crate::entity::{ComponentRef, EntityId, ReplicatedEntity};
use crate::error::{ReplicationError, Result};
use crate::events::NetworkEvent;
use crate::transport::Transport;
use crate::wire::{Category, ConnectedCall, Frame, RpcCall, SyncVarUpdate, Value};

use super::connection::ClientConnectionState;
use super::network::{ClientState, Network};
use super::protocol::{self, PlayerRecord, SpawnFrame};

impl<T: Transport> Network<T> {
    /// Starts connecting the client half. Ignored while already connecting or connected.
    pub fn connect(&mut self, address: &str) -> Result<()> {
        if self.client_state() != ClientConnectionState::Disconnected {
            debug!("Connect to {} ignored: client is {:?}", address, self.client_state());
            return Ok(());
        }
        let (events, inbound) = client_queue(self.config.max_message_size);
        self.client = Some(ClientState {
            state: ClientConnectionState::Connecting,
            inbound,
        });
        if let Err(e) = self.transport.client_connect(address, events) {
            self.client = None;
            warn!("Failed to connect to {}: {}", address, e);
            return Err(e.into());
        }
        info!("Connecting to {}", address);
        Ok(())
    }

    pub fn disconnect(&mut self) {
        let Some(client) = self.client.as_mut() else {
            return;
        };
        if matches!(
            client.state,
            ClientConnectionState::Connecting | ClientConnectionState::Connected
        ) {
            client.state = ClientConnectionState::Disconnecting;
            self.transport.client_disconnect();
        }
    }

    /// Sends a command on a component this client has authority over.
    pub fn send_command(
        &mut self,
        component: ComponentRef,
        method: &str,
        args: Vec<Value>,
    ) -> Result<()> {
        if !self.is_client_connected() {
            return Err(ReplicationError::NotClient);
        }
        let slot = self.world.component(component)?;
        if !slot.has_authority() {
            return Err(ReplicationError::AuthorityViolation {
                entity: component.entity,
                reason: "no local authority over the component",
            });
        }
        self.registry
            .resolve_method(slot.behaviour(), method, Category::Command, &args)?;

        let call = RpcCall::new(component.entity, component.index, method, args);
        self.client_send(&Frame::Command(call))
    }

    pub(crate) fn handle_client_inbound(&mut self, item: ClientInbound) {
        match item {
            ClientInbound::Connected => {
                if let Some(client) = self.client.as_mut() {
                    if client.state == ClientConnectionState::Connecting {
                        client.state = ClientConnectionState::Connected;
                        info!("Connected to server");
                        self.emit(NetworkEvent::ConnectedToServer);
                    }
                }
            }
            ClientInbound::Disconnected => {
                if self.client.take().is_some() {
                    if self.server.is_none() {
                        self.world.clear();
                    }
                    info!("Disconnected from server");
                    self.emit(NetworkEvent::DisconnectedFromServer);
                }
            }
            ClientInbound::Call(call) => {
                if self.client.is_none() {
                    return;
                }
                self.stats.frames_received += 1;
                let category = call.category();
                match self.apply_client_call(call) {
                    Ok(()) => self.stats.calls_applied += 1,
                    Err(e) => self.reject(category, None, e),
                }
            }
        }
    }

    fn apply_client_call(&mut self, call: PendingCall) -> Result<()> {
        match call {
            PendingCall::Invoke {
                category: Category::TargetRpc,
                call,
            } if protocol::is_core_method(&call.method) => self.apply_core_target(&call),
            PendingCall::Invoke { category, call } => self.invoke(category, &call, None),
            PendingCall::SyncVar(update) => self.apply_sync_var(update),
            PendingCall::Session(call) => self.apply_session(&call),
        }
    }

    fn apply_core_target(&mut self, call: &RpcCall) -> Result<()> {
        match call.method.as_str() {
            protocol::SPAWN_OBJECT => self.apply_spawn(SpawnFrame::from_target_call(call)?),
            _ => {
                self.destroy_locally(&[call.entity_id]);
                Ok(())
            }
        }
    }

    fn apply_session(&mut self, call: &ConnectedCall) -> Result<()> {
        match call.method.as_str() {
            protocol::SPAWN_OBJECT => self.apply_spawn(SpawnFrame::from_connected_call(call)?),
            protocol::SPAWN_PLAYER_OBJECTS => {
                let players = protocol::parse_spawn_players(call)?;
                self.apply_spawn_players(&players)
            }
            protocol::DESTROY_OBJECTS => {
                let ids = protocol::parse_destroy_many(call)?;
                self.destroy_locally(&ids);
                Ok(())
            }
            other => Err(ReplicationError::resolution(other, "unknown session method")),
        }
    }

    /// Registers an announced entity. The host's client half adopts the
    /// server's instance instead of building a second one.
    fn apply_spawn(&mut self, frame: SpawnFrame) -> Result<()> {
        if let Some(existing) = self.world.get_mut(frame.entity) {
            if !frame.recipient_is_host {
                return Err(ReplicationError::DuplicateEntity(frame.entity));
            }
            existing.set_authority(frame.has_authority);
            debug!("Adopted host instance of {}", frame.entity);
            return Ok(());
        }
        if frame.recipient_is_host {
            return Err(ReplicationError::UnresolvedTarget {
                entity: frame.entity,
                component_index: protocol::CORE_COMPONENT,
            });
        }
        self.instantiate_replica(frame.entity, frame.prefab, frame.has_authority, frame.transform)
    }

    fn apply_spawn_players(&mut self, players: &[PlayerRecord]) -> Result<()> {
        for player in players {
            if self.world.contains(player.entity) {
                continue;
            }
            self.instantiate_replica(player.entity, player.prefab, false, player.transform)?;
        }
        Ok(())
    }

    fn instantiate_replica(
        &mut self,
        id: EntityId,
        prefab: usize,
        has_authority: bool,
        transform: crate::entity::Transform,
    ) -> Result<()> {
        let behaviours = self.prefabs.instantiate(prefab)?;
        self.world.insert(ReplicatedEntity::new(
            id,
            prefab,
            None,
            has_authority,
            transform,
            behaviours,
        ))?;
        if let Some(entity) = self.world.get_mut(id) {
            entity.start();
        }
        debug!("Replicated entity {} (prefab {})", id, prefab);
        self.emit(NetworkEvent::EntitySpawned { entity: id, prefab });
        Ok(())
    }

    fn apply_sync_var(&mut self, update: SyncVarUpdate) -> Result<()> {
        let target = ComponentRef::new(update.entity_id, update.component_index);
        let slot = self.world.component_mut(target)?;
        let entry = self.registry.resolve_sync_var(slot.behaviour(), &update.field)?;
        entry
            .set(slot.behaviour_mut(), &update.value)
            .map_err(|e| ReplicationError::resolution(&update.field, e.to_string()))?;
        slot.behaviour_mut().on_sync_var_changed(&update.field);

        debug!("Sync var {} on {} = {:?}", update.field, target, update.value);
        self.emit(NetworkEvent::SyncVarChanged {
            entity: update.entity_id,
            component_index: update.component_index,
            field: update.field,
        });
        Ok(())
    }
}
