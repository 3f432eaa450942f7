//! Core-handled session frames: the spawn handshake and destroy notifications.

use crate::behaviour::Args;
use crate::entity::{EntityId, Transform};
use crate::error::{ArgumentError, ReplicationError, Result};
use crate::wire::{ConnectedCall, RpcCall, Value};

pub const SPAWN_OBJECT: &str = "SpawnObject";
pub const DESTROY_OBJECT: &str = "DestroyObject";
pub const DESTROY_OBJECTS: &str = "DestroyObjects";
pub const SPAWN_PLAYER_OBJECTS: &str = "SpawnPlayerObjects";

/// Component index core frames are addressed at.
pub const CORE_COMPONENT: i32 = 0;

pub(crate) fn is_core_method(name: &str) -> bool {
    matches!(name, SPAWN_OBJECT | DESTROY_OBJECT)
}

fn malformed(method: &str, err: ArgumentError) -> ReplicationError {
    ReplicationError::resolution(method, err.to_string())
}

fn prefab_arg(args: &Args<'_>, index: usize, method: &str) -> Result<usize> {
    let raw = args.get::<i32>(index).map_err(|e| malformed(method, e))?;
    usize::try_from(raw)
        .map_err(|_| ReplicationError::resolution(method, format!("negative prefab index {raw}")))
}

fn entity_arg(args: &Args<'_>, index: usize, method: &str) -> Result<EntityId> {
    let raw = args.get::<String>(index).map_err(|e| malformed(method, e))?;
    raw.parse()
        .map_err(|_| ReplicationError::resolution(method, format!("malformed entity id {raw:?}")))
}

/// One entity announcement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SpawnFrame {
    pub prefab: usize,
    pub entity: EntityId,
    pub has_authority: bool,
    pub transform: Transform,
    pub recipient_is_host: bool,
}

impl SpawnFrame {
    /// TargetRPC form, addressed at the new entity:
    /// `[prefab, has_authority, position, rotation, recipient_is_host]`.
    pub fn to_target_call(self) -> RpcCall {
        RpcCall::new(
            self.entity,
            CORE_COMPONENT,
            SPAWN_OBJECT,
            vec![
                Value::Int(self.prefab as i32),
                Value::Bool(self.has_authority),
                Value::Vec3(self.transform.position),
                Value::Quat(self.transform.rotation),
                Value::Bool(self.recipient_is_host),
            ],
        )
    }

    pub fn from_target_call(call: &RpcCall) -> Result<Self> {
        let args = Args::new(&call.args);
        let get = |e| malformed(SPAWN_OBJECT, e);
        Ok(Self {
            prefab: prefab_arg(&args, 0, SPAWN_OBJECT)?,
            entity: call.entity_id,
            has_authority: args.get(1).map_err(get)?,
            transform: Transform {
                position: args.get(2).map_err(get)?,
                rotation: args.get(3).map_err(get)?,
            },
            recipient_is_host: args.get(4).map_err(get)?,
        })
    }

    /// Session form used for the on-connect avatar announcement:
    /// `[prefab, entity_id, has_authority, position, rotation, is_host]`.
    pub fn to_connected_call(self) -> ConnectedCall {
        ConnectedCall::new(
            SPAWN_OBJECT,
            vec![
                Value::Int(self.prefab as i32),
                Value::String(self.entity.to_string()),
                Value::Bool(self.has_authority),
                Value::Vec3(self.transform.position),
                Value::Quat(self.transform.rotation),
                Value::Bool(self.recipient_is_host),
            ],
        )
    }

    pub fn from_connected_call(call: &ConnectedCall) -> Result<Self> {
        let args = Args::new(&call.args);
        let get = |e| malformed(SPAWN_OBJECT, e);
        Ok(Self {
            prefab: prefab_arg(&args, 0, SPAWN_OBJECT)?,
            entity: entity_arg(&args, 1, SPAWN_OBJECT)?,
            has_authority: args.get(2).map_err(get)?,
            transform: Transform {
                position: args.get(3).map_err(get)?,
                rotation: args.get(4).map_err(get)?,
            },
            recipient_is_host: args.get(5).map_err(get)?,
        })
    }
}

/// Existing avatar listed in a `SpawnPlayerObjects` frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PlayerRecord {
    pub entity: EntityId,
    pub prefab: usize,
    pub transform: Transform,
}

const PLAYER_RECORD_WIDTH: usize = 4;

/// Flat `(entity_id, prefab, position, rotation)` groups.
pub(crate) fn spawn_players_call(players: &[PlayerRecord]) -> ConnectedCall {
    let args = players
        .iter()
        .flat_map(|p| {
            [
                Value::String(p.entity.to_string()),
                Value::Int(p.prefab as i32),
                Value::Vec3(p.transform.position),
                Value::Quat(p.transform.rotation),
            ]
        })
        .collect();
    ConnectedCall::new(SPAWN_PLAYER_OBJECTS, args)
}

pub(crate) fn parse_spawn_players(call: &ConnectedCall) -> Result<Vec<PlayerRecord>> {
    if call.args.len() % PLAYER_RECORD_WIDTH != 0 {
        return Err(ReplicationError::resolution(
            SPAWN_PLAYER_OBJECTS,
            format!("{} arguments is not a whole number of players", call.args.len()),
        ));
    }
    let args = Args::new(&call.args);
    let get = |e| malformed(SPAWN_PLAYER_OBJECTS, e);
    (0..call.args.len())
        .step_by(PLAYER_RECORD_WIDTH)
        .map(|base| -> Result<PlayerRecord> {
            Ok(PlayerRecord {
                entity: entity_arg(&args, base, SPAWN_PLAYER_OBJECTS)?,
                prefab: prefab_arg(&args, base + 1, SPAWN_PLAYER_OBJECTS)?,
                transform: Transform {
                    position: args.get(base + 2).map_err(get)?,
                    rotation: args.get(base + 3).map_err(get)?,
                },
            })
        })
        .collect()
}

pub(crate) fn destroy_call(entity: EntityId) -> RpcCall {
    RpcCall::new(entity, CORE_COMPONENT, DESTROY_OBJECT, Vec::new())
}

pub(crate) fn destroy_many_call(entities: &[EntityId]) -> ConnectedCall {
    let args = entities.iter().map(|id| Value::String(id.to_string())).collect();
    ConnectedCall::new(DESTROY_OBJECTS, args)
}

pub(crate) fn parse_destroy_many(call: &ConnectedCall) -> Result<Vec<EntityId>> {
    let args = Args::new(&call.args);
    (0..args.len())
        .map(|index| entity_arg(&args, index, DESTROY_OBJECTS))
        .collect()
}
