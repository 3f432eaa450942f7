pub mod behaviour;
pub mod config;
pub mod dispatch;
pub mod entity;
pub mod error;
pub mod events;
pub mod session;
pub mod stats;
pub mod transport;
pub mod wire;

pub use behaviour::{
    Args, Behaviour, BehaviourRegistry, CallContext, ComponentInfo, MethodKind, NetworkIdentity,
    Params, Registrar,
};
pub use config::NetworkConfig;
pub use dispatch::{ClientEvents, PendingCall, ServerEvents};
pub use entity::{ComponentRef, EntityId, PrefabTable, ReplicatedEntity, Transform, World};
pub use error::{ArgumentError, CodecError, ReplicationError, Result, TransportError};
pub use events::{DisconnectReason, NetworkEvent};
pub use session::{
    ClientConnectionState, Connection, ConnectionId, ConnectionRegistry, Network, PlayerSpawn, Role,
    SendTarget,
};
pub use stats::NetworkStats;
pub use transport::{LoopbackHub, LoopbackTransport, Transport};
pub use wire::{Category, Color32, FromValue, Frame, Message, MessageBuffer, Value, ValueKind};

pub const DEFAULT_TICK_RATE: u32 = 30;
