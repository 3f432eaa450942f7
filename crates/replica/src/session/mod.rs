//! Session state: the connection registry and the network context with its
//! server and client halves.

mod client;
mod connection;
mod network;
pub mod protocol;
mod server;

use bitflags::bitflags;

pub use connection::{
    ClientConnectionState, Connection, ConnectionId, ConnectionRegistry, SendTarget,
};
pub use network::{Network, PlayerSpawn, SpawnPolicy};

bitflags! {
    /// Which halves of the session this process runs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Role: u8 {
        const SERVER = 1 << 0;
        const CLIENT = 1 << 1;
        const HOST = Self::SERVER.bits() | Self::CLIENT.bits();
    }
}
