use thiserror::Error;

use crate::entity::EntityId;
use crate::session::ConnectionId;
use crate::wire::ValueKind;

/// Failures of the wire codec. Encode failures never leave a partial write
/// behind, decode failures never move the read cursor past the available bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("encode overflow: needed {needed} bytes, {available} unwritten")]
    EncodeOverflow { needed: usize, available: usize },

    #[error("decode underflow: needed {needed} bytes, {available} unread")]
    DecodeUnderflow { needed: usize, available: usize },

    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid length prefix {0}")]
    InvalidLength(i32),

    #[error("unknown value tag {0}")]
    UnknownValueTag(u8),

    #[error("unknown message category {0}")]
    UnknownCategory(i32),

    #[error("malformed entity id {0:?}")]
    InvalidEntityId(String),

    #[error("frame of {size} bytes exceeds the {max} byte message limit")]
    MessageTooLarge { size: usize, max: usize },

    #[error("{0} unread bytes after the end of the frame")]
    TrailingBytes(usize),
}

/// A typed invoker could not read its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("argument {index} is missing")]
    Missing { index: usize },

    #[error("argument {index} was not declared")]
    Unexpected { index: usize },

    #[error("argument {index}: expected {expected}, got {actual}")]
    TypeMismatch {
        index: usize,
        expected: ValueKind,
        actual: ValueKind,
    },

    #[error("behaviour type does not match its registration table")]
    WrongBehaviour,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("server is not listening")]
    NotListening,

    #[error("server is already listening")]
    AlreadyListening,

    #[error("server is full ({max} connections)")]
    ServerFull { max: usize },

    #[error("client is already connected")]
    AlreadyConnected,

    #[error("client is not connected")]
    NotConnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplicationError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("prefab index {0} is not a configured spawnable template")]
    UnknownPrefab(usize),

    #[error("entity {0} is already registered")]
    DuplicateEntity(EntityId),

    #[error("authority violation on entity {entity}: {reason}")]
    AuthorityViolation {
        entity: EntityId,
        reason: &'static str,
    },

    #[error("no component {component_index} on entity {entity}")]
    UnresolvedTarget {
        entity: EntityId,
        component_index: i32,
    },

    #[error("cannot resolve {name:?}: {reason}")]
    MethodResolutionFailure { name: String, reason: String },

    #[error("operation requires an active server")]
    NotServer,

    #[error("operation requires a connected client")]
    NotClient,

    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),
}

impl ReplicationError {
    pub(crate) fn resolution(name: &str, reason: impl Into<String>) -> Self {
        Self::MethodResolutionFailure {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_authority_violation(&self) -> bool {
        matches!(self, Self::AuthorityViolation { .. })
    }
}

pub type Result<T, E = ReplicationError> = std::result::Result<T, E>;
