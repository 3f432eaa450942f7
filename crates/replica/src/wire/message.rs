use std::fmt;

use crate::entity::EntityId;
use crate::error::CodecError;

use super::buffer::MessageBuffer;
use super::value::Value;

/// Leading `i32` tag of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Connected = 0,
    Disconnected = 1,
    Rpc = 2,
    TargetRpc = 3,
    SyncVar = 4,
    Command = 5,
}

impl Category {
    pub fn from_tag(tag: i32) -> Result<Self, CodecError> {
        Ok(match tag {
            0 => Self::Connected,
            1 => Self::Disconnected,
            2 => Self::Rpc,
            3 => Self::TargetRpc,
            4 => Self::SyncVar,
            5 => Self::Command,
            other => return Err(CodecError::UnknownCategory(other)),
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Rpc => "rpc",
            Self::TargetRpc => "target_rpc",
            Self::SyncVar => "sync_var",
            Self::Command => "command",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A framed message: category tag followed by category-specific fields.
///
/// Built in encoding mode with [`Message::new`], which writes the tag at once,
/// or in decoding mode with [`Message::decode`], which reads it at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    category: Category,
    buffer: MessageBuffer,
}

impl Message {
    pub fn new(category: Category, capacity: usize) -> Result<Self, CodecError> {
        let mut buffer = MessageBuffer::with_capacity(capacity);
        buffer.write_i32(category as i32)?;
        Ok(Self { category, buffer })
    }

    pub fn decode(bytes: Vec<u8>) -> Result<Self, CodecError> {
        let mut buffer = MessageBuffer::from_bytes(bytes);
        let category = Category::from_tag(buffer.read_i32()?)?;
        Ok(Self { category, buffer })
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn buffer(&self) -> &MessageBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut MessageBuffer {
        &mut self.buffer
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.buffer.write_position()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer.into_bytes()
    }
}

fn write_entity_id(buffer: &mut MessageBuffer, id: EntityId) -> Result<(), CodecError> {
    buffer.write_string(&id.to_string())
}

fn read_entity_id(buffer: &mut MessageBuffer) -> Result<EntityId, CodecError> {
    let raw = buffer.read_string()?;
    raw.parse().map_err(|_| CodecError::InvalidEntityId(raw))
}

fn write_args(buffer: &mut MessageBuffer, args: &[Value]) -> Result<(), CodecError> {
    let needed = 4 + args.iter().map(Value::encoded_len).sum::<usize>();
    if buffer.unwritten_length() < needed {
        return Err(CodecError::EncodeOverflow {
            needed,
            available: buffer.unwritten_length(),
        });
    }
    let count = i32::try_from(args.len()).map_err(|_| CodecError::EncodeOverflow {
        needed,
        available: buffer.unwritten_length(),
    })?;
    buffer.write_i32(count)?;
    for arg in args {
        arg.encode(buffer)?;
    }
    Ok(())
}

fn read_args(buffer: &mut MessageBuffer) -> Result<Vec<Value>, CodecError> {
    let count = buffer.read_i32()?;
    let count = usize::try_from(count).map_err(|_| CodecError::InvalidLength(count))?;
    // Every value takes at least two bytes, so a count beyond that is garbage.
    if count > buffer.unread_length() / 2 {
        return Err(CodecError::DecodeUnderflow {
            needed: count * 2,
            available: buffer.unread_length(),
        });
    }
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        args.push(Value::decode(buffer)?);
    }
    Ok(args)
}

/// Addressed method call, shared by Command, RPC and TargetRPC frames.
///
/// Layout: `[string entity_id][i32 component_index][string method][i32 argc][argc x value]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCall {
    pub entity_id: EntityId,
    pub component_index: i32,
    pub method: String,
    pub args: Vec<Value>,
}

impl RpcCall {
    pub fn new(entity_id: EntityId, component_index: i32, method: &str, args: Vec<Value>) -> Self {
        Self {
            entity_id,
            component_index,
            method: method.to_string(),
            args,
        }
    }

    pub fn write(&self, buffer: &mut MessageBuffer) -> Result<(), CodecError> {
        write_entity_id(buffer, self.entity_id)?;
        buffer.write_i32(self.component_index)?;
        buffer.write_string(&self.method)?;
        write_args(buffer, &self.args)
    }

    pub fn read(buffer: &mut MessageBuffer) -> Result<Self, CodecError> {
        Ok(Self {
            entity_id: read_entity_id(buffer)?,
            component_index: buffer.read_i32()?,
            method: buffer.read_string()?,
            args: read_args(buffer)?,
        })
    }
}

/// Field update. Layout: `[string entity_id][i32 component_index][string field][value]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncVarUpdate {
    pub entity_id: EntityId,
    pub component_index: i32,
    pub field: String,
    pub value: Value,
}

impl SyncVarUpdate {
    pub fn write(&self, buffer: &mut MessageBuffer) -> Result<(), CodecError> {
        write_entity_id(buffer, self.entity_id)?;
        buffer.write_i32(self.component_index)?;
        buffer.write_string(&self.field)?;
        self.value.encode(buffer)
    }

    pub fn read(buffer: &mut MessageBuffer) -> Result<Self, CodecError> {
        Ok(Self {
            entity_id: read_entity_id(buffer)?,
            component_index: buffer.read_i32()?,
            field: buffer.read_string()?,
            value: Value::decode(buffer)?,
        })
    }
}

/// Session-level call with no entity address. Layout: `[string method][i32 argc][argc x value]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectedCall {
    pub method: String,
    pub args: Vec<Value>,
}

impl ConnectedCall {
    pub fn new(method: &str, args: Vec<Value>) -> Self {
        Self {
            method: method.to_string(),
            args,
        }
    }

    pub fn write(&self, buffer: &mut MessageBuffer) -> Result<(), CodecError> {
        buffer.write_string(&self.method)?;
        write_args(buffer, &self.args)
    }

    pub fn read(buffer: &mut MessageBuffer) -> Result<Self, CodecError> {
        Ok(Self {
            method: buffer.read_string()?,
            args: read_args(buffer)?,
        })
    }
}

/// A fully decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Connected(ConnectedCall),
    Disconnected,
    Rpc(RpcCall),
    TargetRpc(RpcCall),
    SyncVar(SyncVarUpdate),
    Command(RpcCall),
}

impl Frame {
    pub fn category(&self) -> Category {
        match self {
            Self::Connected(_) => Category::Connected,
            Self::Disconnected => Category::Disconnected,
            Self::Rpc(_) => Category::Rpc,
            Self::TargetRpc(_) => Category::TargetRpc,
            Self::SyncVar(_) => Category::SyncVar,
            Self::Command(_) => Category::Command,
        }
    }

    /// Encodes into a message bounded by `max_size`. Nothing is returned on
    /// overflow, so an oversized frame can never be sent truncated.
    pub fn encode(&self, max_size: usize) -> Result<Message, CodecError> {
        let mut message = Message::new(self.category(), max_size)?;
        let buffer = message.buffer_mut();
        match self {
            Self::Connected(call) => call.write(buffer)?,
            Self::Disconnected => {}
            Self::Rpc(call) | Self::TargetRpc(call) | Self::Command(call) => call.write(buffer)?,
            Self::SyncVar(update) => update.write(buffer)?,
        }
        Ok(message)
    }

    /// Decodes one whole frame. Bytes left over after the payload are an error.
    pub fn decode(bytes: Vec<u8>) -> Result<Self, CodecError> {
        let mut message = Message::decode(bytes)?;
        let category = message.category();
        let buffer = message.buffer_mut();
        let frame = match category {
            Category::Connected => Self::Connected(ConnectedCall::read(buffer)?),
            Category::Disconnected => Self::Disconnected,
            Category::Rpc => Self::Rpc(RpcCall::read(buffer)?),
            Category::TargetRpc => Self::TargetRpc(RpcCall::read(buffer)?),
            Category::SyncVar => Self::SyncVar(SyncVarUpdate::read(buffer)?),
            Category::Command => Self::Command(RpcCall::read(buffer)?),
        };
        match buffer.unread_length() {
            0 => Ok(frame),
            extra => Err(CodecError::TrailingBytes(extra)),
        }
    }
}
