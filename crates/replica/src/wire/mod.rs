//! Binary wire format: byte buffer, tagged values and message frames.

mod buffer;
mod message;
mod value;

pub use buffer::{DEFAULT_MAX_MESSAGE_SIZE, MessageBuffer};
pub use message::{Category, ConnectedCall, Frame, Message, RpcCall, SyncVarUpdate};
pub use value::{Color32, FromValue, Value, ValueKind};
