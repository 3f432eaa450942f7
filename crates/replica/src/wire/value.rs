use std::fmt;

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

use super::buffer::MessageBuffer;

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color32 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color32 {
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub const fn from_array([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }
}

/// Wire discriminant of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueKind {
    Bool = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    String = 7,
    Bytes = 8,
    Vec2 = 9,
    Vec3 = 10,
    Quat = 11,
    Color = 12,
}

impl ValueKind {
    pub fn from_tag(tag: u8) -> Result<Self, CodecError> {
        Ok(match tag {
            0 => Self::Bool,
            1 => Self::Byte,
            2 => Self::Short,
            3 => Self::Int,
            4 => Self::Long,
            5 => Self::Float,
            6 => Self::Double,
            7 => Self::String,
            8 => Self::Bytes,
            9 => Self::Vec2,
            10 => Self::Vec3,
            11 => Self::Quat,
            12 => Self::Color,
            other => return Err(CodecError::UnknownValueTag(other)),
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Quat => "quat",
            Self::Color => "color",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A self-describing argument or field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(u8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Vec2(Vec2),
    Vec3(Vec3),
    Quat(Quat),
    Color(Color32),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Byte(_) => ValueKind::Byte,
            Self::Short(_) => ValueKind::Short,
            Self::Int(_) => ValueKind::Int,
            Self::Long(_) => ValueKind::Long,
            Self::Float(_) => ValueKind::Float,
            Self::Double(_) => ValueKind::Double,
            Self::String(_) => ValueKind::String,
            Self::Bytes(_) => ValueKind::Bytes,
            Self::Vec2(_) => ValueKind::Vec2,
            Self::Vec3(_) => ValueKind::Vec3,
            Self::Quat(_) => ValueKind::Quat,
            Self::Color(_) => ValueKind::Color,
        }
    }

    /// Bytes this value occupies on the wire, discriminant included.
    pub fn encoded_len(&self) -> usize {
        1 + match self {
            Self::Bool(_) | Self::Byte(_) => 1,
            Self::Short(_) => 2,
            Self::Int(_) | Self::Float(_) | Self::Color(_) => 4,
            Self::Long(_) | Self::Double(_) | Self::Vec2(_) => 8,
            Self::Vec3(_) => 12,
            Self::Quat(_) => 16,
            Self::String(s) => 4 + s.len(),
            Self::Bytes(b) => 4 + b.len(),
        }
    }

    pub fn encode(&self, buffer: &mut MessageBuffer) -> Result<(), CodecError> {
        let needed = self.encoded_len();
        if buffer.unwritten_length() < needed {
            return Err(CodecError::EncodeOverflow {
                needed,
                available: buffer.unwritten_length(),
            });
        }

        buffer.write_u8(self.kind() as u8)?;
        match self {
            Self::Bool(v) => buffer.write_bool(*v),
            Self::Byte(v) => buffer.write_u8(*v),
            Self::Short(v) => buffer.write_i16(*v),
            Self::Int(v) => buffer.write_i32(*v),
            Self::Long(v) => buffer.write_i64(*v),
            Self::Float(v) => buffer.write_f32(*v),
            Self::Double(v) => buffer.write_f64(*v),
            Self::String(v) => buffer.write_string(v),
            Self::Bytes(v) => buffer.write_bytes(v),
            Self::Vec2(v) => buffer.write_vec2(*v),
            Self::Vec3(v) => buffer.write_vec3(*v),
            Self::Quat(v) => buffer.write_quat(*v),
            Self::Color(v) => buffer.write_color(*v),
        }
    }

    pub fn decode(buffer: &mut MessageBuffer) -> Result<Self, CodecError> {
        let checkpoint = buffer.read_position();
        let result = Self::decode_inner(buffer);
        if result.is_err() {
            buffer.rewind_to(checkpoint);
        }
        result
    }

    fn decode_inner(buffer: &mut MessageBuffer) -> Result<Self, CodecError> {
        let kind = ValueKind::from_tag(buffer.read_u8()?)?;
        Ok(match kind {
            ValueKind::Bool => Self::Bool(buffer.read_bool()?),
            ValueKind::Byte => Self::Byte(buffer.read_u8()?),
            ValueKind::Short => Self::Short(buffer.read_i16()?),
            ValueKind::Int => Self::Int(buffer.read_i32()?),
            ValueKind::Long => Self::Long(buffer.read_i64()?),
            ValueKind::Float => Self::Float(buffer.read_f32()?),
            ValueKind::Double => Self::Double(buffer.read_f64()?),
            ValueKind::String => Self::String(buffer.read_string()?),
            ValueKind::Bytes => Self::Bytes(buffer.read_bytes()?),
            ValueKind::Vec2 => Self::Vec2(buffer.read_vec2()?),
            ValueKind::Vec3 => Self::Vec3(buffer.read_vec3()?),
            ValueKind::Quat => Self::Quat(buffer.read_quat()?),
            ValueKind::Color => Self::Color(buffer.read_color()?),
        })
    }
}

/// Typed extraction from a [`Value`], used by method invokers and sync var setters.
pub trait FromValue: Sized {
    const KIND: ValueKind;

    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! value_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }

            impl FromValue for $ty {
                const KIND: ValueKind = ValueKind::$variant;

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v.clone()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

value_conversions! {
    bool => Bool,
    u8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => String,
    Vec<u8> => Bytes,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Quat => Quat,
    Color32 => Color,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_kind() {
        for tag in 0..=12u8 {
            let kind = ValueKind::from_tag(tag).unwrap();
            assert_eq!(kind as u8, tag);
        }
        assert_eq!(ValueKind::from_tag(13), Err(CodecError::UnknownValueTag(13)));
    }

    #[test]
    fn encoded_len_matches_written_bytes() {
        let values = [
            Value::Bool(true),
            Value::Short(-4),
            Value::Long(1 << 40),
            Value::String("kills".into()),
            Value::Bytes(vec![1, 2, 3]),
            Value::Quat(Quat::IDENTITY),
            Value::Color(Color32::WHITE),
        ];
        for value in values {
            let mut buffer = MessageBuffer::with_capacity(64);
            value.encode(&mut buffer).unwrap();
            assert_eq!(buffer.write_position(), value.encoded_len(), "{value:?}");
        }
    }

    #[test]
    fn value_overflow_writes_nothing() {
        let mut buffer = MessageBuffer::with_capacity(4);
        let err = Value::Vec2(Vec2::ZERO).encode(&mut buffer).unwrap_err();
        assert_eq!(
            err,
            CodecError::EncodeOverflow {
                needed: 9,
                available: 4
            }
        );
        assert_eq!(buffer.write_position(), 0);
    }

    #[test]
    fn unknown_tag_leaves_cursor_in_place() {
        let mut buffer = MessageBuffer::from_bytes(vec![200, 0, 0, 0, 0]);
        assert_eq!(
            Value::decode(&mut buffer).unwrap_err(),
            CodecError::UnknownValueTag(200)
        );
        assert_eq!(buffer.read_position(), 0);
    }

    #[test]
    fn truncated_payload_leaves_cursor_in_place() {
        let mut buffer = MessageBuffer::from_bytes(vec![ValueKind::Int as u8, 1, 2]);
        assert!(matches!(
            Value::decode(&mut buffer),
            Err(CodecError::DecodeUnderflow { .. })
        ));
        assert_eq!(buffer.read_position(), 0);
    }

    #[test]
    fn from_value_checks_kind() {
        assert_eq!(i32::from_value(&Value::Int(5)), Some(5));
        assert_eq!(i32::from_value(&Value::Long(5)), None);
        assert_eq!(String::from_value(&Value::from("a")), Some("a".to_string()));
        assert_eq!(<Vec3 as FromValue>::KIND, ValueKind::Vec3);
        assert_eq!(ValueKind::Color.to_string(), "color");
    }
}
