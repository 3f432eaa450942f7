use glam::{Quat, Vec2, Vec3};

use crate::error::CodecError;

use super::value::Color32;

pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024;

/// Size of the `i32` length prefix in front of strings and byte arrays.
const LENGTH_PREFIX: usize = 4;

/// Growable byte buffer with independent write and read cursors.
///
/// The buffer never grows past `capacity`. Every write checks the remaining
/// space for the whole value first, so a failed write leaves the write cursor
/// where it was. Reads do the same against the unread bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBuffer {
    data: Vec<u8>,
    capacity: usize,
    read_position: usize,
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_MESSAGE_SIZE)
    }
}

impl MessageBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity.min(256)),
            capacity,
            read_position: 0,
        }
    }

    /// Wraps a fully received frame for reading. The frame is its own capacity.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            capacity: bytes.len(),
            data: bytes,
            read_position: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn write_position(&self) -> usize {
        self.data.len()
    }

    pub fn read_position(&self) -> usize {
        self.read_position
    }

    pub fn unwritten_length(&self) -> usize {
        self.capacity - self.data.len()
    }

    pub fn unread_length(&self) -> usize {
        self.data.len() - self.read_position
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Moves the read cursor back to an earlier position, undoing a partial read.
    pub(crate) fn rewind_to(&mut self, position: usize) {
        debug_assert!(position <= self.read_position);
        self.read_position = position;
    }

    fn ensure_unwritten(&self, needed: usize) -> Result<(), CodecError> {
        let available = self.unwritten_length();
        if available < needed {
            return Err(CodecError::EncodeOverflow { needed, available });
        }
        Ok(())
    }

    fn ensure_unread(&self, needed: usize) -> Result<(), CodecError> {
        let available = self.unread_length();
        if available < needed {
            return Err(CodecError::DecodeUnderflow { needed, available });
        }
        Ok(())
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        self.ensure_unread(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.read_position..self.read_position + N]);
        self.read_position += N;
        Ok(out)
    }

    fn prefixed_len(len: usize) -> Result<i32, CodecError> {
        i32::try_from(len).map_err(|_| CodecError::EncodeOverflow {
            needed: len,
            available: i32::MAX as usize,
        })
    }

    // Writes

    pub fn write_u8(&mut self, value: u8) -> Result<(), CodecError> {
        self.ensure_unwritten(1)?;
        self.data.push(value);
        Ok(())
    }

    pub fn write_bool(&mut self, value: bool) -> Result<(), CodecError> {
        self.write_u8(u8::from(value))
    }

    pub fn write_i16(&mut self, value: i16) -> Result<(), CodecError> {
        self.ensure_unwritten(2)?;
        self.data.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<(), CodecError> {
        self.ensure_unwritten(4)?;
        self.data.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn write_i64(&mut self, value: i64) -> Result<(), CodecError> {
        self.ensure_unwritten(8)?;
        self.data.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<(), CodecError> {
        self.ensure_unwritten(4)?;
        self.data.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<(), CodecError> {
        self.ensure_unwritten(8)?;
        self.data.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Length-prefixed byte array.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.ensure_unwritten(LENGTH_PREFIX + bytes.len())?;
        let len = Self::prefixed_len(bytes.len())?;
        self.data.extend_from_slice(&len.to_le_bytes());
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Length-prefixed UTF-8.
    pub fn write_string(&mut self, value: &str) -> Result<(), CodecError> {
        self.write_bytes(value.as_bytes())
    }

    pub fn write_vec2(&mut self, value: Vec2) -> Result<(), CodecError> {
        self.ensure_unwritten(8)?;
        for component in value.to_array() {
            self.data.extend_from_slice(&component.to_le_bytes());
        }
        Ok(())
    }

    pub fn write_vec3(&mut self, value: Vec3) -> Result<(), CodecError> {
        self.ensure_unwritten(12)?;
        for component in value.to_array() {
            self.data.extend_from_slice(&component.to_le_bytes());
        }
        Ok(())
    }

    pub fn write_quat(&mut self, value: Quat) -> Result<(), CodecError> {
        self.ensure_unwritten(16)?;
        for component in value.to_array() {
            self.data.extend_from_slice(&component.to_le_bytes());
        }
        Ok(())
    }

    pub fn write_color(&mut self, value: Color32) -> Result<(), CodecError> {
        self.ensure_unwritten(4)?;
        self.data.extend_from_slice(&value.to_array());
        Ok(())
    }

    // Reads

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i16(&mut self) -> Result<i16, CodecError> {
        Ok(i16::from_le_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, CodecError> {
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, CodecError> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, CodecError> {
        Ok(f64::from_le_bytes(self.take_array()?))
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        self.ensure_unread(LENGTH_PREFIX)?;
        let start = self.read_position;
        let mut prefix = [0u8; LENGTH_PREFIX];
        prefix.copy_from_slice(&self.data[start..start + LENGTH_PREFIX]);
        let len = i32::from_le_bytes(prefix);
        let len = usize::try_from(len).map_err(|_| CodecError::InvalidLength(len))?;

        self.ensure_unread(LENGTH_PREFIX + len)?;
        let body = start + LENGTH_PREFIX;
        let bytes = self.data[body..body + len].to_vec();
        self.read_position = body + len;
        Ok(bytes)
    }

    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let checkpoint = self.read_position;
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|_| {
            self.read_position = checkpoint;
            CodecError::InvalidUtf8
        })
    }

    pub fn read_vec2(&mut self) -> Result<Vec2, CodecError> {
        self.ensure_unread(8)?;
        Ok(Vec2::new(self.read_f32()?, self.read_f32()?))
    }

    pub fn read_vec3(&mut self) -> Result<Vec3, CodecError> {
        self.ensure_unread(12)?;
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    pub fn read_quat(&mut self) -> Result<Quat, CodecError> {
        self.ensure_unread(16)?;
        Ok(Quat::from_xyzw(
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ))
    }

    pub fn read_color(&mut self) -> Result<Color32, CodecError> {
        Ok(Color32::from_array(self.take_array()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursors_track_written_and_read_bytes() {
        let mut buffer = MessageBuffer::with_capacity(32);
        buffer.write_i32(7).unwrap();
        buffer.write_bool(true).unwrap();

        assert_eq!(buffer.write_position(), 5);
        assert_eq!(buffer.unwritten_length(), 27);
        assert_eq!(buffer.unread_length(), 5);

        assert_eq!(buffer.read_i32().unwrap(), 7);
        assert_eq!(buffer.unread_length(), 1);
        assert!(buffer.read_bool().unwrap());
        assert_eq!(buffer.unread_length(), 0);
    }

    #[test]
    fn overflow_leaves_write_cursor_unchanged() {
        let mut buffer = MessageBuffer::with_capacity(10);
        buffer.write_i32(1).unwrap();

        let err = buffer.write_vec3(Vec3::ONE).unwrap_err();
        assert_eq!(
            err,
            CodecError::EncodeOverflow {
                needed: 12,
                available: 6
            }
        );
        assert_eq!(buffer.write_position(), 4);

        let err = buffer.write_string("seven chars").unwrap_err();
        assert!(matches!(err, CodecError::EncodeOverflow { needed: 15, .. }));
        assert_eq!(buffer.write_position(), 4);
    }

    #[test]
    fn underflow_does_not_advance_read_cursor() {
        let mut buffer = MessageBuffer::from_bytes(vec![1, 0, 0]);

        let err = buffer.read_i32().unwrap_err();
        assert_eq!(
            err,
            CodecError::DecodeUnderflow {
                needed: 4,
                available: 3
            }
        );
        assert_eq!(buffer.read_position(), 0);
        assert_eq!(buffer.read_u8().unwrap(), 1);
    }

    #[test]
    fn truncated_string_is_rejected_atomically() {
        let mut source = MessageBuffer::with_capacity(64);
        source.write_string("pinecone").unwrap();
        let mut bytes = source.into_bytes();
        bytes.truncate(7);

        let mut buffer = MessageBuffer::from_bytes(bytes);
        let err = buffer.read_string().unwrap_err();
        assert_eq!(
            err,
            CodecError::DecodeUnderflow {
                needed: 12,
                available: 7
            }
        );
        assert_eq!(buffer.read_position(), 0);
    }

    #[test]
    fn negative_length_prefix_is_invalid() {
        let mut buffer = MessageBuffer::from_bytes((-3i32).to_le_bytes().to_vec());
        assert_eq!(buffer.read_bytes().unwrap_err(), CodecError::InvalidLength(-3));
        assert_eq!(buffer.read_position(), 0);
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let mut source = MessageBuffer::with_capacity(16);
        source.write_bytes(&[0xff, 0xfe]).unwrap();

        let mut buffer = MessageBuffer::from_bytes(source.into_bytes());
        assert_eq!(buffer.read_string().unwrap_err(), CodecError::InvalidUtf8);
        assert_eq!(buffer.read_position(), 0);
    }

    #[test]
    fn composite_values_round_trip() {
        let mut buffer = MessageBuffer::with_capacity(128);
        let rotation = Quat::from_rotation_y(1.25);
        buffer.write_vec2(Vec2::new(1.5, -2.0)).unwrap();
        buffer.write_vec3(Vec3::new(3.0, 4.0, -5.5)).unwrap();
        buffer.write_quat(rotation).unwrap();
        buffer.write_color(Color32::new(10, 20, 30, 255)).unwrap();
        buffer.write_f64(std::f64::consts::PI).unwrap();
        buffer.write_i64(-9_000_000_000).unwrap();
        buffer.write_i16(-12).unwrap();

        let mut buffer = MessageBuffer::from_bytes(buffer.into_bytes());
        assert_eq!(buffer.read_vec2().unwrap(), Vec2::new(1.5, -2.0));
        assert_eq!(buffer.read_vec3().unwrap(), Vec3::new(3.0, 4.0, -5.5));
        assert_eq!(buffer.read_quat().unwrap(), rotation);
        assert_eq!(buffer.read_color().unwrap(), Color32::new(10, 20, 30, 255));
        assert_eq!(buffer.read_f64().unwrap(), std::f64::consts::PI);
        assert_eq!(buffer.read_i64().unwrap(), -9_000_000_000);
        assert_eq!(buffer.read_i16().unwrap(), -12);
        assert_eq!(buffer.unread_length(), 0);
    }
}
