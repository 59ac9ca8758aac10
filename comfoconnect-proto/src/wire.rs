//! Protobuf wire primitives
//!
//! Minimal proto2 field encoding: varints, length-delimited fields and the
//! fixed widths, enough to carry the Zehnder message set. Unknown fields are
//! skipped on decode so newer bridge firmware stays parseable.

use comfoconnect_core::{ComfoError, ComfoResult};

const WIRE_VARINT: u32 = 0;
const WIRE_FIXED64: u32 = 1;
const WIRE_LENGTH_DELIMITED: u32 = 2;
const WIRE_FIXED32: u32 = 5;

/// Protobuf message writer
pub struct ProtoWriter {
    buffer: Vec<u8>,
}

impl ProtoWriter {
    /// Create a new writer
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a new writer with initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Write a varint field (uint32/uint64/bool/enum)
    pub fn varint_field(&mut self, field: u32, value: u64) {
        self.key(field, WIRE_VARINT);
        self.varint(value);
    }

    /// Write a bool field
    pub fn bool_field(&mut self, field: u32, value: bool) {
        self.varint_field(field, u64::from(value));
    }

    /// Write a length-delimited bytes field
    pub fn bytes_field(&mut self, field: u32, data: &[u8]) {
        self.key(field, WIRE_LENGTH_DELIMITED);
        self.varint(data.len() as u64);
        self.buffer.extend_from_slice(data);
    }

    /// Write a length-delimited string field
    pub fn string_field(&mut self, field: u32, text: &str) {
        self.bytes_field(field, text.as_bytes());
    }

    /// Write an embedded message field
    pub fn message_field(&mut self, field: u32, message: &[u8]) {
        self.bytes_field(field, message);
    }

    /// Consume the writer and return the encoded bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    fn key(&mut self, field: u32, wire_type: u32) {
        self.varint(u64::from(field << 3 | wire_type));
    }

    fn varint(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                self.buffer.push(byte);
                return;
            }
            self.buffer.push(byte | 0x80);
        }
    }
}

impl Default for ProtoWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// A single decoded protobuf field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Varint(u64),
    Fixed64(u64),
    Bytes(&'a [u8]),
    Fixed32(u32),
}

impl<'a> FieldValue<'a> {
    /// The field as an unsigned varint, or a decode error
    pub fn as_u64(&self) -> ComfoResult<u64> {
        match self {
            FieldValue::Varint(v) => Ok(*v),
            other => Err(ComfoError::Decode(format!("expected varint, got {other:?}"))),
        }
    }

    /// The field as a u32 varint, or a decode error
    pub fn as_u32(&self) -> ComfoResult<u32> {
        Ok(self.as_u64()? as u32)
    }

    /// The field as a bool varint, or a decode error
    pub fn as_bool(&self) -> ComfoResult<bool> {
        Ok(self.as_u64()? != 0)
    }

    /// The field as raw length-delimited bytes, or a decode error
    pub fn as_bytes(&self) -> ComfoResult<&'a [u8]> {
        match self {
            FieldValue::Bytes(data) => Ok(data),
            other => Err(ComfoError::Decode(format!(
                "expected length-delimited field, got {other:?}"
            ))),
        }
    }

    /// The field as a UTF-8 string, or a decode error
    pub fn as_string(&self) -> ComfoResult<String> {
        let data = self.as_bytes()?;
        String::from_utf8(data.to_vec())
            .map_err(|e| ComfoError::Decode(format!("invalid UTF-8 in string field: {e}")))
    }
}

/// Protobuf message reader
pub struct ProtoReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ProtoReader<'a> {
    /// Create a new reader over a message body
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Read the next field, `None` at end of message
    pub fn next_field(&mut self) -> ComfoResult<Option<(u32, FieldValue<'a>)>> {
        if self.position >= self.data.len() {
            return Ok(None);
        }
        let key = self.varint()?;
        let field = (key >> 3) as u32;
        if field == 0 {
            return Err(ComfoError::Decode("field number 0 is invalid".to_string()));
        }
        let value = match (key & 0x7) as u32 {
            WIRE_VARINT => FieldValue::Varint(self.varint()?),
            WIRE_FIXED64 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(self.take(8)?);
                FieldValue::Fixed64(u64::from_le_bytes(buf))
            }
            WIRE_LENGTH_DELIMITED => {
                let length = self.varint()? as usize;
                FieldValue::Bytes(self.take(length)?)
            }
            WIRE_FIXED32 => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(self.take(4)?);
                FieldValue::Fixed32(u32::from_le_bytes(buf))
            }
            other => {
                return Err(ComfoError::Decode(format!(
                    "unsupported wire type {other} for field {field}"
                )))
            }
        };
        Ok(Some((field, value)))
    }

    fn varint(&mut self) -> ComfoResult<u64> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let byte = *self
                .data
                .get(self.position)
                .ok_or_else(|| ComfoError::Decode("truncated varint".to_string()))?;
            self.position += 1;
            value |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(ComfoError::Decode("varint longer than 10 bytes".to_string()))
    }

    fn take(&mut self, length: usize) -> ComfoResult<&'a [u8]> {
        let end = self
            .position
            .checked_add(length)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| ComfoError::Decode("truncated field".to_string()))?;
        let slice = &self.data[self.position..end];
        self.position = end;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_field_encoding() {
        let mut writer = ProtoWriter::new();
        writer.varint_field(1, 3);
        writer.varint_field(4, 1);
        // field 1 varint -> key 0x08, field 4 varint -> key 0x20
        assert_eq!(writer.into_bytes(), vec![0x08, 0x03, 0x20, 0x01]);
    }

    #[test]
    fn test_multi_byte_varint() {
        let mut writer = ProtoWriter::new();
        writer.varint_field(1, 300);
        let bytes = writer.into_bytes();
        assert_eq!(bytes, vec![0x08, 0xAC, 0x02]);

        let mut reader = ProtoReader::new(&bytes);
        let (field, value) = reader.next_field().unwrap().unwrap();
        assert_eq!(field, 1);
        assert_eq!(value.as_u64().unwrap(), 300);
        assert!(reader.next_field().unwrap().is_none());
    }

    #[test]
    fn test_bytes_round_trip() {
        let mut writer = ProtoWriter::new();
        writer.bytes_field(2, &[0xDE, 0xAD]);
        writer.string_field(3, "bridge");
        let bytes = writer.into_bytes();

        let mut reader = ProtoReader::new(&bytes);
        let (field, value) = reader.next_field().unwrap().unwrap();
        assert_eq!(field, 2);
        assert_eq!(value.as_bytes().unwrap(), &[0xDE, 0xAD]);
        let (field, value) = reader.next_field().unwrap().unwrap();
        assert_eq!(field, 3);
        assert_eq!(value.as_string().unwrap(), "bridge");
    }

    #[test]
    fn test_unknown_wire_types_are_skippable() {
        let mut writer = ProtoWriter::new();
        writer.varint_field(7, 42);
        let mut bytes = writer.into_bytes();
        // Append a fixed32 field the caller does not know about.
        bytes.push(5 << 3 | 5);
        bytes.extend_from_slice(&7u32.to_le_bytes());

        let mut reader = ProtoReader::new(&bytes);
        assert_eq!(reader.next_field().unwrap().unwrap().0, 7);
        let (field, value) = reader.next_field().unwrap().unwrap();
        assert_eq!(field, 5);
        assert_eq!(value, FieldValue::Fixed32(7));
    }

    #[test]
    fn test_truncated_input_errors() {
        // Length-delimited field claiming 10 bytes with only 2 present.
        let bytes = vec![0x12, 0x0A, 0x01, 0x02];
        let mut reader = ProtoReader::new(&bytes);
        assert!(reader.next_field().is_err());
    }
}
