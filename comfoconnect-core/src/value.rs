//! Typed values exchanged with the unit over RMI and PDO
//!
//! The ComfoNet side of the bridge describes every property and process-data
//! object with a small type code. Values travel as little-endian byte strings
//! whose width is dictated by that code.

use serde::{Deserialize, Serialize};

use crate::error::{ComfoError, ComfoResult};

/// Seconds between the Unix epoch and 2000-01-01T00:00:00Z, the epoch used by
/// the unit for all time values.
pub const EPOCH_2000_OFFSET: i64 = 946_684_800;

/// ComfoNet type code for properties and process-data objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PdoType {
    Bool = 0x00,
    UInt8 = 0x01,
    UInt16 = 0x02,
    UInt32 = 0x03,
    Int8 = 0x05,
    Int16 = 0x06,
    Int64 = 0x08,
    String = 0x09,
    Time = 0x10,
    Version = 0x11,
}

impl PdoType {
    /// Create from the raw type code
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Bool),
            0x01 => Some(Self::UInt8),
            0x02 => Some(Self::UInt16),
            0x03 => Some(Self::UInt32),
            0x05 => Some(Self::Int8),
            0x06 => Some(Self::Int16),
            0x08 => Some(Self::Int64),
            0x09 => Some(Self::String),
            0x10 => Some(Self::Time),
            0x11 => Some(Self::Version),
            _ => None,
        }
    }

    /// Convert to the raw type code
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Wire width in bytes, `None` for variable-length types
    pub fn width(self) -> Option<usize> {
        match self {
            Self::Bool | Self::UInt8 | Self::Int8 => Some(1),
            Self::UInt16 | Self::Int16 => Some(2),
            Self::UInt32 | Self::Time | Self::Version => Some(4),
            Self::Int64 => Some(8),
            Self::String => None,
        }
    }

    /// Whether the type decodes as a signed integer
    pub fn is_signed(self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int64)
    }
}

/// A decoded property or process-data value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    UInt(u64),
    Int(i64),
    /// UTF-8 text, NUL padding stripped
    Text(String),
    /// Seconds since 2000-01-01T00:00:00Z
    Time(u32),
    /// Raw bytes for types without a dedicated decoder
    Raw(Vec<u8>),
    /// Element sequence, encoded as a count byte followed by the elements
    Array(Vec<Value>),
}

impl Value {
    /// Encode the value to the little-endian wire form for `pdo_type`.
    pub fn encode(&self, pdo_type: PdoType) -> ComfoResult<Vec<u8>> {
        match (self, pdo_type) {
            (Value::Bool(b), PdoType::Bool) => Ok(vec![u8::from(*b)]),
            (Value::UInt(v), PdoType::UInt8) => Ok(checked_unsigned(*v, 1)?),
            (Value::UInt(v), PdoType::UInt16) => Ok(checked_unsigned(*v, 2)?),
            (Value::UInt(v), PdoType::UInt32) => Ok(checked_unsigned(*v, 4)?),
            (Value::Int(v), PdoType::Int8) => Ok(checked_signed(*v, 1)?),
            (Value::Int(v), PdoType::Int16) => Ok(checked_signed(*v, 2)?),
            (Value::Int(v), PdoType::Int64) => Ok(checked_signed(*v, 8)?),
            (Value::Time(v), PdoType::Time) => Ok(v.to_le_bytes().to_vec()),
            (Value::Text(s), PdoType::String) => {
                let mut out = s.as_bytes().to_vec();
                out.push(0);
                Ok(out)
            }
            (Value::Raw(bytes), _) => Ok(bytes.clone()),
            (Value::Array(values), elem) => {
                let mut out = vec![values.len() as u8];
                for value in values {
                    out.extend_from_slice(&value.encode(elem)?);
                }
                Ok(out)
            }
            (value, pdo_type) => Err(ComfoError::Decode(format!(
                "cannot encode {value:?} as {pdo_type:?}"
            ))),
        }
    }

    /// Decode a little-endian wire value of type `pdo_type`.
    pub fn decode(data: &[u8], pdo_type: PdoType) -> ComfoResult<Value> {
        if let Some(width) = pdo_type.width() {
            if data.len() < width {
                return Err(ComfoError::Decode(format!(
                    "value of type {:?} needs {} bytes, got {}",
                    pdo_type,
                    width,
                    data.len()
                )));
            }
        }
        match pdo_type {
            PdoType::Bool => Ok(Value::Bool(data[0] == 1)),
            PdoType::UInt8 | PdoType::UInt16 | PdoType::UInt32 => {
                Ok(Value::UInt(le_unsigned(data)))
            }
            PdoType::Int8 | PdoType::Int16 | PdoType::Int64 => Ok(Value::Int(le_signed(data))),
            PdoType::Time => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(&data[..4]);
                Ok(Value::Time(u32::from_le_bytes(buf)))
            }
            PdoType::String => {
                let text = std::str::from_utf8(data)
                    .map_err(|e| ComfoError::Decode(format!("invalid UTF-8 string: {e}")))?;
                Ok(Value::Text(text.trim_end_matches('\0').to_string()))
            }
            PdoType::Version => Ok(Value::Raw(data.to_vec())),
        }
    }
}

/// Little-endian unsigned decode of up to 8 bytes.
pub fn le_unsigned(data: &[u8]) -> u64 {
    let mut out = 0u64;
    for (i, byte) in data.iter().take(8).enumerate() {
        out |= u64::from(*byte) << (8 * i);
    }
    out
}

/// Little-endian sign-extending decode of up to 8 bytes.
pub fn le_signed(data: &[u8]) -> i64 {
    let len = data.len().min(8);
    if len == 0 {
        return 0;
    }
    let unsigned = le_unsigned(data);
    let shift = 64 - 8 * len as u32;
    ((unsigned << shift) as i64) >> shift
}

fn checked_unsigned(value: u64, width: usize) -> ComfoResult<Vec<u8>> {
    if width < 8 && value >= 1u64 << (8 * width) {
        return Err(ComfoError::Decode(format!(
            "value {value} does not fit in {width} byte(s)"
        )));
    }
    Ok(value.to_le_bytes()[..width].to_vec())
}

fn checked_signed(value: i64, width: usize) -> ComfoResult<Vec<u8>> {
    if width < 8 {
        let bits = 8 * width as u32;
        let min = -(1i64 << (bits - 1));
        let max = (1i64 << (bits - 1)) - 1;
        if value < min || value > max {
            return Err(ComfoError::Decode(format!(
                "value {value} does not fit in {width} byte(s)"
            )));
        }
    }
    Ok(value.to_le_bytes()[..width].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsigned_round_trip() {
        for (value, pdo_type) in [
            (0u64, PdoType::UInt8),
            (255, PdoType::UInt8),
            (0x0960, PdoType::UInt16),
            (u64::from(u32::MAX), PdoType::UInt32),
        ] {
            let encoded = Value::UInt(value).encode(pdo_type).unwrap();
            assert_eq!(encoded.len(), pdo_type.width().unwrap());
            assert_eq!(Value::decode(&encoded, pdo_type).unwrap(), Value::UInt(value));
        }
    }

    #[test]
    fn test_signed_round_trip() {
        for (value, pdo_type) in [
            (-1i64, PdoType::Int8),
            (-128, PdoType::Int8),
            (-1, PdoType::Int16),
            (2400, PdoType::Int16),
            (i64::MIN, PdoType::Int64),
        ] {
            let encoded = Value::Int(value).encode(pdo_type).unwrap();
            assert_eq!(Value::decode(&encoded, pdo_type).unwrap(), Value::Int(value));
        }
    }

    #[test]
    fn test_encode_rejects_out_of_range() {
        assert!(Value::UInt(256).encode(PdoType::UInt8).is_err());
        assert!(Value::Int(40_000).encode(PdoType::Int16).is_err());
        assert!(Value::Int(-129).encode(PdoType::Int8).is_err());
    }

    #[test]
    fn test_string_decode_strips_nul_padding() {
        let decoded = Value::decode(b"ComfoAirQ\0\0\0", PdoType::String).unwrap();
        assert_eq!(decoded, Value::Text("ComfoAirQ".to_string()));

        let encoded = Value::Text("ComfoAirQ".to_string())
            .encode(PdoType::String)
            .unwrap();
        assert_eq!(encoded, b"ComfoAirQ\0");
    }

    #[test]
    fn test_bool_and_time() {
        assert_eq!(
            Value::decode(&[0x01], PdoType::Bool).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            Value::Bool(false).encode(PdoType::Bool).unwrap(),
            vec![0x00]
        );
        let encoded = Value::Time(86_400).encode(PdoType::Time).unwrap();
        assert_eq!(
            Value::decode(&encoded, PdoType::Time).unwrap(),
            Value::Time(86_400)
        );
    }

    #[test]
    fn test_array_encoding() {
        let encoded = Value::Array(vec![Value::UInt(4), Value::UInt(6)])
            .encode(PdoType::UInt8)
            .unwrap();
        assert_eq!(encoded, vec![0x02, 0x04, 0x06]);
    }

    #[test]
    fn test_short_value_is_rejected() {
        assert!(Value::decode(&[0x60], PdoType::Int16).is_err());
    }

    #[test]
    fn test_sign_extension() {
        assert_eq!(le_signed(&[0xFF, 0xFF]), -1);
        assert_eq!(le_signed(&[0x60, 0x09]), 0x0960);
        assert_eq!(le_signed(&[0x00, 0x80]), -32768);
        assert_eq!(le_unsigned(&[0xFF, 0xFF]), 65535);
    }
}
