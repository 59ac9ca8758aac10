//! Envelope layout for the TCP control channel
//!
//! Every frame on the control channel carries a fixed addressing header
//! followed by two protobuf bodies:
//!
//! ```text
//! [16]    source uuid
//! [16]    destination uuid
//! u16 BE  operation length
//! [..]    GatewayOperation protobuf
//! [..]    inner payload protobuf (type selected by the operation)
//! ```
//!
//! The 4-byte big-endian total length that precedes this on the wire is the
//! framer's concern, not the envelope's.

use comfoconnect_core::{ComfoError, ComfoResult};
use uuid::Uuid;

use crate::op::{GatewayResult, OperationType};
use crate::wire::{ProtoReader, ProtoWriter};

/// Fixed envelope header length: two uuids plus the operation length word.
pub const ENVELOPE_HEADER_LENGTH: usize = 16 + 16 + 2;

/// The envelope operation: addressing-free metadata of a single message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOperation {
    pub op_type: OperationType,
    pub result: GatewayResult,
    pub result_description: Option<String>,
    pub reference: Option<u32>,
}

impl GatewayOperation {
    /// Create a request operation with a reference
    pub fn request(op_type: OperationType, reference: u32) -> Self {
        Self {
            op_type,
            result: GatewayResult::Ok,
            result_description: None,
            reference: Some(reference),
        }
    }

    /// Encode to protobuf bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ProtoWriter::with_capacity(8);
        writer.varint_field(1, u64::from(self.op_type.to_u32()));
        if self.result != GatewayResult::Ok {
            writer.varint_field(2, u64::from(self.result.to_u32()));
        }
        if let Some(description) = &self.result_description {
            writer.string_field(3, description);
        }
        if let Some(reference) = self.reference {
            writer.varint_field(4, u64::from(reference));
        }
        writer.into_bytes()
    }

    /// Decode from protobuf bytes
    pub fn decode(data: &[u8]) -> ComfoResult<Self> {
        let mut op_type = OperationType::NoOperation;
        let mut result = GatewayResult::Ok;
        let mut result_description = None;
        let mut reference = None;

        let mut reader = ProtoReader::new(data);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => {
                    let raw = value.as_u32()?;
                    op_type = OperationType::from_u32(raw).ok_or_else(|| {
                        ComfoError::ProtocolViolation(format!("unknown operation type {raw}"))
                    })?;
                }
                2 => {
                    let raw = value.as_u32()?;
                    result = GatewayResult::from_u32(raw).ok_or_else(|| {
                        ComfoError::ProtocolViolation(format!("unknown gateway result {raw}"))
                    })?;
                }
                3 => result_description = Some(value.as_string()?),
                4 => reference = Some(value.as_u32()?),
                _ => {}
            }
        }

        Ok(Self {
            op_type,
            result,
            result_description,
            reference,
        })
    }
}

/// A complete control-channel message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub src: Uuid,
    pub dst: Uuid,
    pub operation: GatewayOperation,
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Create a new envelope
    pub fn new(src: Uuid, dst: Uuid, operation: GatewayOperation, payload: Vec<u8>) -> Self {
        Self {
            src,
            dst,
            operation,
            payload,
        }
    }

    /// Encode to the frame body (without the outer length prefix)
    pub fn encode(&self) -> Vec<u8> {
        let operation = self.operation.encode();
        let mut out =
            Vec::with_capacity(ENVELOPE_HEADER_LENGTH + operation.len() + self.payload.len());
        out.extend_from_slice(self.src.as_bytes());
        out.extend_from_slice(self.dst.as_bytes());
        out.extend_from_slice(&(operation.len() as u16).to_be_bytes());
        out.extend_from_slice(&operation);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Decode from a frame body
    pub fn decode(data: &[u8]) -> ComfoResult<Self> {
        if data.len() < ENVELOPE_HEADER_LENGTH {
            return Err(ComfoError::ProtocolViolation(format!(
                "envelope too short: expected at least {ENVELOPE_HEADER_LENGTH} bytes, got {}",
                data.len()
            )));
        }
        let mut src = [0u8; 16];
        src.copy_from_slice(&data[0..16]);
        let mut dst = [0u8; 16];
        dst.copy_from_slice(&data[16..32]);
        let (src, dst) = (Uuid::from_bytes(src), Uuid::from_bytes(dst));
        let op_len = usize::from(u16::from_be_bytes([data[32], data[33]]));
        let op_end = ENVELOPE_HEADER_LENGTH
            .checked_add(op_len)
            .filter(|end| *end <= data.len())
            .ok_or_else(|| {
                ComfoError::ProtocolViolation(format!(
                    "operation length {op_len} exceeds envelope of {} bytes",
                    data.len()
                ))
            })?;
        let operation = GatewayOperation::decode(&data[ENVELOPE_HEADER_LENGTH..op_end])?;
        Ok(Self {
            src,
            dst,
            operation,
            payload: data[op_end..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuid_from_byte(last: u8) -> Uuid {
        let mut bytes = [0u8; 16];
        bytes[15] = last;
        Uuid::from_bytes(bytes)
    }

    #[test]
    fn test_operation_encoding_matches_wire_bytes() {
        let operation = GatewayOperation::request(OperationType::StartSessionRequest, 1);
        // type = 3 (field 1), reference = 1 (field 4)
        assert_eq!(operation.encode(), vec![0x08, 0x03, 0x20, 0x01]);
    }

    #[test]
    fn test_operation_round_trip_with_result() {
        let operation = GatewayOperation {
            op_type: OperationType::StartSessionConfirm,
            result: GatewayResult::NotAllowed,
            result_description: Some("unknown app".to_string()),
            reference: Some(7),
        };
        let decoded = GatewayOperation::decode(&operation.encode()).unwrap();
        assert_eq!(decoded, operation);
    }

    #[test]
    fn test_envelope_round_trip() {
        let envelope = Envelope::new(
            uuid_from_byte(0x37),
            uuid_from_byte(0x55),
            GatewayOperation::request(OperationType::CnRmiRequest, 2),
            vec![0x08, 0x01],
        );
        let encoded = envelope.encode();
        assert_eq!(encoded[..16], *uuid_from_byte(0x37).as_bytes());
        assert_eq!(encoded[16..32], *uuid_from_byte(0x55).as_bytes());
        assert_eq!(&encoded[32..34], &[0x00, 0x04]);

        let decoded = Envelope::decode(&encoded).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_truncated_envelope_is_rejected() {
        assert!(Envelope::decode(&[0u8; 10]).is_err());

        // Header claims a longer operation than the buffer holds.
        let mut data = vec![0u8; ENVELOPE_HEADER_LENGTH];
        data[33] = 0x10;
        assert!(Envelope::decode(&data).is_err());
    }
}
