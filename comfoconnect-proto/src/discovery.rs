//! Discovery datagram codec
//!
//! Bridges answer a fixed two-byte probe on UDP port 56747 with a
//! `DiscoveryOperation` carrying a `SearchGatewayResponse`.

use comfoconnect_core::{ComfoError, ComfoResult};
use uuid::Uuid;

use crate::wire::{ProtoReader, ProtoWriter};

/// The constant probe datagram: a `DiscoveryOperation` holding an empty
/// `SearchGatewayRequest` in field 1.
pub const SEARCH_GATEWAY_REQUEST: &[u8] = &[0x0A, 0x00];

/// A bridge's answer to the search probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchGatewayResponse {
    pub ip_address: String,
    pub uuid: Uuid,
    pub version: u32,
}

impl SearchGatewayResponse {
    /// Decode a discovery reply datagram.
    ///
    /// The datagram is a `DiscoveryOperation`; the response lives in field 2.
    pub fn decode(datagram: &[u8]) -> ComfoResult<Self> {
        let mut reader = ProtoReader::new(datagram);
        while let Some((field, value)) = reader.next_field()? {
            if field == 2 {
                return Self::decode_body(value.as_bytes()?);
            }
        }
        Err(ComfoError::Decode(
            "datagram carries no search gateway response".to_string(),
        ))
    }

    fn decode_body(data: &[u8]) -> ComfoResult<Self> {
        let mut ip_address = None;
        let mut uuid = None;
        let mut version = 0;
        let mut reader = ProtoReader::new(data);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => ip_address = Some(value.as_string()?),
                2 => {
                    let raw = value.as_bytes()?;
                    uuid = Some(Uuid::from_slice(raw).map_err(|_| {
                        ComfoError::Decode(format!("bridge uuid of {} bytes", raw.len()))
                    })?);
                }
                3 => version = value.as_u32()?,
                _ => {}
            }
        }
        match (ip_address, uuid) {
            (Some(ip_address), Some(uuid)) => Ok(Self {
                ip_address,
                uuid,
                version,
            }),
            _ => Err(ComfoError::Decode(
                "search gateway response missing address or uuid".to_string(),
            )),
        }
    }

    /// Encode a reply datagram (used by tests and bridge emulation).
    pub fn encode(&self) -> Vec<u8> {
        let mut body = ProtoWriter::new();
        body.string_field(1, &self.ip_address);
        body.bytes_field(2, self.uuid.as_bytes());
        body.varint_field(3, u64::from(self.version));
        let mut outer = ProtoWriter::new();
        outer.message_field(2, &body.into_bytes());
        outer.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_is_an_empty_search_request() {
        // Field 1, length-delimited, zero length.
        assert_eq!(SEARCH_GATEWAY_REQUEST, &[0x0A, 0x00]);
    }

    #[test]
    fn test_response_round_trip() {
        let response = SearchGatewayResponse {
            ip_address: "192.168.1.213".to_string(),
            uuid: Uuid::from_bytes([0xA5; 16]),
            version: 1,
        };
        let decoded = SearchGatewayResponse::decode(&response.encode()).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_probe_echo_is_rejected() {
        // A host on the same segment sees its own probe; it must not parse
        // as a bridge reply.
        assert!(SearchGatewayResponse::decode(SEARCH_GATEWAY_REQUEST).is_err());
    }

    #[test]
    fn test_response_without_uuid_is_rejected() {
        let mut body = ProtoWriter::new();
        body.string_field(1, "192.168.1.213");
        let mut outer = ProtoWriter::new();
        outer.message_field(2, &body.into_bytes());
        assert!(SearchGatewayResponse::decode(&outer.into_bytes()).is_err());
    }
}
