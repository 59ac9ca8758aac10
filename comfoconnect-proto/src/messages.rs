//! Inner operation messages
//!
//! One struct per payload protobuf the client exchanges with the bridge.
//! Codecs are symmetric where that is useful for capture replay and in-process
//! bridge emulation in tests. Empty confirm bodies have no struct.

use comfoconnect_core::{ComfoError, ComfoResult};
use uuid::Uuid;

use crate::wire::{ProtoReader, ProtoWriter};

fn decode_uuid(data: &[u8]) -> ComfoResult<Uuid> {
    Uuid::from_slice(data)
        .map_err(|_| ComfoError::Decode(format!("uuid field of {} bytes", data.len())))
}

/// RegisterAppRequest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterAppRequest {
    pub uuid: Uuid,
    pub pin: u32,
    pub device_name: String,
}

impl RegisterAppRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ProtoWriter::new();
        writer.bytes_field(1, self.uuid.as_bytes());
        writer.varint_field(2, u64::from(self.pin));
        writer.string_field(3, &self.device_name);
        writer.into_bytes()
    }
}

/// StartSessionRequest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartSessionRequest {
    pub take_over: bool,
}

impl StartSessionRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ProtoWriter::new();
        if self.take_over {
            writer.bool_field(1, true);
        }
        writer.into_bytes()
    }
}

/// StartSessionConfirm
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StartSessionConfirm {
    pub device_name: String,
    pub resumed: bool,
}

impl StartSessionConfirm {
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ProtoWriter::new();
        if !self.device_name.is_empty() {
            writer.string_field(1, &self.device_name);
        }
        if self.resumed {
            writer.bool_field(2, true);
        }
        writer.into_bytes()
    }

    pub fn decode(data: &[u8]) -> ComfoResult<Self> {
        let mut confirm = Self::default();
        let mut reader = ProtoReader::new(data);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => confirm.device_name = value.as_string()?,
                2 => confirm.resumed = value.as_bool()?,
                _ => {}
            }
        }
        Ok(confirm)
    }
}

/// A registered application entry in ListRegisteredAppsConfirm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredApp {
    pub uuid: Uuid,
    pub device_name: String,
}

/// ListRegisteredAppsConfirm
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListRegisteredAppsConfirm {
    pub apps: Vec<RegisteredApp>,
}

impl ListRegisteredAppsConfirm {
    pub fn decode(data: &[u8]) -> ComfoResult<Self> {
        let mut confirm = Self::default();
        let mut reader = ProtoReader::new(data);
        while let Some((field, value)) = reader.next_field()? {
            if field == 1 {
                let mut uuid = None;
                let mut device_name = String::new();
                let mut app_reader = ProtoReader::new(value.as_bytes()?);
                while let Some((app_field, app_value)) = app_reader.next_field()? {
                    match app_field {
                        1 => uuid = Some(decode_uuid(app_value.as_bytes()?)?),
                        2 => device_name = app_value.as_string()?,
                        _ => {}
                    }
                }
                let uuid = uuid
                    .ok_or_else(|| ComfoError::Decode("registered app without uuid".to_string()))?;
                confirm.apps.push(RegisteredApp { uuid, device_name });
            }
        }
        Ok(confirm)
    }
}

/// DeregisterAppRequest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeregisterAppRequest {
    pub uuid: Uuid,
}

impl DeregisterAppRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ProtoWriter::new();
        writer.bytes_field(1, self.uuid.as_bytes());
        writer.into_bytes()
    }
}

/// ChangePinRequest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangePinRequest {
    pub old_pin: u32,
    pub new_pin: u32,
}

impl ChangePinRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ProtoWriter::new();
        writer.varint_field(1, u64::from(self.old_pin));
        writer.varint_field(2, u64::from(self.new_pin));
        writer.into_bytes()
    }
}

/// VersionConfirm
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionConfirm {
    pub gateway_version: u32,
    pub serial_number: String,
    pub comfonet_version: u32,
}

impl VersionConfirm {
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ProtoWriter::new();
        writer.varint_field(1, u64::from(self.gateway_version));
        writer.string_field(2, &self.serial_number);
        writer.varint_field(3, u64::from(self.comfonet_version));
        writer.into_bytes()
    }

    pub fn decode(data: &[u8]) -> ComfoResult<Self> {
        let mut confirm = Self::default();
        let mut reader = ProtoReader::new(data);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => confirm.gateway_version = value.as_u32()?,
                2 => confirm.serial_number = value.as_string()?,
                3 => confirm.comfonet_version = value.as_u32()?,
                _ => {}
            }
        }
        Ok(confirm)
    }
}

/// CnTimeRequest; `set_time` is in seconds since 2000-01-01T00:00:00Z
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CnTimeRequest {
    pub set_time: Option<u32>,
}

impl CnTimeRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ProtoWriter::new();
        if let Some(set_time) = self.set_time {
            writer.varint_field(1, u64::from(set_time));
        }
        writer.into_bytes()
    }
}

/// CnTimeConfirm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CnTimeConfirm {
    pub current_time: u32,
}

impl CnTimeConfirm {
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ProtoWriter::new();
        writer.varint_field(1, u64::from(self.current_time));
        writer.into_bytes()
    }

    pub fn decode(data: &[u8]) -> ComfoResult<Self> {
        let mut confirm = Self::default();
        let mut reader = ProtoReader::new(data);
        while let Some((field, value)) = reader.next_field()? {
            if field == 1 {
                confirm.current_time = value.as_u32()?;
            }
        }
        Ok(confirm)
    }
}

/// CnRmiRequest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CnRmiRequest {
    pub node_id: u8,
    pub message: Vec<u8>,
}

impl CnRmiRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ProtoWriter::new();
        writer.varint_field(1, u64::from(self.node_id));
        writer.bytes_field(2, &self.message);
        writer.into_bytes()
    }
}

/// CnRmiResponse; also used for CnRmiAsyncResponse, which shares the layout
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CnRmiResponse {
    pub result: u32,
    pub message: Vec<u8>,
}

impl CnRmiResponse {
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ProtoWriter::new();
        if self.result != 0 {
            writer.varint_field(1, u64::from(self.result));
        }
        if !self.message.is_empty() {
            writer.bytes_field(2, &self.message);
        }
        writer.into_bytes()
    }

    pub fn decode(data: &[u8]) -> ComfoResult<Self> {
        let mut response = Self::default();
        let mut reader = ProtoReader::new(data);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => response.result = value.as_u32()?,
                2 => response.message = value.as_bytes()?.to_vec(),
                _ => {}
            }
        }
        Ok(response)
    }
}

/// CnRpdoRequest; `timeout` of 0 cancels an active subscription, an absent
/// timeout subscribes indefinitely (bridge default 0xFFFFFFFF)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CnRpdoRequest {
    pub pdid: u16,
    pub zone: u8,
    pub pdo_type: u32,
    pub timeout: Option<u32>,
}

impl CnRpdoRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ProtoWriter::new();
        writer.varint_field(1, u64::from(self.pdid));
        writer.varint_field(2, u64::from(self.zone));
        writer.varint_field(3, u64::from(self.pdo_type));
        if let Some(timeout) = self.timeout {
            writer.varint_field(4, u64::from(timeout));
        }
        writer.into_bytes()
    }
}

/// CnRpdoNotification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CnRpdoNotification {
    pub pdid: u16,
    pub data: Vec<u8>,
    pub zone: u8,
}

impl CnRpdoNotification {
    pub fn decode(data: &[u8]) -> ComfoResult<Self> {
        let mut pdid = None;
        let mut sample = Vec::new();
        let mut zone = 1u8;
        let mut reader = ProtoReader::new(data);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => pdid = Some(value.as_u32()? as u16),
                2 => sample = value.as_bytes()?.to_vec(),
                3 => zone = value.as_u32()? as u8,
                _ => {}
            }
        }
        let pdid =
            pdid.ok_or_else(|| ComfoError::Decode("rpdo notification without pdid".to_string()))?;
        Ok(Self {
            pdid,
            data: sample,
            zone,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ProtoWriter::new();
        writer.varint_field(1, u64::from(self.pdid));
        writer.bytes_field(2, &self.data);
        writer.varint_field(3, u64::from(self.zone));
        writer.into_bytes()
    }
}

/// CnAlarmNotification
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CnAlarmNotification {
    pub zone: u8,
    pub product_id: u32,
    pub product_variant: u32,
    pub serial_number: String,
    pub sw_program_version: u32,
    pub errors: Vec<u8>,
    pub error_id: u32,
    pub node_id: u8,
}

impl CnAlarmNotification {
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ProtoWriter::new();
        writer.varint_field(1, u64::from(self.zone));
        writer.varint_field(2, u64::from(self.product_id));
        writer.varint_field(3, u64::from(self.product_variant));
        if !self.serial_number.is_empty() {
            writer.string_field(4, &self.serial_number);
        }
        writer.varint_field(5, u64::from(self.sw_program_version));
        if !self.errors.is_empty() {
            writer.bytes_field(6, &self.errors);
        }
        writer.varint_field(7, u64::from(self.error_id));
        writer.varint_field(8, u64::from(self.node_id));
        writer.into_bytes()
    }

    pub fn decode(data: &[u8]) -> ComfoResult<Self> {
        let mut alarm = Self::default();
        let mut reader = ProtoReader::new(data);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => alarm.zone = value.as_u32()? as u8,
                2 => alarm.product_id = value.as_u32()?,
                3 => alarm.product_variant = value.as_u32()?,
                4 => alarm.serial_number = value.as_string()?,
                5 => alarm.sw_program_version = value.as_u32()?,
                6 => alarm.errors = value.as_bytes()?.to_vec(),
                7 => alarm.error_id = value.as_u32()?,
                8 => alarm.node_id = value.as_u32()? as u8,
                _ => {}
            }
        }
        Ok(alarm)
    }
}

/// GatewayNotification
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GatewayNotification {
    pub push_uuids: Vec<Vec<u8>>,
    pub alarm: Option<CnAlarmNotification>,
}

impl GatewayNotification {
    pub fn decode(data: &[u8]) -> ComfoResult<Self> {
        let mut notification = Self::default();
        let mut reader = ProtoReader::new(data);
        while let Some((field, value)) = reader.next_field()? {
            match field {
                1 => notification.push_uuids.push(value.as_bytes()?.to_vec()),
                2 => notification.alarm = Some(CnAlarmNotification::decode(value.as_bytes()?)?),
                _ => {}
            }
        }
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_app_request_encoding() {
        let uuid = Uuid::from_bytes([0x11; 16]);
        let request = RegisterAppRequest {
            uuid,
            pin: 4321,
            device_name: "living room".to_string(),
        };
        let bytes = request.encode();

        let mut reader = ProtoReader::new(&bytes);
        let (field, value) = reader.next_field().unwrap().unwrap();
        assert_eq!((field, value.as_bytes().unwrap()), (1, &[0x11u8; 16][..]));
        let (field, value) = reader.next_field().unwrap().unwrap();
        assert_eq!((field, value.as_u64().unwrap()), (2, 4321));
        let (field, value) = reader.next_field().unwrap().unwrap();
        assert_eq!((field, value.as_string().unwrap()), (3, "living room".to_string()));
    }

    #[test]
    fn test_start_session_request_take_over() {
        assert!(StartSessionRequest { take_over: false }.encode().is_empty());
        assert_eq!(
            StartSessionRequest { take_over: true }.encode(),
            vec![0x08, 0x01]
        );
    }

    #[test]
    fn test_rmi_request_encoding() {
        let request = CnRmiRequest {
            node_id: 1,
            message: vec![0x83, 0x15, 0x01, 0x01],
        };
        assert_eq!(
            request.encode(),
            vec![0x08, 0x01, 0x12, 0x04, 0x83, 0x15, 0x01, 0x01]
        );
    }

    #[test]
    fn test_rmi_response_decoding() {
        // result = 0 omitted, message = [0x01, 0x02]
        let response = CnRmiResponse::decode(&[0x12, 0x02, 0x01, 0x02]).unwrap();
        assert_eq!(response.result, 0);
        assert_eq!(response.message, vec![0x01, 0x02]);

        let failed = CnRmiResponse::decode(&[0x08, 0x0B]).unwrap();
        assert_eq!(failed.result, 11);
    }

    #[test]
    fn test_rpdo_request_cancel_encodes_zero_timeout() {
        let cancel = CnRpdoRequest {
            pdid: 276,
            zone: 1,
            pdo_type: 6,
            timeout: Some(0),
        };
        assert_eq!(
            cancel.encode(),
            vec![0x08, 0x94, 0x02, 0x10, 0x01, 0x18, 0x06, 0x20, 0x00]
        );

        let subscribe = CnRpdoRequest {
            pdid: 276,
            zone: 1,
            pdo_type: 6,
            timeout: None,
        };
        assert_eq!(
            subscribe.encode(),
            vec![0x08, 0x94, 0x02, 0x10, 0x01, 0x18, 0x06]
        );
    }

    #[test]
    fn test_rpdo_notification_round_trip() {
        let notification = CnRpdoNotification {
            pdid: 276,
            data: vec![0x60, 0x09],
            zone: 1,
        };
        let decoded = CnRpdoNotification::decode(&notification.encode()).unwrap();
        assert_eq!(decoded, notification);
    }

    #[test]
    fn test_list_registered_apps_decoding() {
        let mut app = ProtoWriter::new();
        app.bytes_field(1, &[0x22; 16]);
        app.string_field(2, "kitchen");
        let mut outer = ProtoWriter::new();
        outer.message_field(1, &app.into_bytes());

        let confirm = ListRegisteredAppsConfirm::decode(&outer.into_bytes()).unwrap();
        assert_eq!(confirm.apps.len(), 1);
        assert_eq!(confirm.apps[0].uuid, Uuid::from_bytes([0x22; 16]));
        assert_eq!(confirm.apps[0].device_name, "kitchen");
    }

    #[test]
    fn test_alarm_notification_decoding() {
        let mut writer = ProtoWriter::new();
        writer.varint_field(1, 1);
        writer.varint_field(5, 3_222_278_145);
        writer.bytes_field(6, &[0x00, 0x20, 0x00, 0x00]);
        writer.varint_field(8, 1);

        let alarm = CnAlarmNotification::decode(&writer.into_bytes()).unwrap();
        assert_eq!(alarm.zone, 1);
        assert_eq!(alarm.sw_program_version, 3_222_278_145);
        assert_eq!(alarm.errors, vec![0x00, 0x20, 0x00, 0x00]);
        assert_eq!(alarm.node_id, 1);
    }
}
