//! High-level ComfoConnect API
//!
//! Wraps the session client with sensor subscriptions and typed commands for
//! the ventilation unit. Each command composes one or two RMI payloads from
//! the builders in [`crate::rmi`] and interprets the response bytes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use comfoconnect_core::util::version_decode;
use comfoconnect_core::{ComfoError, ComfoResult, PdoType, Value};
use comfoconnect_registry::consts::{
    SUBUNIT_01, SUBUNIT_02, SUBUNIT_03, SUBUNIT_05, SUBUNIT_06, SUBUNIT_07, SUBUNIT_08,
    UNIT_TEMPHUMCONTROL, UNIT_VENTILATIONCONFIG,
};
use comfoconnect_registry::errors::decode_errors;
use comfoconnect_registry::properties::{
    PROP_ID_VENT_HUMI_COMFORT, PROP_ID_VENT_HUMI_PROTECT, PROP_ID_VENT_TEMP_PASSIVE,
};
use comfoconnect_registry::{Property, Sensor};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::bridge::{Bridge, BridgeSettings};
use crate::pdo::{SensorCallback, SubscriptionManager};
use crate::rmi::{
    self, BypassMode, ComfoCoolMode, VentilationBalance, VentilationMode, VentilationSetting,
    VentilationSpeed, VentilationTemperatureProfile,
};

/// Node id of the ventilation unit itself.
pub const DEFAULT_NODE: u8 = 1;

/// How long sensor values are buffered after connect; the bridge pushes
/// stale samples right after a session opens.
pub const DEFAULT_SENSOR_DELAY: Duration = Duration::from_secs(2);

/// Alarm callback: `(node id, [(error bit, error text)])`.
pub type AlarmCallback = Arc<dyn Fn(u8, Vec<(u32, &'static str)>) + Send + Sync>;

/// Decoded gateway version information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeVersion {
    pub gateway_version: String,
    pub serial_number: String,
    pub comfonet_version: String,
}

/// High-level client for a ComfoConnect LAN C bridge
pub struct ComfoConnect {
    bridge: Bridge,
    subscriptions: SubscriptionManager,
    hold: Arc<Mutex<Option<HashMap<u16, Vec<u8>>>>>,
    hold_task: Mutex<Option<JoinHandle<()>>>,
    sensor_delay: Duration,
}

impl ComfoConnect {
    /// Create a client with default settings
    pub fn new(host: impl Into<String>, uuid: Uuid) -> Self {
        Self::with_settings(host, uuid, BridgeSettings::default(), DEFAULT_SENSOR_DELAY)
    }

    /// Create a client with explicit session settings and sensor delay
    pub fn with_settings(
        host: impl Into<String>,
        uuid: Uuid,
        settings: BridgeSettings,
        sensor_delay: Duration,
    ) -> Self {
        let bridge = Bridge::with_settings(host, uuid, settings);
        let subscriptions = SubscriptionManager::new();
        let hold: Arc<Mutex<Option<HashMap<u16, Vec<u8>>>>> = Arc::new(Mutex::new(None));

        {
            let subscriptions = subscriptions.clone();
            let hold = Arc::clone(&hold);
            bridge.set_sensor_handler(Arc::new(move |pdid, data| {
                let mut guard = hold.lock();
                match guard.as_mut() {
                    Some(cache) => {
                        cache.insert(pdid, data);
                    }
                    None => {
                        drop(guard);
                        subscriptions.dispatch(pdid, &data);
                    }
                }
            }));
        }

        Self {
            bridge,
            subscriptions,
            hold,
            hold_task: Mutex::new(None),
            sensor_delay,
        }
    }

    /// The underlying session client, for low-level commands.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Install a callback for decoded unit alarms.
    pub fn set_alarm_callback(&self, callback: AlarmCallback) {
        self.bridge.set_alarm_handler(Arc::new(move |node_id, alarm| {
            let errors = decode_errors(&alarm.errors, alarm.sw_program_version);
            callback(node_id, errors);
        }));
    }

    /// Connect to the bridge and re-register any known sensors.
    pub async fn connect(&self, local_uuid: Uuid, pin: Option<u32>) -> ComfoResult<()> {
        self.bridge.connect(local_uuid, pin).await?;

        if !self.sensor_delay.is_zero() {
            log::debug!(
                "Holding sensor values for {:?} after connect",
                self.sensor_delay
            );
            *self.hold.lock() = Some(HashMap::new());
            let hold = Arc::clone(&self.hold);
            let subscriptions = self.subscriptions.clone();
            let delay = self.sensor_delay;
            let task = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let cached = hold.lock().take();
                if let Some(cached) = cached {
                    log::debug!("Releasing {} held sensor value(s)", cached.len());
                    for (pdid, data) in cached {
                        subscriptions.dispatch(pdid, &data);
                    }
                }
            });
            if let Some(previous) = self.hold_task.lock().replace(task) {
                previous.abort();
            }
        }

        for sensor in self.subscriptions.sensors() {
            self.request_pdo(sensor, None).await?;
        }
        Ok(())
    }

    /// Disconnect from the bridge. Idempotent.
    pub async fn disconnect(&self) {
        if let Some(task) = self.hold_task.lock().take() {
            task.abort();
        }
        *self.hold.lock() = None;
        self.bridge.disconnect().await;
    }

    /// Subscribe a callback to a sensor.
    ///
    /// The bridge-side subscription is created for the first subscriber
    /// only; later subscribers share it.
    pub async fn register_sensor(
        &self,
        sensor: &'static Sensor,
        callback: SensorCallback,
    ) -> ComfoResult<()> {
        if self.subscriptions.add(sensor, callback) {
            if let Err(e) = self.request_pdo(sensor, None).await {
                self.subscriptions.remove(sensor.id);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Drop all subscribers of a sensor and cancel it on the bridge.
    /// Idempotent.
    pub async fn deregister_sensor(&self, sensor: &'static Sensor) -> ComfoResult<()> {
        if self.subscriptions.remove(sensor.id) {
            // Timeout 0 is the documented way to cancel a subscription.
            self.request_pdo(sensor, Some(0)).await?;
        }
        Ok(())
    }

    async fn request_pdo(&self, sensor: &Sensor, timeout: Option<u32>) -> ComfoResult<()> {
        self.bridge
            .cmd_rpdo_request(
                sensor.id,
                u32::from(sensor.pdo_type.to_u8()),
                sensor.zone,
                timeout,
            )
            .await
    }

    /// Read a property and decode it per its descriptor.
    pub async fn get_property(&self, property: &Property) -> ComfoResult<Value> {
        self.get_single_property(
            property.unit,
            property.subunit,
            property.property_id,
            property.pdo_type,
        )
        .await
    }

    /// Read a property from raw addressing.
    pub async fn get_single_property(
        &self,
        unit: u8,
        subunit: u8,
        property_id: u8,
        pdo_type: PdoType,
    ) -> ComfoResult<Value> {
        let reply = self
            .bridge
            .cmd_rmi_request(DEFAULT_NODE, rmi::property_read_raw(unit, subunit, property_id))
            .await?;
        Value::decode(&reply, pdo_type)
    }

    /// Read multiple properties; returns the raw response bytes.
    pub async fn get_multiple_properties(
        &self,
        unit: u8,
        subunit: u8,
        property_ids: &[u8],
    ) -> ComfoResult<Vec<u8>> {
        self.bridge
            .cmd_rmi_request(
                DEFAULT_NODE,
                rmi::property_read_multiple(unit, subunit, property_ids),
            )
            .await
    }

    /// Write a single-byte property.
    pub async fn set_property(
        &self,
        unit: u8,
        subunit: u8,
        property_id: u8,
        value: u8,
    ) -> ComfoResult<()> {
        self.bridge
            .cmd_rmi_request(
                DEFAULT_NODE,
                rmi::property_write(unit, subunit, property_id, &[value]),
            )
            .await?;
        Ok(())
    }

    /// Write a property, encoding the value per its descriptor.
    pub async fn set_property_typed(
        &self,
        property: &Property,
        value: &Value,
    ) -> ComfoResult<()> {
        self.bridge
            .cmd_rmi_request(DEFAULT_NODE, rmi::property_write_typed(property, value)?)
            .await?;
        Ok(())
    }

    /// Read gateway version information.
    pub async fn version(&self) -> ComfoResult<BridgeVersion> {
        let confirm = self.bridge.cmd_version_request().await?;
        Ok(BridgeVersion {
            gateway_version: version_decode(confirm.gateway_version),
            serial_number: confirm.serial_number,
            comfonet_version: version_decode(confirm.comfonet_version),
        })
    }

    /// Get the ventilation mode (auto / manual).
    pub async fn get_mode(&self) -> ComfoResult<VentilationMode> {
        let reply = self.schedule_read(SUBUNIT_08, 0x01).await?;
        Ok(if first_byte(&reply)? == 1 {
            VentilationMode::Manual
        } else {
            VentilationMode::Auto
        })
    }

    /// Set the ventilation mode (auto / manual).
    pub async fn set_mode(&self, mode: VentilationMode) -> ComfoResult<()> {
        match mode {
            VentilationMode::Auto => self.schedule_clear(SUBUNIT_08, 0x01).await,
            VentilationMode::Manual => self.schedule_set(SUBUNIT_08, 0x01, 1, 0x01).await,
        }
    }

    /// Get the ventilation speed (away / low / medium / high).
    pub async fn get_speed(&self) -> ComfoResult<VentilationSpeed> {
        let reply = self.schedule_read(SUBUNIT_01, 0x01).await?;
        let speed = last_byte(&reply)?;
        VentilationSpeed::from_u8(speed)
            .ok_or_else(|| ComfoError::Decode(format!("invalid speed {speed}")))
    }

    /// Set the ventilation speed (away / low / medium / high).
    pub async fn set_speed(&self, speed: VentilationSpeed) -> ComfoResult<()> {
        self.schedule_set(SUBUNIT_01, 0x01, 1, speed.to_u8()).await
    }

    /// Get the target airflow in m³/h for a speed preset.
    pub async fn get_flow_for_speed(&self, speed: VentilationSpeed) -> ComfoResult<i64> {
        let value = self
            .get_single_property(
                UNIT_VENTILATIONCONFIG,
                SUBUNIT_01,
                flow_property_id(speed),
                PdoType::Int16,
            )
            .await?;
        int_value(value)
    }

    /// Set the target airflow in m³/h for a speed preset.
    pub async fn set_flow_for_speed(
        &self,
        speed: VentilationSpeed,
        desired_flow: i16,
    ) -> ComfoResult<()> {
        let property = Property::new(
            UNIT_VENTILATIONCONFIG,
            SUBUNIT_01,
            flow_property_id(speed),
            PdoType::Int16,
        );
        self.set_property_typed(&property, &Value::Int(i64::from(desired_flow)))
            .await
    }

    /// Get the bypass mode (auto / open / closed).
    pub async fn get_bypass(&self) -> ComfoResult<BypassMode> {
        let reply = self.schedule_read(SUBUNIT_02, 0x01).await?;
        let mode = last_byte(&reply)?;
        BypassMode::from_u8(mode)
            .ok_or_else(|| ComfoError::Decode(format!("invalid bypass mode {mode}")))
    }

    /// Set the bypass mode (auto / open / closed) for `timeout_s` seconds;
    /// [`rmi::TIMEOUT_INDEFINITE`] keeps it until changed.
    pub async fn set_bypass(&self, mode: BypassMode, timeout_s: i32) -> ComfoResult<()> {
        match mode {
            BypassMode::Auto => self.schedule_clear(SUBUNIT_02, 0x01).await,
            BypassMode::Open => self.schedule_set(SUBUNIT_02, 0x01, timeout_s, 0x01).await,
            BypassMode::Closed => self.schedule_set(SUBUNIT_02, 0x01, timeout_s, 0x02).await,
        }
    }

    /// Get the fan balance mode (balance / supply only / exhaust only).
    pub async fn get_balance_mode(&self) -> ComfoResult<VentilationBalance> {
        let supply = self.schedule_read(SUBUNIT_06, 0x01).await?;
        let exhaust = self.schedule_read(SUBUNIT_07, 0x01).await?;
        VentilationBalance::from_subunits(first_byte(&supply)?, first_byte(&exhaust)?)
    }

    /// Set the fan balance mode for `timeout_s` seconds.
    pub async fn set_balance_mode(
        &self,
        mode: VentilationBalance,
        timeout_s: i32,
    ) -> ComfoResult<()> {
        match mode {
            VentilationBalance::Balance => {
                self.schedule_clear(SUBUNIT_06, 0x01).await?;
                self.schedule_clear(SUBUNIT_07, 0x01).await
            }
            VentilationBalance::SupplyOnly => {
                self.schedule_set(SUBUNIT_06, 0x01, timeout_s, 0x01).await?;
                self.schedule_clear(SUBUNIT_07, 0x01).await
            }
            VentilationBalance::ExhaustOnly => {
                self.schedule_clear(SUBUNIT_06, 0x01).await?;
                self.schedule_set(SUBUNIT_07, 0x01, timeout_s, 0x01).await
            }
        }
    }

    /// Whether boost mode is active.
    pub async fn get_boost(&self) -> ComfoResult<bool> {
        let reply = self.schedule_read(SUBUNIT_01, 0x06).await?;
        Ok(first_byte(&reply)? == 1)
    }

    /// Activate or stop boost mode; boost runs at high speed for `timeout_s`.
    pub async fn set_boost(&self, enabled: bool, timeout_s: i32) -> ComfoResult<()> {
        if enabled {
            self.schedule_set(SUBUNIT_01, 0x06, timeout_s, 0x03).await
        } else {
            self.schedule_clear(SUBUNIT_01, 0x06).await
        }
    }

    /// Whether away mode is active.
    pub async fn get_away(&self) -> ComfoResult<bool> {
        let reply = self.schedule_read(SUBUNIT_01, 0x0B).await?;
        Ok(first_byte(&reply)? == 1)
    }

    /// Activate or stop away mode for `timeout_s` seconds.
    pub async fn set_away(&self, enabled: bool, timeout_s: i32) -> ComfoResult<()> {
        if enabled {
            self.schedule_set(SUBUNIT_01, 0x0B, timeout_s, 0x00).await
        } else {
            self.schedule_clear(SUBUNIT_01, 0x0B).await
        }
    }

    /// Get the ComfoCool mode (auto / off).
    pub async fn get_comfocool_mode(&self) -> ComfoResult<ComfoCoolMode> {
        let reply = self.schedule_read(SUBUNIT_05, 0x01).await?;
        Ok(if first_byte(&reply)? == 0 {
            ComfoCoolMode::Auto
        } else {
            ComfoCoolMode::Off
        })
    }

    /// Set the ComfoCool mode (auto / off) for `timeout_s` seconds.
    pub async fn set_comfocool_mode(&self, mode: ComfoCoolMode, timeout_s: i32) -> ComfoResult<()> {
        match mode {
            ComfoCoolMode::Auto => self.schedule_clear(SUBUNIT_05, 0x01).await,
            ComfoCoolMode::Off => self.schedule_set(SUBUNIT_05, 0x01, timeout_s, 0x00).await,
        }
    }

    /// Get the temperature profile (warm / normal / cool).
    pub async fn get_temperature_profile(&self) -> ComfoResult<VentilationTemperatureProfile> {
        let reply = self.schedule_read(SUBUNIT_03, 0x01).await?;
        let profile = last_byte(&reply)?;
        VentilationTemperatureProfile::from_u8(profile)
            .ok_or_else(|| ComfoError::Decode(format!("invalid temperature profile {profile}")))
    }

    /// Set the temperature profile (warm / normal / cool) for `timeout_s`.
    pub async fn set_temperature_profile(
        &self,
        profile: VentilationTemperatureProfile,
        timeout_s: i32,
    ) -> ComfoResult<()> {
        self.schedule_set(SUBUNIT_03, 0x01, timeout_s, profile.to_u8())
            .await
    }

    /// Get the sensor-based ventilation mode for passive temperature.
    pub async fn get_sensor_ventmode_temperature_passive(
        &self,
    ) -> ComfoResult<VentilationSetting> {
        self.get_ventmode(PROP_ID_VENT_TEMP_PASSIVE).await
    }

    /// Configure the sensor-based ventilation mode for passive temperature.
    pub async fn set_sensor_ventmode_temperature_passive(
        &self,
        setting: VentilationSetting,
    ) -> ComfoResult<()> {
        self.set_ventmode(PROP_ID_VENT_TEMP_PASSIVE, setting).await
    }

    /// Get the sensor-based ventilation mode for humidity comfort.
    pub async fn get_sensor_ventmode_humidity_comfort(&self) -> ComfoResult<VentilationSetting> {
        self.get_ventmode(PROP_ID_VENT_HUMI_COMFORT).await
    }

    /// Configure the sensor-based ventilation mode for humidity comfort.
    pub async fn set_sensor_ventmode_humidity_comfort(
        &self,
        setting: VentilationSetting,
    ) -> ComfoResult<()> {
        self.set_ventmode(PROP_ID_VENT_HUMI_COMFORT, setting).await
    }

    /// Get the sensor-based ventilation mode for humidity protection.
    pub async fn get_sensor_ventmode_humidity_protection(
        &self,
    ) -> ComfoResult<VentilationSetting> {
        self.get_ventmode(PROP_ID_VENT_HUMI_PROTECT).await
    }

    /// Configure the sensor-based ventilation mode for humidity protection.
    pub async fn set_sensor_ventmode_humidity_protection(
        &self,
        setting: VentilationSetting,
    ) -> ComfoResult<()> {
        self.set_ventmode(PROP_ID_VENT_HUMI_PROTECT, setting).await
    }

    /// Dismiss the active errors on the unit.
    pub async fn clear_errors(&self) -> ComfoResult<()> {
        self.bridge
            .cmd_rmi_request(DEFAULT_NODE, rmi::clear_errors())
            .await?;
        Ok(())
    }

    async fn get_ventmode(&self, property_id: u8) -> ComfoResult<VentilationSetting> {
        let value = self
            .get_single_property(UNIT_TEMPHUMCONTROL, SUBUNIT_01, property_id, PdoType::UInt8)
            .await?;
        let raw = int_value(value)? as u8;
        VentilationSetting::from_u8(raw)
            .ok_or_else(|| ComfoError::Decode(format!("invalid ventilation setting {raw}")))
    }

    async fn set_ventmode(&self, property_id: u8, setting: VentilationSetting) -> ComfoResult<()> {
        self.set_property(UNIT_TEMPHUMCONTROL, SUBUNIT_01, property_id, setting.to_u8())
            .await
    }

    async fn schedule_read(&self, subunit: u8, slot: u8) -> ComfoResult<Vec<u8>> {
        self.bridge
            .cmd_rmi_request(DEFAULT_NODE, rmi::schedule_read(subunit, slot))
            .await
    }

    async fn schedule_set(&self, subunit: u8, slot: u8, timeout_s: i32, value: u8) -> ComfoResult<()> {
        self.bridge
            .cmd_rmi_request(DEFAULT_NODE, rmi::schedule_set(subunit, slot, timeout_s, value))
            .await?;
        Ok(())
    }

    async fn schedule_clear(&self, subunit: u8, slot: u8) -> ComfoResult<()> {
        self.bridge
            .cmd_rmi_request(DEFAULT_NODE, rmi::schedule_clear(subunit, slot))
            .await?;
        Ok(())
    }
}

fn flow_property_id(speed: VentilationSpeed) -> u8 {
    match speed {
        VentilationSpeed::Away => 3,
        VentilationSpeed::Low => 4,
        VentilationSpeed::Medium => 5,
        VentilationSpeed::High => 6,
    }
}

fn first_byte(reply: &[u8]) -> ComfoResult<u8> {
    reply
        .first()
        .copied()
        .ok_or_else(|| ComfoError::Decode("empty schedule response".to_string()))
}

fn last_byte(reply: &[u8]) -> ComfoResult<u8> {
    reply
        .last()
        .copied()
        .ok_or_else(|| ComfoError::Decode("empty schedule response".to_string()))
}

fn int_value(value: Value) -> ComfoResult<i64> {
    match value {
        Value::Int(v) => Ok(v),
        Value::UInt(v) => Ok(v as i64),
        Value::Bool(v) => Ok(i64::from(v)),
        other => Err(ComfoError::Decode(format!("expected an integer, got {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comfoconnect_proto::envelope::{Envelope, GatewayOperation};
    use comfoconnect_proto::messages::{
        CnRmiResponse, CnRpdoNotification, StartSessionConfirm,
    };
    use comfoconnect_proto::op::{GatewayResult, OperationType};
    use comfoconnect_proto::wire::ProtoReader;
    use comfoconnect_registry::sensors::{sensor, SENSOR_TEMPERATURE_SUPPLY};
    use comfoconnect_registry::SensorValue;
    use comfoconnect_session::{FrameReader, FrameWriter};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;

    fn app_uuid() -> Uuid {
        Uuid::from_bytes([0x11; 16])
    }

    fn bridge_uuid() -> Uuid {
        Uuid::from_bytes([0xBB; 16])
    }

    fn test_settings(port: u16) -> BridgeSettings {
        BridgeSettings {
            port,
            connect_timeout: Duration::from_secs(2),
            handshake_timeout: Duration::from_millis(500),
            request_timeout: Duration::from_secs(2),
            keepalive_interval: Duration::from_secs(60),
            close_timeout: Duration::from_millis(200),
        }
    }

    struct Peer {
        reader: FrameReader<tokio::net::tcp::OwnedReadHalf>,
        writer: FrameWriter<tokio::net::tcp::OwnedWriteHalf>,
        app: Uuid,
    }

    impl Peer {
        async fn accept(listener: &TcpListener) -> Self {
            let (stream, _) = listener.accept().await.unwrap();
            Self::new(stream)
        }

        fn new(stream: TcpStream) -> Self {
            let (read_half, write_half) = stream.into_split();
            Self {
                reader: FrameReader::new(read_half),
                writer: FrameWriter::new(write_half),
                app: Uuid::nil(),
            }
        }

        async fn recv(&mut self) -> Envelope {
            let frame = self.reader.read_frame().await.unwrap();
            Envelope::decode(&frame).unwrap()
        }

        async fn send(&mut self, op_type: OperationType, reference: Option<u32>, payload: Vec<u8>) {
            let envelope = Envelope::new(
                bridge_uuid(),
                self.app,
                GatewayOperation {
                    op_type,
                    result: GatewayResult::Ok,
                    result_description: None,
                    reference,
                },
                payload,
            );
            self.writer.write_frame(&envelope.encode()).await.unwrap();
        }

        async fn accept_session(&mut self) {
            let start = self.recv().await;
            assert_eq!(start.operation.op_type, OperationType::StartSessionRequest);
            self.app = start.src;
            self.send(
                OperationType::StartSessionConfirm,
                start.operation.reference,
                StartSessionConfirm::default().encode(),
            )
            .await;
        }

        /// Answer the next RMI request and return its payload bytes.
        async fn answer_rmi(&mut self, response: Vec<u8>) -> Vec<u8> {
            let request = self.recv().await;
            assert_eq!(request.operation.op_type, OperationType::CnRmiRequest);
            let mut message = Vec::new();
            let mut reader = ProtoReader::new(&request.payload);
            while let Some((field, value)) = reader.next_field().unwrap() {
                if field == 2 {
                    message = value.as_bytes().unwrap().to_vec();
                }
            }
            self.send(
                OperationType::CnRmiResponse,
                request.operation.reference,
                CnRmiResponse {
                    result: 0,
                    message: response,
                }
                .encode(),
            )
            .await;
            message
        }

        async fn drain(mut self) {
            while self.reader.read_frame().await.is_ok() {}
        }
    }

    async fn client(listener: &TcpListener) -> ComfoConnect {
        let port = listener.local_addr().unwrap().port();
        ComfoConnect::with_settings(
            "127.0.0.1",
            bridge_uuid(),
            test_settings(port),
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn test_set_speed_emits_the_documented_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = client(&listener).await;

        let server = tokio::spawn(async move {
            let mut peer = Peer::accept(&listener).await;
            peer.accept_session().await;
            let message = peer.answer_rmi(Vec::new()).await;
            assert_eq!(
                message,
                vec![0x84, 0x15, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01]
            );
            peer.drain().await;
        });

        client.connect(app_uuid(), Some(0)).await.unwrap();
        client.set_speed(VentilationSpeed::Low).await.unwrap();
        client.disconnect().await;
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_get_speed_parses_the_schedule_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = client(&listener).await;

        let server = tokio::spawn(async move {
            let mut peer = Peer::accept(&listener).await;
            peer.accept_session().await;
            let reply = vec![
                0x01, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
                0x02,
            ];
            let message = peer.answer_rmi(reply).await;
            assert_eq!(message, vec![0x83, 0x15, 0x01, 0x01]);
            peer.drain().await;
        });

        client.connect(app_uuid(), None).await.unwrap();
        assert_eq!(client.get_speed().await.unwrap(), VentilationSpeed::Medium);
        client.disconnect().await;
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_get_balance_mode_reads_both_subunits() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = client(&listener).await;

        let server = tokio::spawn(async move {
            let mut peer = Peer::accept(&listener).await;
            peer.accept_session().await;
            // Supply subunit overridden, exhaust not: supply only.
            let supply = peer.answer_rmi(vec![0x01, 0x00, 0x00]).await;
            assert_eq!(supply, vec![0x83, 0x15, 0x06, 0x01]);
            let exhaust = peer.answer_rmi(vec![0x00, 0x00, 0x00]).await;
            assert_eq!(exhaust, vec![0x83, 0x15, 0x07, 0x01]);
            peer.drain().await;
        });

        client.connect(app_uuid(), None).await.unwrap();
        assert_eq!(
            client.get_balance_mode().await.unwrap(),
            VentilationBalance::SupplyOnly
        );
        client.disconnect().await;
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_sensor_subscription_and_delivery() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = client(&listener).await;

        let server = tokio::spawn(async move {
            let mut peer = Peer::accept(&listener).await;
            peer.accept_session().await;

            let subscribe = peer.recv().await;
            assert_eq!(subscribe.operation.op_type, OperationType::CnRpdoRequest);
            let mut fields = HashMap::new();
            let mut reader = ProtoReader::new(&subscribe.payload);
            while let Some((field, value)) = reader.next_field().unwrap() {
                fields.insert(field, value.as_u64().unwrap());
            }
            assert_eq!(fields.get(&1), Some(&276));
            assert_eq!(fields.get(&2), Some(&1));
            assert_eq!(fields.get(&3), Some(&6));
            assert_eq!(fields.get(&4), None);
            peer.send(
                OperationType::CnRpdoConfirm,
                subscribe.operation.reference,
                Vec::new(),
            )
            .await;

            peer.send(
                OperationType::CnRpdoNotification,
                None,
                CnRpdoNotification {
                    pdid: 276,
                    data: vec![0x60, 0x09],
                    zone: 1,
                }
                .encode(),
            )
            .await;

            // Expect the cancellation on deregister.
            let cancel = peer.recv().await;
            assert_eq!(cancel.operation.op_type, OperationType::CnRpdoRequest);
            let mut fields = HashMap::new();
            let mut reader = ProtoReader::new(&cancel.payload);
            while let Some((field, value)) = reader.next_field().unwrap() {
                fields.insert(field, value.as_u64().unwrap());
            }
            assert_eq!(fields.get(&4), Some(&0));
            peer.send(
                OperationType::CnRpdoConfirm,
                cancel.operation.reference,
                Vec::new(),
            )
            .await;
            peer.drain().await;
        });

        client.connect(app_uuid(), None).await.unwrap();

        let supply = sensor(SENSOR_TEMPERATURE_SUPPLY).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        client
            .register_sensor(
                supply,
                Arc::new(move |sensor, value| {
                    let _ = tx.send((sensor.id, value));
                }),
            )
            .await
            .unwrap();

        let (id, value) = rx.recv().await.unwrap();
        assert_eq!(id, 276);
        assert_eq!(value, SensorValue::Number(240.0));

        client.deregister_sensor(supply).await.unwrap();
        client.disconnect().await;
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_sensor_hold_buffers_and_flushes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let client = ComfoConnect::with_settings(
            "127.0.0.1",
            bridge_uuid(),
            test_settings(port),
            Duration::from_millis(500),
        );

        let server = tokio::spawn(async move {
            let mut peer = Peer::accept(&listener).await;
            peer.accept_session().await;

            let subscribe = peer.recv().await;
            peer.send(
                OperationType::CnRpdoConfirm,
                subscribe.operation.reference,
                Vec::new(),
            )
            .await;

            // Two samples in quick succession: only the latest survives the hold.
            for sample in [[0x00u8, 0x09], [0x60, 0x09]] {
                peer.send(
                    OperationType::CnRpdoNotification,
                    None,
                    CnRpdoNotification {
                        pdid: 276,
                        data: sample.to_vec(),
                        zone: 1,
                    }
                    .encode(),
                )
                .await;
            }
            peer.drain().await;
        });

        client.connect(app_uuid(), None).await.unwrap();

        let supply = sensor(SENSOR_TEMPERATURE_SUPPLY).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        client
            .register_sensor(
                supply,
                Arc::new(move |_, value| {
                    let _ = tx.send(value);
                }),
            )
            .await
            .unwrap();

        // Nothing before the hold expires.
        assert!(
            tokio::time::timeout(Duration::from_millis(100), rx.recv())
                .await
                .is_err()
        );
        let value = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(value, SensorValue::Number(240.0));

        client.disconnect().await;
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_reconnect_reregisters_sensors() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = client(&listener).await;

        let server = tokio::spawn(async move {
            // First session: subscription, then connection loss.
            let mut peer = Peer::accept(&listener).await;
            peer.accept_session().await;
            let subscribe = peer.recv().await;
            assert_eq!(subscribe.operation.op_type, OperationType::CnRpdoRequest);
            peer.send(
                OperationType::CnRpdoConfirm,
                subscribe.operation.reference,
                Vec::new(),
            )
            .await;
            drop(peer);

            // Second session: the subscription is re-issued during connect.
            let mut peer = Peer::accept(&listener).await;
            peer.accept_session().await;
            let resubscribe = peer.recv().await;
            assert_eq!(resubscribe.operation.op_type, OperationType::CnRpdoRequest);
            peer.send(
                OperationType::CnRpdoConfirm,
                resubscribe.operation.reference,
                Vec::new(),
            )
            .await;
            peer.drain().await;
        });

        client.connect(app_uuid(), None).await.unwrap();
        let supply = sensor(SENSOR_TEMPERATURE_SUPPLY).unwrap();
        client
            .register_sensor(supply, Arc::new(|_, _| {}))
            .await
            .unwrap();

        // Wait for the session to drop, then reconnect.
        for _ in 0..100 {
            if !client.bridge().is_connected() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        client.connect(app_uuid(), None).await.unwrap();
        client.disconnect().await;
        server.await.unwrap();
    }
}
