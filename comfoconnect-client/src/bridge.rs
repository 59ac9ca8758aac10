//! Bridge session client
//!
//! A session multiplexes three traffic classes over one TCP connection:
//! request/confirm pairs correlated by a monotonically increasing reference,
//! unsolicited notifications (process data, alarms), and periodic keepalives.
//! One reader task routes everything that arrives; writers serialize through
//! the shared frame writer.
//!
//! State machine:
//!
//! ```text
//! Disconnected -> Connecting -> AwaitingStart -> SessionOpen -> Closing -> Disconnected
//!                                   |    ^
//!                                   v    | (register ok)
//!                                 Registering
//! ```
//!
//! Only `SessionOpen` permits RMI and RPDO operations. Every handshake
//! request runs under a wall-clock deadline so a bridge that silently drops
//! a registration can never hang the caller.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use comfoconnect_core::{ComfoError, ComfoResult};
use comfoconnect_proto::envelope::{Envelope, GatewayOperation};
use comfoconnect_proto::messages::{
    ChangePinRequest, CnAlarmNotification, CnRmiRequest, CnRmiResponse, CnRpdoNotification,
    CnRpdoRequest, CnTimeConfirm, CnTimeRequest, DeregisterAppRequest, ListRegisteredAppsConfirm,
    RegisterAppRequest, StartSessionConfirm, StartSessionRequest, VersionConfirm,
};
use comfoconnect_proto::op::{GatewayResult, OperationType};
use comfoconnect_session::{FrameReader, FrameWriter};
use comfoconnect_transport::tcp::{self, TcpSettings};
use parking_lot::Mutex;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// TCP and UDP port of the bridge.
pub const PORT: u16 = 56747;

/// Device name reported when registering with the bridge.
pub const DEVICE_NAME: &str = "comfoconnect-rs";

/// Handler for incoming process-data samples: `(pdo id, raw sample bytes)`.
pub type SensorHandler = Arc<dyn Fn(u16, Vec<u8>) + Send + Sync>;

/// Handler for incoming alarms: `(node id, alarm)`.
pub type AlarmHandler = Arc<dyn Fn(u8, CnAlarmNotification) + Send + Sync>;

/// Session client settings
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    /// Port the bridge listens on
    pub port: u16,
    /// Deadline for establishing the TCP connection
    pub connect_timeout: Duration,
    /// Per-request deadline during the start-session/registration handshake
    pub handshake_timeout: Duration,
    /// Per-request deadline once the session is open
    pub request_timeout: Duration,
    /// Interval between keepalive messages
    pub keepalive_interval: Duration,
    /// How long to wait for the close-session confirm on disconnect
    pub close_timeout: Duration,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            port: PORT,
            connect_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            keepalive_interval: Duration::from_secs(60),
            close_timeout: Duration::from_secs(2),
        }
    }
}

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    AwaitingStart,
    Registering,
    SessionOpen,
    Closing,
}

struct PendingSlot {
    expected: OperationType,
    tx: oneshot::Sender<ComfoResult<Envelope>>,
}

#[derive(Default)]
struct Tasks {
    read: Option<JoinHandle<()>>,
    keepalive: Option<JoinHandle<()>>,
}

struct Shared {
    settings: BridgeSettings,
    bridge_uuid: Uuid,
    state: Mutex<SessionState>,
    reference: AtomicU32,
    pending: Mutex<HashMap<u32, PendingSlot>>,
    writer: AsyncMutex<Option<FrameWriter<OwnedWriteHalf>>>,
    local_uuid: Mutex<Option<Uuid>>,
    sensor_handler: Mutex<Option<SensorHandler>>,
    alarm_handler: Mutex<Option<AlarmHandler>>,
    tasks: Mutex<Tasks>,
}

/// A ComfoConnect LAN C bridge and, once connected, the session to it
pub struct Bridge {
    host: String,
    version: Option<u32>,
    shared: Arc<Shared>,
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("host", &self.host)
            .field("uuid", &self.shared.bridge_uuid)
            .field("state", &self.state())
            .finish()
    }
}

impl Bridge {
    /// Create a bridge handle with default settings
    pub fn new(host: impl Into<String>, uuid: Uuid) -> Self {
        Self::with_settings(host, uuid, BridgeSettings::default())
    }

    /// Create a bridge handle with explicit settings
    pub fn with_settings(host: impl Into<String>, uuid: Uuid, settings: BridgeSettings) -> Self {
        Self {
            host: host.into(),
            version: None,
            shared: Arc::new(Shared {
                settings,
                bridge_uuid: uuid,
                state: Mutex::new(SessionState::Disconnected),
                reference: AtomicU32::new(1),
                pending: Mutex::new(HashMap::new()),
                writer: AsyncMutex::new(None),
                local_uuid: Mutex::new(None),
                sensor_handler: Mutex::new(None),
                alarm_handler: Mutex::new(None),
                tasks: Mutex::new(Tasks::default()),
            }),
        }
    }

    /// Create a bridge handle from a discovery reply
    pub fn discovered(host: impl Into<String>, uuid: Uuid, version: u32) -> Self {
        let mut bridge = Self::new(host, uuid);
        bridge.version = Some(version);
        bridge
    }

    /// Host address of the bridge
    pub fn host(&self) -> &str {
        &self.host
    }

    /// UUID of the bridge
    pub fn uuid(&self) -> Uuid {
        self.shared.bridge_uuid
    }

    /// Discovery protocol version, if the bridge was discovered
    pub fn version(&self) -> Option<u32> {
        self.version
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        *self.shared.state.lock()
    }

    /// Whether a transport to the bridge is up (session may not be open yet)
    pub fn is_connected(&self) -> bool {
        matches!(
            self.state(),
            SessionState::AwaitingStart | SessionState::Registering | SessionState::SessionOpen
        )
    }

    /// Install the handler for process-data notifications.
    pub fn set_sensor_handler(&self, handler: SensorHandler) {
        *self.shared.sensor_handler.lock() = Some(handler);
    }

    /// Install the handler for alarm notifications.
    pub fn set_alarm_handler(&self, handler: AlarmHandler) {
        *self.shared.alarm_handler.lock() = Some(handler);
    }

    /// Connect to the bridge and bring the session to `SessionOpen`.
    ///
    /// When the bridge answers the start-session request with `NotAllowed`
    /// the app is unknown to it: with a pin the app is registered and the
    /// session start retried, without one the connect fails `NotRegistered`.
    pub async fn connect(&self, local_uuid: Uuid, pin: Option<u32>) -> ComfoResult<()> {
        {
            let mut state = self.shared.state.lock();
            if *state != SessionState::Disconnected {
                return Err(ComfoError::AlreadyConnected);
            }
            *state = SessionState::Connecting;
        }
        match self.handshake(local_uuid, pin).await {
            Ok(()) => Ok(()),
            Err(e) => {
                Self::teardown(&self.shared).await;
                Err(e)
            }
        }
    }

    async fn handshake(&self, local_uuid: Uuid, pin: Option<u32>) -> ComfoResult<()> {
        log::debug!("Connecting to bridge {}", self.host);
        let settings = TcpSettings::with_timeout(
            self.host.clone(),
            self.shared.settings.port,
            self.shared.settings.connect_timeout,
        );
        let stream = tcp::connect(&settings).await?;
        let (read_half, write_half) = stream.into_split();

        self.shared.reference.store(1, Ordering::Relaxed);
        *self.shared.local_uuid.lock() = Some(local_uuid);
        *self.shared.writer.lock().await = Some(FrameWriter::new(write_half));
        let read_task = tokio::spawn(Self::read_loop(
            Arc::clone(&self.shared),
            FrameReader::new(read_half),
        ));
        self.shared.tasks.lock().read = Some(read_task);
        self.set_state(SessionState::AwaitingStart);

        match self.cmd_start_session(true).await {
            Ok(_) => {}
            Err(ComfoError::NotAllowed) => {
                let Some(pin) = pin else {
                    log::warn!("Bridge {} does not know us and no pin was given", self.host);
                    return Err(ComfoError::NotRegistered);
                };
                self.set_state(SessionState::Registering);
                log::info!("Registering app with bridge {}", self.host);
                match self.cmd_register_app(local_uuid, DEVICE_NAME, pin).await {
                    Ok(()) => {}
                    Err(ComfoError::NotAllowed) => return Err(ComfoError::BadPin),
                    Err(e) => return Err(e),
                }
                self.set_state(SessionState::AwaitingStart);
                self.cmd_start_session(true).await?;
            }
            Err(e) => return Err(e),
        }

        self.set_state(SessionState::SessionOpen);
        self.spawn_keepalive();
        log::debug!("Session open on bridge {}", self.host);
        Ok(())
    }

    /// Close the session and release the transport. Idempotent.
    ///
    /// Tells the bridge the session is closing and waits a short, bounded
    /// time for the confirm; the transport is closed unconditionally and
    /// every pending request resolves with `SessionClosed` before return.
    pub async fn disconnect(&self) {
        {
            let mut state = self.shared.state.lock();
            if *state == SessionState::Disconnected {
                return;
            }
            *state = SessionState::Closing;
        }

        let reference = self.next_reference();
        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().insert(
            reference,
            PendingSlot {
                expected: OperationType::CloseSessionConfirm,
                tx,
            },
        );
        match Self::send_on(
            &self.shared,
            OperationType::CloseSessionRequest,
            Some(reference),
            Vec::new(),
        )
        .await
        {
            Ok(()) => {
                let _ = tokio::time::timeout(self.shared.settings.close_timeout, rx).await;
            }
            Err(e) => log::debug!("Close session request not sent: {e}"),
        }
        self.shared
            .pending
            .lock()
            .remove(&reference);

        Self::teardown(&self.shared).await;
        log::debug!("Disconnected from bridge {}", self.host);
    }

    /// Start the session, optionally taking it over from another client.
    pub async fn cmd_start_session(&self, take_over: bool) -> ComfoResult<StartSessionConfirm> {
        self.ensure_connected()?;
        let envelope = self
            .request(
                OperationType::StartSessionRequest,
                StartSessionRequest { take_over }.encode(),
                self.shared.settings.handshake_timeout,
            )
            .await?;
        StartSessionConfirm::decode(&envelope.payload)
    }

    /// Ask the bridge to close the session (fire and forget).
    pub async fn cmd_close_session(&self) -> ComfoResult<()> {
        self.ensure_connected()?;
        let reference = self.next_reference();
        Self::send_on(
            &self.shared,
            OperationType::CloseSessionRequest,
            Some(reference),
            Vec::new(),
        )
        .await
    }

    /// Register an app on the bridge.
    pub async fn cmd_register_app(
        &self,
        uuid: Uuid,
        device_name: &str,
        pin: u32,
    ) -> ComfoResult<()> {
        self.ensure_connected()?;
        let request = RegisterAppRequest {
            uuid,
            pin,
            device_name: device_name.to_string(),
        };
        self.request(
            OperationType::RegisterAppRequest,
            request.encode(),
            self.shared.settings.handshake_timeout,
        )
        .await?;
        Ok(())
    }

    /// Remove an app from the bridge's registration list.
    pub async fn cmd_deregister_app(&self, uuid: Uuid) -> ComfoResult<()> {
        self.ensure_session_open()?;
        if *self.shared.local_uuid.lock() == Some(uuid) {
            log::warn!("Refusing to deregister our own uuid");
            return Err(ComfoError::NotAllowed);
        }
        self.request(
            OperationType::DeregisterAppRequest,
            DeregisterAppRequest { uuid }.encode(),
            self.shared.settings.request_timeout,
        )
        .await?;
        Ok(())
    }

    /// List the apps registered on the bridge.
    pub async fn cmd_list_registered_apps(&self) -> ComfoResult<ListRegisteredAppsConfirm> {
        self.ensure_session_open()?;
        let envelope = self
            .request(
                OperationType::ListRegisteredAppsRequest,
                Vec::new(),
                self.shared.settings.request_timeout,
            )
            .await?;
        ListRegisteredAppsConfirm::decode(&envelope.payload)
    }

    /// Change the registration pin.
    pub async fn cmd_change_pin(&self, old_pin: u32, new_pin: u32) -> ComfoResult<()> {
        self.ensure_session_open()?;
        self.request(
            OperationType::ChangePinRequest,
            ChangePinRequest { old_pin, new_pin }.encode(),
            self.shared.settings.request_timeout,
        )
        .await?;
        Ok(())
    }

    /// Read gateway and ComfoNet version information.
    pub async fn cmd_version_request(&self) -> ComfoResult<VersionConfirm> {
        self.ensure_session_open()?;
        let envelope = self
            .request(
                OperationType::VersionRequest,
                Vec::new(),
                self.shared.settings.request_timeout,
            )
            .await?;
        VersionConfirm::decode(&envelope.payload)
    }

    /// Read the current time of the unit (seconds since 2000-01-01 UTC).
    pub async fn cmd_time_request(&self) -> ComfoResult<CnTimeConfirm> {
        self.ensure_session_open()?;
        let envelope = self
            .request(
                OperationType::CnTimeRequest,
                CnTimeRequest::default().encode(),
                self.shared.settings.request_timeout,
            )
            .await?;
        CnTimeConfirm::decode(&envelope.payload)
    }

    /// Send an RMI request to a node and return the response payload.
    ///
    /// A non-zero RMI result surfaces as `Rmi(status)`; the session stays
    /// healthy.
    pub async fn cmd_rmi_request(&self, node_id: u8, message: Vec<u8>) -> ComfoResult<Vec<u8>> {
        self.ensure_session_open()?;
        let request = CnRmiRequest { node_id, message };
        let envelope = self
            .request(
                OperationType::CnRmiRequest,
                request.encode(),
                self.shared.settings.request_timeout,
            )
            .await?;
        let response = CnRmiResponse::decode(&envelope.payload)?;
        if response.result != 0 {
            return Err(ComfoError::Rmi(response.result as u8));
        }
        Ok(response.message)
    }

    /// Send an asynchronous RMI request to a node.
    ///
    /// The bridge acknowledges with a confirm and delivers the result later
    /// as an async response carrying the same reference; this call suspends
    /// until the response arrives.
    pub async fn cmd_rmi_async_request(
        &self,
        node_id: u8,
        message: Vec<u8>,
    ) -> ComfoResult<Vec<u8>> {
        self.ensure_session_open()?;
        let request = CnRmiRequest { node_id, message };
        let envelope = self
            .request(
                OperationType::CnRmiAsyncRequest,
                request.encode(),
                self.shared.settings.request_timeout,
            )
            .await?;
        let response = CnRmiResponse::decode(&envelope.payload)?;
        if response.result != 0 {
            return Err(ComfoError::Rmi(response.result as u8));
        }
        Ok(response.message)
    }

    /// Request process-data notifications for a PDO.
    ///
    /// `timeout` of 0 cancels an active subscription; `None` subscribes
    /// until the session ends.
    pub async fn cmd_rpdo_request(
        &self,
        pdid: u16,
        pdo_type: u32,
        zone: u8,
        timeout: Option<u32>,
    ) -> ComfoResult<()> {
        self.ensure_session_open()?;
        let request = CnRpdoRequest {
            pdid,
            zone,
            pdo_type,
            timeout,
        };
        self.request(
            OperationType::CnRpdoRequest,
            request.encode(),
            self.shared.settings.request_timeout,
        )
        .await?;
        Ok(())
    }

    /// Send a keepalive (fire and forget, no reply expected).
    pub async fn cmd_keepalive(&self) -> ComfoResult<()> {
        self.ensure_connected()?;
        let reference = self.next_reference();
        Self::send_on(
            &self.shared,
            OperationType::KeepAlive,
            Some(reference),
            Vec::new(),
        )
        .await
    }

    fn set_state(&self, state: SessionState) {
        *self.shared.state.lock() = state;
    }

    fn ensure_connected(&self) -> ComfoResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ComfoError::NotOpen)
        }
    }

    fn ensure_session_open(&self) -> ComfoResult<()> {
        if self.state() == SessionState::SessionOpen {
            Ok(())
        } else {
            Err(ComfoError::NotOpen)
        }
    }

    fn next_reference(&self) -> u32 {
        self.shared.reference.fetch_add(1, Ordering::Relaxed)
    }

    /// Send a request and suspend until its reply resolves the slot.
    async fn request(
        &self,
        op_type: OperationType,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> ComfoResult<Envelope> {
        let expected = op_type.expected_confirm().ok_or_else(|| {
            ComfoError::ProtocolViolation(format!("operation {op_type:?} has no reply"))
        })?;
        let reference = self.next_reference();
        let (tx, rx) = oneshot::channel();
        self.shared
            .pending
            .lock()
            .insert(reference, PendingSlot { expected, tx });

        if let Err(e) = Self::send_on(&self.shared, op_type, Some(reference), payload).await {
            self.shared
                .pending
                .lock()
                .remove(&reference);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(ComfoError::SessionClosed),
            Err(_) => {
                self.shared
                    .pending
                    .lock()
                    .remove(&reference);
                log::warn!(
                    "Timeout waiting for {expected:?} (reference {reference}) from bridge {}",
                    self.host
                );
                Err(ComfoError::Timeout)
            }
        }
    }

    async fn send_on(
        shared: &Arc<Shared>,
        op_type: OperationType,
        reference: Option<u32>,
        payload: Vec<u8>,
    ) -> ComfoResult<()> {
        let src = self::local_uuid(shared)?;
        let operation = GatewayOperation {
            op_type,
            result: GatewayResult::Ok,
            result_description: None,
            reference,
        };
        let envelope = Envelope::new(src, shared.bridge_uuid, operation, payload);
        log::debug!("TX {:?} reference={:?}", op_type, reference);

        let mut writer_guard = shared.writer.lock().await;
        let writer = writer_guard.as_mut().ok_or(ComfoError::NotOpen)?;
        writer.write_frame(&envelope.encode()).await
    }

    fn spawn_keepalive(&self) {
        let shared = Arc::clone(&self.shared);
        let interval = self.shared.settings.keepalive_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if *shared.state.lock() != SessionState::SessionOpen {
                    break;
                }
                let reference = shared.reference.fetch_add(1, Ordering::Relaxed);
                if let Err(e) =
                    Self::send_on(&shared, OperationType::KeepAlive, Some(reference), Vec::new())
                        .await
                {
                    log::warn!("Keepalive failed, tearing the session down: {e}");
                    // Take our own handle out first so teardown does not
                    // abort the task that is running it.
                    shared.tasks.lock().keepalive.take();
                    Self::teardown(&shared).await;
                    break;
                }
            }
        });
        self.shared.tasks.lock().keepalive = Some(handle);
    }

    async fn read_loop(shared: Arc<Shared>, mut reader: FrameReader<OwnedReadHalf>) {
        loop {
            match reader.read_frame().await {
                Ok(frame) => match Envelope::decode(&frame) {
                    Ok(envelope) => {
                        if !Self::route(&shared, envelope) {
                            break;
                        }
                    }
                    Err(e) => log::error!("Failed to decode message from bridge: {e}"),
                },
                Err(ComfoError::PeerClosed) => {
                    log::info!("The bridge closed the connection");
                    break;
                }
                Err(e) => {
                    log::warn!("Transport read failed: {e}");
                    break;
                }
            }
        }
        // See spawn_keepalive: never let teardown abort its own task.
        shared.tasks.lock().read.take();
        Self::teardown(&shared).await;
    }

    /// Route one incoming envelope; returns false when the session must end.
    fn route(shared: &Arc<Shared>, envelope: Envelope) -> bool {
        let operation = &envelope.operation;
        log::debug!(
            "RX {:?} reference={:?} result={:?}",
            operation.op_type,
            operation.reference,
            operation.result
        );
        match operation.op_type {
            OperationType::CnRpdoNotification => {
                match CnRpdoNotification::decode(&envelope.payload) {
                    Ok(notification) => {
                        let handler = shared
                            .sensor_handler
                            .lock()
                            .clone();
                        match handler {
                            Some(handler) => handler(notification.pdid, notification.data),
                            None => log::info!(
                                "Dropping RPDO notification for {}: no handler registered",
                                notification.pdid
                            ),
                        }
                    }
                    Err(e) => log::error!("Failed to decode RPDO notification: {e}"),
                }
                true
            }
            OperationType::CnAlarmNotification => {
                match CnAlarmNotification::decode(&envelope.payload) {
                    Ok(alarm) => {
                        let handler = shared.alarm_handler.lock().clone();
                        match handler {
                            Some(handler) => handler(alarm.node_id, alarm),
                            None => log::info!("Dropping alarm: no handler registered"),
                        }
                    }
                    Err(e) => log::error!("Failed to decode alarm notification: {e}"),
                }
                true
            }
            OperationType::GatewayNotification | OperationType::CnNodeNotification => {
                log::debug!("Ignoring {:?}", operation.op_type);
                true
            }
            OperationType::CloseSessionRequest => {
                log::info!("The bridge asked us to close the session");
                false
            }
            OperationType::KeepAlive => true,
            _ => {
                match operation.reference.filter(|reference| *reference != 0) {
                    Some(reference) => Self::resolve(shared, reference, envelope),
                    None => log::warn!("Unhandled message type {:?}", operation.op_type),
                }
                true
            }
        }
    }

    /// Resolve the pending slot a correlated reply belongs to.
    fn resolve(shared: &Arc<Shared>, reference: u32, envelope: Envelope) {
        let slot = {
            let mut pending = shared.pending.lock();
            let Some(slot) = pending.remove(&reference) else {
                log::debug!("Discarding reply with unknown reference {reference}");
                return;
            };
            // An async RMI confirm only acknowledges the request; keep the
            // slot armed for the async response carrying the same reference.
            if slot.expected == OperationType::CnRmiAsyncConfirm
                && envelope.operation.op_type == OperationType::CnRmiAsyncConfirm
                && envelope.operation.result == GatewayResult::Ok
            {
                pending.insert(
                    reference,
                    PendingSlot {
                        expected: OperationType::CnRmiAsyncResponse,
                        tx: slot.tx,
                    },
                );
                return;
            }
            slot
        };

        let result = envelope.operation.result;
        let outcome = if result == GatewayResult::Ok {
            if envelope.operation.op_type == slot.expected {
                Ok(envelope)
            } else {
                Err(ComfoError::ProtocolViolation(format!(
                    "expected {:?} for reference {reference}, got {:?}",
                    slot.expected, envelope.operation.op_type
                )))
            }
        } else if slot.expected == OperationType::CnRpdoConfirm {
            Err(ComfoError::Refused(result.to_u32() as u8))
        } else if result == GatewayResult::RmiError {
            let status = CnRmiResponse::decode(&envelope.payload)
                .map(|response| response.result as u8)
                .unwrap_or(0);
            Err(ComfoError::Rmi(status))
        } else {
            match result.as_error() {
                Some(error) => Err(error),
                None => Ok(envelope),
            }
        };

        if slot.tx.send(outcome).is_err() {
            log::debug!("Discarding reply {reference} for a cancelled request");
        }
    }

    /// Tear the session down: stop the tasks, resolve every pending slot
    /// with `SessionClosed`, then release the transport.
    async fn teardown(shared: &Arc<Shared>) {
        *shared.state.lock() = SessionState::Disconnected;

        let (read, keepalive) = {
            let mut tasks = shared.tasks.lock();
            (tasks.read.take(), tasks.keepalive.take())
        };
        // Await the aborted tasks so no notification callback can fire after
        // teardown returns. A task tearing itself down has already taken its
        // own handle out.
        if let Some(handle) = read {
            handle.abort();
            let _ = handle.await;
        }
        if let Some(handle) = keepalive {
            handle.abort();
            let _ = handle.await;
        }

        let slots: Vec<PendingSlot> = shared
            .pending
            .lock()
            .drain()
            .map(|(_, slot)| slot)
            .collect();
        for slot in slots {
            let _ = slot.tx.send(Err(ComfoError::SessionClosed));
        }

        if let Some(mut writer) = shared.writer.lock().await.take() {
            writer.shutdown().await;
        }
        *shared.local_uuid.lock() = None;
    }
}

fn local_uuid(shared: &Shared) -> ComfoResult<Uuid> {
    (*shared.local_uuid.lock()).ok_or(ComfoError::NotOpen)
}
