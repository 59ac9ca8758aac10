//! Client for the Zehnder ComfoConnect LAN C bridge
//!
//! The bridge fronts a ComfoAir Q ventilation unit with a protobuf-framed
//! TCP protocol on port 56747. This crate provides:
//!
//! - [`discovery`]: UDP broadcast discovery of bridges on the local network
//! - [`bridge::Bridge`]: the session client with the connect/register
//!   handshake, request multiplexing by reference, notification routing
//!   and keepalive
//! - [`rmi`]: builders for the remote management interface byte payloads
//! - [`pdo`]: fan-out of process-data notifications to sensor subscribers
//! - [`comfoconnect::ComfoConnect`]: the high-level API most applications use

pub mod bridge;
pub mod comfoconnect;
pub mod discovery;
pub mod pdo;
pub mod rmi;

pub use bridge::{Bridge, BridgeSettings, SessionState, PORT};
pub use comfoconnect::ComfoConnect;
pub use discovery::{discover_bridge, discover_bridges};
pub use rmi::{
    BypassMode, ComfoCoolMode, VentilationBalance, VentilationMode, VentilationSetting,
    VentilationSpeed, VentilationTemperatureProfile,
};
