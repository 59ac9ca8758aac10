//! comfoconnect - Rust client for the Zehnder ComfoConnect LAN C bridge
//!
//! The ComfoConnect LAN C is the network appliance fronting ComfoAir Q
//! residential heat-recovery ventilation units. This library speaks its
//! protobuf-framed TCP protocol: discovery, the registration and session
//! handshake, RMI property and action requests, and asynchronous sensor
//! notifications.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `comfoconnect-core`: error taxonomy, typed values, utilities
//! - `comfoconnect-proto`: protobuf wire codec and message definitions
//! - `comfoconnect-transport`: TCP connector and discovery sockets
//! - `comfoconnect-session`: length-prefixed framing
//! - `comfoconnect-registry`: static sensor/property/error tables
//! - `comfoconnect-client`: session client, RMI layer, subscriptions
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use comfoconnect::{discover_bridges, ComfoConnect, VentilationSpeed};
//! use comfoconnect::registry::sensors::{sensor, SENSOR_TEMPERATURE_SUPPLY};
//!
//! # async fn run() -> comfoconnect::ComfoResult<()> {
//! let bridges = discover_bridges(Duration::from_secs(5)).await?;
//! let bridge = &bridges[0];
//!
//! let client = ComfoConnect::new(bridge.host(), bridge.uuid());
//! client.connect(uuid::Uuid::new_v4(), Some(1234)).await?;
//!
//! client.set_speed(VentilationSpeed::Low).await?;
//! client
//!     .register_sensor(
//!         sensor(SENSOR_TEMPERATURE_SUPPLY).unwrap(),
//!         Arc::new(|sensor, value| println!("{}: {:?}", sensor.name, value)),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub use comfoconnect_core::{ComfoError, ComfoResult, PdoType, Value};

pub use comfoconnect_client::{
    discover_bridge, discover_bridges, Bridge, BridgeSettings, BypassMode, ComfoCoolMode,
    ComfoConnect, SessionState, VentilationBalance, VentilationMode, VentilationSetting,
    VentilationSpeed, VentilationTemperatureProfile, PORT,
};

// Re-export the protocol layer for low-level consumers.
pub mod proto {
    pub use comfoconnect_proto::*;
}

// Re-export the static registries.
pub mod registry {
    pub use comfoconnect_registry::*;
}

pub mod client {
    pub use comfoconnect_client::*;
}
