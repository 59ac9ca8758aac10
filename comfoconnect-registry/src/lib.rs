//! Static registries for the ComfoAir Q family
//!
//! Sensor definitions, property descriptors, ComfoNet unit addresses and the
//! alarm error text tables. These are data, not behavior: everything in this
//! crate is a compile-time constant.

pub mod consts;
pub mod errors;
pub mod properties;
pub mod sensors;

pub use properties::Property;
pub use sensors::{sensor, Sensor, SensorValue, Transform, SENSORS};
