//! RMI payload builders
//!
//! The remote management interface is tunneled as raw byte strings inside
//! `CnRmiRequest`. An opcode byte selects the operation, followed by the
//! ComfoNet unit, subunit and operation-specific arguments. Multi-byte
//! integers are little-endian. The byte sequences here are taken from the
//! appliance's RMI documentation and must be reproduced exactly.

use comfoconnect_core::{ComfoError, ComfoResult, Value};
use comfoconnect_registry::consts::{UNIT_ERROR, UNIT_SCHEDULE};
use comfoconnect_registry::Property;

/// Read a single typed property: `[0x01, unit, subunit, 0x10, id]`.
const OP_PROPERTY_READ: u8 = 0x01;
/// Read a list of properties: `[0x02, unit, subunit, 0x01, 0x10 | n, id...]`.
const OP_PROPERTY_READ_MULTIPLE: u8 = 0x02;
/// Write a property: `[0x03, unit, subunit, id, value...]`.
const OP_PROPERTY_WRITE: u8 = 0x03;
/// Clear unit state (used on the error unit to dismiss active errors).
const OP_CLEAR: u8 = 0x82;
/// Read a schedule entry: `[0x83, unit, subunit, slot]`.
const OP_SCHEDULE_READ: u8 = 0x83;
/// Set a schedule entry with a start offset, a timeout and a value.
const OP_SCHEDULE_SET: u8 = 0x84;
/// Clear a schedule entry, reverting the subunit to automatic control.
const OP_SCHEDULE_CLEAR: u8 = 0x85;

/// Schedule timeout that never expires.
pub const TIMEOUT_INDEFINITE: i32 = -1;

/// Build a property read request.
pub fn property_read(property: &Property) -> Vec<u8> {
    property_read_raw(property.unit, property.subunit, property.property_id)
}

/// Build a property read request from raw addressing.
pub fn property_read_raw(unit: u8, subunit: u8, property_id: u8) -> Vec<u8> {
    vec![OP_PROPERTY_READ, unit, subunit, 0x10, property_id]
}

/// Build a multi-property read request.
pub fn property_read_multiple(unit: u8, subunit: u8, property_ids: &[u8]) -> Vec<u8> {
    let mut message = vec![
        OP_PROPERTY_READ_MULTIPLE,
        unit,
        subunit,
        0x01,
        0x10 | property_ids.len() as u8,
    ];
    message.extend_from_slice(property_ids);
    message
}

/// Build a property write request with pre-encoded value bytes.
pub fn property_write(unit: u8, subunit: u8, property_id: u8, value: &[u8]) -> Vec<u8> {
    let mut message = vec![OP_PROPERTY_WRITE, unit, subunit, property_id];
    message.extend_from_slice(value);
    message
}

/// Build a property write request, encoding the value per the descriptor.
pub fn property_write_typed(property: &Property, value: &Value) -> ComfoResult<Vec<u8>> {
    let encoded = value.encode(property.pdo_type)?;
    Ok(property_write(
        property.unit,
        property.subunit,
        property.property_id,
        &encoded,
    ))
}

/// Build a schedule entry read for the schedule unit.
pub fn schedule_read(subunit: u8, slot: u8) -> Vec<u8> {
    vec![OP_SCHEDULE_READ, UNIT_SCHEDULE, subunit, slot]
}

/// Build a schedule entry set for the schedule unit.
///
/// The entry starts immediately (zero start offset) and carries a signed
/// timeout in seconds; [`TIMEOUT_INDEFINITE`] keeps it active until cleared.
pub fn schedule_set(subunit: u8, slot: u8, timeout_s: i32, value: u8) -> Vec<u8> {
    let mut message = vec![OP_SCHEDULE_SET, UNIT_SCHEDULE, subunit, slot, 0x00, 0x00, 0x00, 0x00];
    message.extend_from_slice(&timeout_s.to_le_bytes());
    message.push(value);
    message
}

/// Build a schedule entry clear for the schedule unit.
pub fn schedule_clear(subunit: u8, slot: u8) -> Vec<u8> {
    vec![OP_SCHEDULE_CLEAR, UNIT_SCHEDULE, subunit, slot]
}

/// Build the clear-errors request.
pub fn clear_errors() -> Vec<u8> {
    vec![OP_CLEAR, UNIT_ERROR, 0x01]
}

/// Ventilation mode of the whole unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VentilationMode {
    Auto,
    Manual,
}

impl std::fmt::Display for VentilationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Ventilation speed preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VentilationSpeed {
    Away = 0,
    Low = 1,
    Medium = 2,
    High = 3,
}

impl VentilationSpeed {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Away),
            1 => Some(Self::Low),
            2 => Some(Self::Medium),
            3 => Some(Self::High),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for VentilationSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Away => write!(f, "away"),
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Off / auto / on setting used by the sensor-based ventilation modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VentilationSetting {
    Off = 0,
    Auto = 1,
    On = 2,
}

impl VentilationSetting {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Off),
            1 => Some(Self::Auto),
            2 => Some(Self::On),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for VentilationSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::Auto => write!(f, "auto"),
            Self::On => write!(f, "on"),
        }
    }
}

/// Bypass control mode; the schedule value 1 opens the bypass, 2 closes it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BypassMode {
    Auto = 0,
    Open = 1,
    Closed = 2,
}

impl BypassMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Auto),
            1 => Some(Self::Open),
            2 => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for BypassMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Temperature profile of the unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VentilationTemperatureProfile {
    Normal = 0,
    Cool = 1,
    Warm = 2,
}

impl VentilationTemperatureProfile {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Normal),
            1 => Some(Self::Cool),
            2 => Some(Self::Warm),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for VentilationTemperatureProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Cool => write!(f, "cool"),
            Self::Warm => write!(f, "warm"),
        }
    }
}

/// Fan balance mode, derived from the supply (06) and exhaust (07) schedule
/// subunits: an override on 06 means supply only, on 07 exhaust only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VentilationBalance {
    Balance,
    SupplyOnly,
    ExhaustOnly,
}

impl VentilationBalance {
    /// Derive the balance mode from the active flags of subunits 06 and 07.
    pub fn from_subunits(mode_06: u8, mode_07: u8) -> ComfoResult<Self> {
        match (mode_06, mode_07) {
            (a, b) if a == b => Ok(Self::Balance),
            (1, 0) => Ok(Self::SupplyOnly),
            (0, 1) => Ok(Self::ExhaustOnly),
            (a, b) => Err(ComfoError::Decode(format!(
                "invalid balance mode combination: 6={a}, 7={b}"
            ))),
        }
    }
}

impl std::fmt::Display for VentilationBalance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Balance => write!(f, "balance"),
            Self::SupplyOnly => write!(f, "supply_only"),
            Self::ExhaustOnly => write!(f, "exhaust_only"),
        }
    }
}

/// ComfoCool control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ComfoCoolMode {
    Off = 0,
    Auto = 1,
}

impl std::fmt::Display for ComfoCoolMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::Auto => write!(f, "auto"),
        }
    }
}
