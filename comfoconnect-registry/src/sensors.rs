//! Sensor definitions for the ComfoAir Q family
//!
//! Each sensor maps one process-data object id to a name, an optional
//! measurement unit, the wire type of its samples and the transform applied
//! to the raw value before delivery.

use comfoconnect_core::util::uint_to_bits;
use comfoconnect_core::value::le_signed;
use comfoconnect_core::{ComfoError, ComfoResult, PdoType};
use serde::Serialize;

pub const UNIT_WATT: &str = "W";
pub const UNIT_KWH: &str = "kWh";
pub const UNIT_VOLT: &str = "V";
pub const UNIT_CELSIUS: &str = "°C";
pub const UNIT_PERCENT: &str = "%";
pub const UNIT_RPM: &str = "rpm";
pub const UNIT_M3H: &str = "m³/h";
pub const UNIT_SECONDS: &str = "s";
pub const UNIT_DAYS: &str = "days";

/// Transform from the raw sample integer to the delivered value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Transform {
    /// Deliver the raw integer
    Identity,
    /// Multiply the raw integer by a fixed scale factor
    Scale(f64),
    /// Non-zero means true
    Boolean,
    /// 0 is celsius, anything else fahrenheit
    TemperatureUnit,
    /// Bitmask of active airflow constraints
    AirflowConstraints,
}

/// A decoded sensor reading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SensorValue {
    Number(f64),
    Bool(bool),
    Text(&'static str),
    Constraints(Vec<&'static str>),
}

/// A sensor definition
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sensor {
    /// Process-data object id
    pub id: u16,
    pub name: &'static str,
    pub unit: Option<&'static str>,
    pub pdo_type: PdoType,
    pub transform: Transform,
    /// PDO zone, always 1 on this appliance family
    pub zone: u8,
}

impl Sensor {
    const fn new(
        id: u16,
        name: &'static str,
        unit: Option<&'static str>,
        pdo_type: PdoType,
        transform: Transform,
    ) -> Self {
        Self {
            id,
            name,
            unit,
            pdo_type,
            transform,
            zone: 1,
        }
    }

    /// Decode a raw notification sample into the delivered value.
    ///
    /// Samples are little-endian and sign-extended from their wire width
    /// before the transform is applied.
    pub fn decode(&self, data: &[u8]) -> ComfoResult<SensorValue> {
        let width = self.pdo_type.width().unwrap_or(1);
        if data.len() < width {
            return Err(ComfoError::Decode(format!(
                "sample for sensor {} ({}) needs {} bytes, got {}",
                self.id,
                self.name,
                width,
                data.len()
            )));
        }
        let raw = le_signed(&data[..width]);
        Ok(match self.transform {
            Transform::Identity => SensorValue::Number(raw as f64),
            Transform::Scale(scale) => SensorValue::Number(raw as f64 * scale),
            Transform::Boolean => SensorValue::Bool(raw != 0),
            Transform::TemperatureUnit => SensorValue::Text(if raw == 0 {
                "celsius"
            } else {
                "fahrenheit"
            }),
            Transform::AirflowConstraints => {
                SensorValue::Constraints(airflow_constraints(raw as u64))
            }
        })
    }
}

/// Constraint names by bit position in the airflow constraint bitmask.
const CONSTRAINT_BITS: &[(u32, &str)] = &[
    (2, "Resistance"),
    (3, "Resistance"),
    (4, "PreheaterNegative"),
    (5, "NoiseGuard"),
    (6, "ResistanceGuard"),
    (7, "NoiseGuard"),
    (8, "ResistanceGuard"),
    (9, "FrostProtection"),
    (10, "Bypass"),
    (12, "AnalogInput1"),
    (13, "AnalogInput2"),
    (14, "AnalogInput3"),
    (15, "AnalogInput4"),
    (16, "Hood"),
    (18, "AnalogPreset"),
    (19, "ComfoCool"),
    (22, "PreheaterPositive"),
    (23, "RFSensorFlowPreset"),
    (24, "RFSensorFlowProportional"),
    (25, "TemperatureComfort"),
    (26, "HumidityComfort"),
    (27, "HumidityProtection"),
    (47, "CO2ZoneX1"),
    (48, "CO2ZoneX2"),
    (49, "CO2ZoneX3"),
    (50, "CO2ZoneX4"),
    (51, "CO2ZoneX5"),
    (52, "CO2ZoneX6"),
    (53, "CO2ZoneX7"),
    (54, "CO2ZoneX8"),
];

/// Bit 45 flags that the constraint mask is valid at all.
const CONSTRAINT_VALID_BIT: u32 = 45;

/// Decode the airflow constraint bitmask into named constraints.
///
/// Returns an empty list when the mask is not flagged valid. Duplicate names
/// (a constraint can be reported by more than one bit) collapse to one entry.
pub fn airflow_constraints(mask: u64) -> Vec<&'static str> {
    let bits = uint_to_bits(mask);
    if !bits.contains(&CONSTRAINT_VALID_BIT) {
        return Vec::new();
    }
    let mut constraints: Vec<&'static str> = Vec::new();
    for (bit, name) in CONSTRAINT_BITS {
        if bits.contains(bit) && !constraints.contains(name) {
            constraints.push(name);
        }
    }
    constraints
}

pub const SENSOR_DEVICE_STATE: u16 = 16;
pub const SENSOR_CHANGING_FILTERS: u16 = 18;
pub const SENSOR_OPERATING_MODE: u16 = 49;
pub const SENSOR_OPERATING_MODE_BIS: u16 = 56;
pub const SENSOR_FAN_SPEED_MODE: u16 = 65;
pub const SENSOR_BYPASS_ACTIVATION_MODE: u16 = 66;
pub const SENSOR_TEMPERATURE_PROFILE_MODE: u16 = 67;
pub const SENSOR_FAN_MODE_SUPPLY: u16 = 70;
pub const SENSOR_FAN_MODE_EXHAUST: u16 = 71;
pub const SENSOR_FAN_SPEED_NEXT_CHANGE: u16 = 81;
pub const SENSOR_BYPASS_NEXT_CHANGE: u16 = 82;
pub const SENSOR_FAN_EXHAUST_DUTY: u16 = 117;
pub const SENSOR_FAN_SUPPLY_DUTY: u16 = 118;
pub const SENSOR_FAN_EXHAUST_FLOW: u16 = 119;
pub const SENSOR_FAN_SUPPLY_FLOW: u16 = 120;
pub const SENSOR_FAN_EXHAUST_SPEED: u16 = 121;
pub const SENSOR_FAN_SUPPLY_SPEED: u16 = 122;
pub const SENSOR_POWER_USAGE: u16 = 128;
pub const SENSOR_POWER_USAGE_YEAR: u16 = 129;
pub const SENSOR_POWER_USAGE_TOTAL: u16 = 130;
pub const SENSOR_PREHEATER_POWER_YEAR: u16 = 144;
pub const SENSOR_PREHEATER_POWER_TOTAL: u16 = 145;
pub const SENSOR_PREHEATER_POWER: u16 = 146;
pub const SENSOR_RF_PAIRING_MODE: u16 = 176;
pub const SENSOR_DAYS_TO_REPLACE_FILTER: u16 = 192;
pub const SENSOR_UNIT_TEMPERATURE: u16 = 208;
pub const SENSOR_RMOT: u16 = 209;
pub const SENSOR_SEASON_HEATING_ACTIVE: u16 = 210;
pub const SENSOR_SEASON_COOLING_ACTIVE: u16 = 211;
pub const SENSOR_TARGET_TEMPERATURE: u16 = 212;
pub const SENSOR_AVOIDED_HEATING: u16 = 213;
pub const SENSOR_AVOIDED_HEATING_YEAR: u16 = 214;
pub const SENSOR_AVOIDED_HEATING_TOTAL: u16 = 215;
pub const SENSOR_AVOIDED_COOLING: u16 = 216;
pub const SENSOR_AVOIDED_COOLING_YEAR: u16 = 217;
pub const SENSOR_AVOIDED_COOLING_TOTAL: u16 = 218;
pub const SENSOR_TEMPERATURE_OUTDOOR: u16 = 220;
pub const SENSOR_TEMPERATURE_PREHEATED: u16 = 221;
pub const SENSOR_BYPASS_STATE: u16 = 227;
pub const SENSOR_AIRFLOW_CONSTRAINTS: u16 = 230;
pub const SENSOR_TEMPERATURE_EXTRACT: u16 = 274;
pub const SENSOR_TEMPERATURE_EXHAUST: u16 = 275;
pub const SENSOR_TEMPERATURE_SUPPLY: u16 = 276;
pub const SENSOR_HUMIDITY_EXTRACT: u16 = 290;
pub const SENSOR_HUMIDITY_EXHAUST: u16 = 291;
pub const SENSOR_HUMIDITY_OUTDOOR: u16 = 292;
pub const SENSOR_HUMIDITY_PREHEATED: u16 = 293;
pub const SENSOR_HUMIDITY_SUPPLY: u16 = 294;
pub const SENSOR_ANALOG_INPUT_1: u16 = 369;
pub const SENSOR_ANALOG_INPUT_2: u16 = 370;
pub const SENSOR_ANALOG_INPUT_3: u16 = 371;
pub const SENSOR_ANALOG_INPUT_4: u16 = 372;

/// All known sensors, sorted by id.
pub const SENSORS: &[Sensor] = &[
    Sensor::new(SENSOR_DEVICE_STATE, "Device State", None, PdoType::UInt8, Transform::Identity),
    Sensor::new(SENSOR_CHANGING_FILTERS, "Changing filters", None, PdoType::UInt8, Transform::Identity),
    Sensor::new(SENSOR_OPERATING_MODE, "Operating Mode", None, PdoType::UInt8, Transform::Identity),
    Sensor::new(SENSOR_OPERATING_MODE_BIS, "Operating Mode (alternative)", None, PdoType::UInt8, Transform::Identity),
    Sensor::new(SENSOR_FAN_SPEED_MODE, "Fan Speed", None, PdoType::UInt8, Transform::Identity),
    Sensor::new(SENSOR_BYPASS_ACTIVATION_MODE, "Bypass Activation Mode", None, PdoType::UInt8, Transform::Identity),
    Sensor::new(SENSOR_TEMPERATURE_PROFILE_MODE, "Temperature Profile", None, PdoType::UInt8, Transform::Identity),
    Sensor::new(SENSOR_FAN_MODE_SUPPLY, "Supply Fan Mode", None, PdoType::UInt8, Transform::Identity),
    Sensor::new(SENSOR_FAN_MODE_EXHAUST, "Exhaust Fan Mode", None, PdoType::UInt8, Transform::Identity),
    Sensor::new(SENSOR_FAN_SPEED_NEXT_CHANGE, "Fan Speed Next Change", Some(UNIT_SECONDS), PdoType::UInt32, Transform::Identity),
    Sensor::new(SENSOR_BYPASS_NEXT_CHANGE, "Bypass Next Change", Some(UNIT_SECONDS), PdoType::UInt32, Transform::Identity),
    Sensor::new(SENSOR_FAN_EXHAUST_DUTY, "Exhaust Fan Duty", Some(UNIT_PERCENT), PdoType::UInt8, Transform::Identity),
    Sensor::new(SENSOR_FAN_SUPPLY_DUTY, "Supply Fan Duty", Some(UNIT_PERCENT), PdoType::UInt8, Transform::Identity),
    Sensor::new(SENSOR_FAN_EXHAUST_FLOW, "Exhaust Fan Flow", Some(UNIT_M3H), PdoType::UInt16, Transform::Identity),
    Sensor::new(SENSOR_FAN_SUPPLY_FLOW, "Supply Fan Flow", Some(UNIT_M3H), PdoType::UInt16, Transform::Identity),
    Sensor::new(SENSOR_FAN_EXHAUST_SPEED, "Exhaust Fan Speed", Some(UNIT_RPM), PdoType::UInt16, Transform::Identity),
    Sensor::new(SENSOR_FAN_SUPPLY_SPEED, "Supply Fan Speed", Some(UNIT_RPM), PdoType::UInt16, Transform::Identity),
    Sensor::new(SENSOR_POWER_USAGE, "Power Usage", Some(UNIT_WATT), PdoType::UInt16, Transform::Identity),
    Sensor::new(SENSOR_POWER_USAGE_YEAR, "Power Usage (year)", Some(UNIT_KWH), PdoType::UInt16, Transform::Identity),
    Sensor::new(SENSOR_POWER_USAGE_TOTAL, "Power Usage (total)", Some(UNIT_KWH), PdoType::UInt16, Transform::Identity),
    Sensor::new(SENSOR_PREHEATER_POWER_YEAR, "Preheater Power (year)", Some(UNIT_KWH), PdoType::UInt16, Transform::Identity),
    Sensor::new(SENSOR_PREHEATER_POWER_TOTAL, "Preheater Power (total)", Some(UNIT_KWH), PdoType::UInt16, Transform::Identity),
    Sensor::new(SENSOR_PREHEATER_POWER, "Preheater Power", Some(UNIT_WATT), PdoType::UInt16, Transform::Identity),
    Sensor::new(SENSOR_RF_PAIRING_MODE, "RF Pairing Mode", None, PdoType::UInt8, Transform::Identity),
    Sensor::new(SENSOR_DAYS_TO_REPLACE_FILTER, "Days to Replace Filter", None, PdoType::UInt16, Transform::Identity),
    Sensor::new(SENSOR_UNIT_TEMPERATURE, "Unit Temperature", None, PdoType::UInt8, Transform::TemperatureUnit),
    Sensor::new(SENSOR_RMOT, "Running Mean Outdoor Temperature", Some(UNIT_CELSIUS), PdoType::Int16, Transform::Scale(0.1)),
    Sensor::new(SENSOR_SEASON_HEATING_ACTIVE, "Heating Season Active", None, PdoType::Bool, Transform::Boolean),
    Sensor::new(SENSOR_SEASON_COOLING_ACTIVE, "Cooling Season Active", None, PdoType::Bool, Transform::Boolean),
    Sensor::new(SENSOR_TARGET_TEMPERATURE, "Target Temperature", Some(UNIT_CELSIUS), PdoType::Int16, Transform::Scale(0.1)),
    Sensor::new(SENSOR_AVOIDED_HEATING, "Avoided Heating", Some(UNIT_WATT), PdoType::UInt16, Transform::Identity),
    Sensor::new(SENSOR_AVOIDED_HEATING_YEAR, "Avoided Heating (year)", Some(UNIT_KWH), PdoType::UInt16, Transform::Identity),
    Sensor::new(SENSOR_AVOIDED_HEATING_TOTAL, "Avoided Heating (total)", Some(UNIT_KWH), PdoType::UInt16, Transform::Identity),
    Sensor::new(SENSOR_AVOIDED_COOLING, "Avoided Cooling", Some(UNIT_WATT), PdoType::UInt16, Transform::Identity),
    Sensor::new(SENSOR_AVOIDED_COOLING_YEAR, "Avoided Cooling (year)", Some(UNIT_KWH), PdoType::UInt16, Transform::Identity),
    Sensor::new(SENSOR_AVOIDED_COOLING_TOTAL, "Avoided Cooling (total)", Some(UNIT_KWH), PdoType::UInt16, Transform::Identity),
    Sensor::new(SENSOR_TEMPERATURE_OUTDOOR, "Outdoor Air Temperature", Some(UNIT_CELSIUS), PdoType::Int16, Transform::Scale(0.1)),
    Sensor::new(SENSOR_TEMPERATURE_PREHEATED, "Preheated Outdoor Air Temperature", Some(UNIT_CELSIUS), PdoType::Int16, Transform::Scale(0.1)),
    Sensor::new(SENSOR_BYPASS_STATE, "Bypass State", Some(UNIT_PERCENT), PdoType::UInt8, Transform::Identity),
    Sensor::new(SENSOR_AIRFLOW_CONSTRAINTS, "Airflow Constraints", None, PdoType::Int64, Transform::AirflowConstraints),
    Sensor::new(SENSOR_TEMPERATURE_EXTRACT, "Extract Air Temperature", Some(UNIT_CELSIUS), PdoType::Int16, Transform::Scale(0.1)),
    Sensor::new(SENSOR_TEMPERATURE_EXHAUST, "Exhaust Air Temperature", Some(UNIT_CELSIUS), PdoType::Int16, Transform::Scale(0.1)),
    Sensor::new(SENSOR_TEMPERATURE_SUPPLY, "Supply Air Temperature", Some(UNIT_CELSIUS), PdoType::Int16, Transform::Scale(0.1)),
    Sensor::new(SENSOR_HUMIDITY_EXTRACT, "Extract Air Humidity", Some(UNIT_PERCENT), PdoType::UInt8, Transform::Identity),
    Sensor::new(SENSOR_HUMIDITY_EXHAUST, "Exhaust Air Humidity", Some(UNIT_PERCENT), PdoType::UInt8, Transform::Identity),
    Sensor::new(SENSOR_HUMIDITY_OUTDOOR, "Outdoor Air Humidity", Some(UNIT_PERCENT), PdoType::UInt8, Transform::Identity),
    Sensor::new(SENSOR_HUMIDITY_PREHEATED, "Preheated Outdoor Air Humidity", Some(UNIT_PERCENT), PdoType::UInt8, Transform::Identity),
    Sensor::new(SENSOR_HUMIDITY_SUPPLY, "Supply Air Humidity", Some(UNIT_PERCENT), PdoType::UInt8, Transform::Identity),
    Sensor::new(SENSOR_ANALOG_INPUT_1, "Analog Input 1", Some(UNIT_VOLT), PdoType::UInt8, Transform::Scale(0.1)),
    Sensor::new(SENSOR_ANALOG_INPUT_2, "Analog Input 2", Some(UNIT_VOLT), PdoType::UInt8, Transform::Scale(0.1)),
    Sensor::new(SENSOR_ANALOG_INPUT_3, "Analog Input 3", Some(UNIT_VOLT), PdoType::UInt8, Transform::Scale(0.1)),
    Sensor::new(SENSOR_ANALOG_INPUT_4, "Analog Input 4", Some(UNIT_VOLT), PdoType::UInt8, Transform::Scale(0.1)),
];

/// Look up a sensor by PDO id.
pub fn sensor(id: u16) -> Option<&'static Sensor> {
    SENSORS
        .binary_search_by_key(&id, |sensor| sensor.id)
        .ok()
        .map(|index| &SENSORS[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted_and_unique() {
        for window in SENSORS.windows(2) {
            assert!(window[0].id < window[1].id, "table must be sorted by id");
        }
    }

    #[test]
    fn test_lookup_by_id() {
        let found = sensor(SENSOR_TEMPERATURE_SUPPLY).unwrap();
        assert_eq!(found.id, 276);
        assert_eq!(found.name, "Supply Air Temperature");
        assert_eq!(found.unit, Some(UNIT_CELSIUS));
        assert_eq!(found.pdo_type, PdoType::Int16);
        assert!(sensor(9999).is_none());
    }

    #[test]
    fn test_every_zone_is_one() {
        assert!(SENSORS.iter().all(|sensor| sensor.zone == 1));
    }

    #[test]
    fn test_temperature_decoding_scales_by_tenths() {
        let supply = sensor(SENSOR_TEMPERATURE_SUPPLY).unwrap();
        assert_eq!(
            supply.decode(&[0x60, 0x09]).unwrap(),
            SensorValue::Number(240.0)
        );
        // -5.0 °C
        assert_eq!(
            supply.decode(&(-50i16).to_le_bytes()).unwrap(),
            SensorValue::Number(-5.0)
        );
    }

    #[test]
    fn test_plain_sensors_decode_identity() {
        let duty = sensor(SENSOR_FAN_EXHAUST_DUTY).unwrap();
        assert_eq!(duty.decode(&[45]).unwrap(), SensorValue::Number(45.0));

        let power = sensor(SENSOR_POWER_USAGE).unwrap();
        assert_eq!(
            power.decode(&[0x2C, 0x01]).unwrap(),
            SensorValue::Number(300.0)
        );
    }

    #[test]
    fn test_boolean_and_unit_sensors() {
        let season = sensor(SENSOR_SEASON_HEATING_ACTIVE).unwrap();
        assert_eq!(season.decode(&[1]).unwrap(), SensorValue::Bool(true));
        assert_eq!(season.decode(&[0]).unwrap(), SensorValue::Bool(false));

        let unit = sensor(SENSOR_UNIT_TEMPERATURE).unwrap();
        assert_eq!(unit.decode(&[0]).unwrap(), SensorValue::Text("celsius"));
        assert_eq!(unit.decode(&[1]).unwrap(), SensorValue::Text("fahrenheit"));
    }

    #[test]
    fn test_short_sample_is_a_decode_error() {
        let supply = sensor(SENSOR_TEMPERATURE_SUPPLY).unwrap();
        assert!(matches!(
            supply.decode(&[0x60]),
            Err(ComfoError::Decode(_))
        ));
    }

    #[test]
    fn test_airflow_constraints_decoding() {
        // Valid bit plus bypass and resistance (reported on two bits).
        let mask = (1u64 << 45) | (1 << 10) | (1 << 2) | (1 << 3);
        assert_eq!(airflow_constraints(mask), vec!["Resistance", "Bypass"]);
        // Without the valid bit nothing is reported.
        assert_eq!(airflow_constraints(1 << 10), Vec::<&str>::new());

        let constraints = sensor(SENSOR_AIRFLOW_CONSTRAINTS).unwrap();
        let sample = ((1u64 << 45) | (1 << 19)).to_le_bytes();
        assert_eq!(
            constraints.decode(&sample).unwrap(),
            SensorValue::Constraints(vec!["ComfoCool"])
        );
    }
}
