//! Property descriptors addressable over RMI

use comfoconnect_core::PdoType;
use serde::Serialize;

use crate::consts::{SUBUNIT_01, UNIT_NODE, UNIT_NODECONFIGURATION, UNIT_TEMPHUMCONTROL};

/// A property descriptor: where a property lives and how its value decodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Property {
    pub unit: u8,
    pub subunit: u8,
    pub property_id: u8,
    pub pdo_type: PdoType,
}

impl Property {
    pub const fn new(unit: u8, subunit: u8, property_id: u8, pdo_type: PdoType) -> Self {
        Self {
            unit,
            subunit,
            property_id,
            pdo_type,
        }
    }
}

// Node unit property ids
pub const PROP_ID_NODE_SERIAL_NUMBER: u8 = 0x04;
pub const PROP_ID_NODE_FW_VERSION: u8 = 0x06;
pub const PROP_ID_NODE_MODEL: u8 = 0x08;
pub const PROP_ID_NODE_ARTICLE: u8 = 0x0B;
pub const PROP_ID_NODE_COUNTRY: u8 = 0x0D;
pub const PROP_ID_NODE_NAME: u8 = 0x14;

// Node configuration property ids
pub const PROP_ID_NODE_CFG_MAINTAINER_PASSWORD: u8 = 0x03;

// Temperature/humidity control property ids
pub const PROP_ID_VENT_TEMP_PASSIVE: u8 = 0x04;
pub const PROP_ID_VENT_HUMI_COMFORT: u8 = 0x06;
pub const PROP_ID_VENT_HUMI_PROTECT: u8 = 0x07;

pub const PROPERTY_SERIAL_NUMBER: Property =
    Property::new(UNIT_NODE, SUBUNIT_01, PROP_ID_NODE_SERIAL_NUMBER, PdoType::String);
pub const PROPERTY_FIRMWARE_VERSION: Property =
    Property::new(UNIT_NODE, SUBUNIT_01, PROP_ID_NODE_FW_VERSION, PdoType::UInt32);
pub const PROPERTY_MODEL: Property =
    Property::new(UNIT_NODE, SUBUNIT_01, PROP_ID_NODE_MODEL, PdoType::String);
pub const PROPERTY_ARTICLE: Property =
    Property::new(UNIT_NODE, SUBUNIT_01, PROP_ID_NODE_ARTICLE, PdoType::String);
pub const PROPERTY_COUNTRY: Property =
    Property::new(UNIT_NODE, SUBUNIT_01, PROP_ID_NODE_COUNTRY, PdoType::String);
pub const PROPERTY_NAME: Property =
    Property::new(UNIT_NODE, SUBUNIT_01, PROP_ID_NODE_NAME, PdoType::String);

pub const PROPERTY_MAINTAINER_PASSWORD: Property = Property::new(
    UNIT_NODECONFIGURATION,
    SUBUNIT_01,
    PROP_ID_NODE_CFG_MAINTAINER_PASSWORD,
    PdoType::String,
);

pub const PROPERTY_SENSOR_VENTILATION_TEMP_PASSIVE: Property = Property::new(
    UNIT_TEMPHUMCONTROL,
    SUBUNIT_01,
    PROP_ID_VENT_TEMP_PASSIVE,
    PdoType::UInt32,
);
pub const PROPERTY_SENSOR_VENTILATION_HUMIDITY_COMFORT: Property = Property::new(
    UNIT_TEMPHUMCONTROL,
    SUBUNIT_01,
    PROP_ID_VENT_HUMI_COMFORT,
    PdoType::UInt32,
);
pub const PROPERTY_SENSOR_VENTILATION_HUMIDITY_PROTECTION: Property = Property::new(
    UNIT_TEMPHUMCONTROL,
    SUBUNIT_01,
    PROP_ID_VENT_HUMI_PROTECT,
    PdoType::UInt32,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_properties_address_the_node_unit() {
        for property in [
            PROPERTY_SERIAL_NUMBER,
            PROPERTY_FIRMWARE_VERSION,
            PROPERTY_MODEL,
            PROPERTY_ARTICLE,
            PROPERTY_COUNTRY,
            PROPERTY_NAME,
        ] {
            assert_eq!(property.unit, UNIT_NODE);
            assert_eq!(property.subunit, SUBUNIT_01);
        }
        assert_eq!(PROPERTY_SERIAL_NUMBER.pdo_type, PdoType::String);
        assert_eq!(PROPERTY_FIRMWARE_VERSION.pdo_type, PdoType::UInt32);
    }

    #[test]
    fn test_ventmode_properties() {
        assert_eq!(PROPERTY_SENSOR_VENTILATION_TEMP_PASSIVE.property_id, 0x04);
        assert_eq!(PROPERTY_SENSOR_VENTILATION_HUMIDITY_COMFORT.property_id, 0x06);
        assert_eq!(
            PROPERTY_SENSOR_VENTILATION_HUMIDITY_PROTECTION.property_id,
            0x07
        );
    }
}
