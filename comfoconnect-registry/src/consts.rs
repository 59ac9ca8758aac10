//! ComfoNet unit and subunit addresses

pub const UNIT_NODE: u8 = 0x01;
pub const UNIT_COMFOBUS: u8 = 0x02;
pub const UNIT_ERROR: u8 = 0x03;
pub const UNIT_SCHEDULE: u8 = 0x15;
pub const UNIT_VALVE: u8 = 0x16;
pub const UNIT_FAN: u8 = 0x17;
pub const UNIT_POWERSENSOR: u8 = 0x18;
pub const UNIT_PREHEATER: u8 = 0x19;
pub const UNIT_HMI: u8 = 0x1A;
pub const UNIT_RFCOMMUNICATION: u8 = 0x1B;
pub const UNIT_FILTER: u8 = 0x1C;
pub const UNIT_TEMPHUMCONTROL: u8 = 0x1D;
pub const UNIT_VENTILATIONCONFIG: u8 = 0x1E;
pub const UNIT_NODECONFIGURATION: u8 = 0x20;
pub const UNIT_TEMPERATURESENSOR: u8 = 0x21;
pub const UNIT_HUMIDITYSENSOR: u8 = 0x22;
pub const UNIT_PRESSURESENSOR: u8 = 0x23;
pub const UNIT_PERIPHERALS: u8 = 0x24;
pub const UNIT_ANALOGINPUT: u8 = 0x25;
pub const UNIT_COOKERHOOD: u8 = 0x26;
pub const UNIT_POSTHEATER: u8 = 0x27;
pub const UNIT_COMFOFOND: u8 = 0x28;
pub const UNIT_CO2SENSOR: u8 = 0x2B;
pub const UNIT_SERVICEPRINT: u8 = 0x2C;

pub const SUBUNIT_01: u8 = 0x01;
pub const SUBUNIT_02: u8 = 0x02;
pub const SUBUNIT_03: u8 = 0x03;
pub const SUBUNIT_04: u8 = 0x04;
pub const SUBUNIT_05: u8 = 0x05;
pub const SUBUNIT_06: u8 = 0x06;
pub const SUBUNIT_07: u8 = 0x07;
pub const SUBUNIT_08: u8 = 0x08;
