//! Register map definitions for the EE871 CO2 sensor.
//!
//! The sensor exposes two address spaces: sixteen "main command" registers
//! selected directly by the upper nibble of the control byte, and a 256-byte
//! custom memory map reached through an auto-incrementing pointer.
#![allow(unused_parens)]

use modular_bitfield::prelude::*;

use crate::params::{BusPriority, MeasureMode};

/// Lowest valid E2 device address.
pub const DEVICE_ADDRESS_MIN: u8 = 0;
/// Highest valid E2 device address.
pub const DEVICE_ADDRESS_MAX: u8 = 7;

const RW_READ: u8 = 0x01;
const ADDR_SHIFT: u8 = 1;
const MAIN_SHIFT: u8 = 4;

/// Builds a control byte: `(main << 4) | ((address & 7) << 1) | read`.
pub const fn control_byte(main_command: u8, device_address: u8, read: bool) -> u8 {
    let rw = if read { RW_READ } else { 0 };
    ((main_command & 0x0F) << MAIN_SHIFT) | ((device_address & 0x07) << ADDR_SHIFT) | rw
}

/// Control byte of a read transaction.
pub const fn control_read(main_command: u8, device_address: u8) -> u8 {
    control_byte(main_command, device_address, true)
}

/// Control byte of a write transaction.
pub const fn control_write(main_command: u8, device_address: u8) -> u8 {
    control_byte(main_command, device_address, false)
}

// ----------------------------------------------------------------------
// Main command nibbles (control byte b7..b4)
// ----------------------------------------------------------------------

/// Sensor group, low byte (read).
pub const MAIN_TYPE_LO: u8 = 0x1;
/// Direct custom memory write (write).
pub const MAIN_CUSTOM_WRITE: u8 = 0x1;
/// Sensor subgroup.
pub const MAIN_TYPE_SUB: u8 = 0x2;
/// Available physical measurements bitfield.
pub const MAIN_AVAIL_MEAS: u8 = 0x3;
/// Sensor group, high byte.
pub const MAIN_TYPE_HI: u8 = 0x4;
/// Custom memory pointer: write sets it, read returns the byte under it.
pub const MAIN_CUSTOM_PTR: u8 = 0x5;
/// Status byte.
pub const MAIN_STATUS: u8 = 0x7;
/// Measurement value 1, low byte.
pub const MAIN_MV1_LO: u8 = 0x8;
/// Measurement value 1, high byte.
pub const MAIN_MV1_HI: u8 = 0x9;
/// Measurement value 2, low byte.
pub const MAIN_MV2_LO: u8 = 0xA;
/// Measurement value 2, high byte.
pub const MAIN_MV2_HI: u8 = 0xB;
/// CO2 fast response (MV3), low byte.
pub const MAIN_MV3_LO: u8 = 0xC;
/// CO2 fast response (MV3), high byte.
pub const MAIN_MV3_HI: u8 = 0xD;
/// CO2 averaged value (MV4), low byte.
pub const MAIN_MV4_LO: u8 = 0xE;
/// CO2 averaged value (MV4), high byte.
pub const MAIN_MV4_HI: u8 = 0xF;
/// Highest valid main command nibble.
pub const MAIN_COMMAND_MAX: u8 = 0x0F;

// ----------------------------------------------------------------------
// Identity
// ----------------------------------------------------------------------

/// Sensor group reported by every EE871.
pub const SENSOR_GROUP_ID: u16 = 0x0367;
/// Sensor subgroup reported by every EE871.
pub const SENSOR_SUBGROUP_ID: u8 = 0x09;
/// `MAIN_AVAIL_MEAS` bit announcing CO2.
pub const AVAILABLE_MEAS_CO2: u8 = 0x08;

// ----------------------------------------------------------------------
// Custom memory map (0x00..0xFF)
// ----------------------------------------------------------------------

/// Size of the custom memory map.
pub const CUSTOM_MEMORY_SIZE: u16 = 256;

pub const CUSTOM_FW_VERSION_MAIN: u8 = 0x00;
pub const CUSTOM_FW_VERSION_SUB: u8 = 0x01;
pub const CUSTOM_E2_SPEC_VERSION: u8 = 0x02;

pub const CUSTOM_OPERATING_FUNCTIONS: u8 = 0x07;
pub const CUSTOM_OPERATING_MODE_SUPPORT: u8 = 0x08;
pub const CUSTOM_SPECIAL_FEATURES: u8 = 0x09;

pub const CUSTOM_CO2_OFFSET_L: u8 = 0x58;
pub const CUSTOM_CO2_OFFSET_H: u8 = 0x59;
pub const CUSTOM_CO2_GAIN_L: u8 = 0x5A;
pub const CUSTOM_CO2_GAIN_H: u8 = 0x5B;
pub const CUSTOM_CO2_POINT_LOWER_L: u8 = 0x5C;
pub const CUSTOM_CO2_POINT_LOWER_H: u8 = 0x5D;
pub const CUSTOM_CO2_POINT_UPPER_L: u8 = 0x5E;
pub const CUSTOM_CO2_POINT_UPPER_H: u8 = 0x5F;

pub const CUSTOM_SERIAL_START: u8 = 0xA0;
pub const CUSTOM_PART_NAME_START: u8 = 0xB0;
/// Length of the serial number and part name strings.
pub const IDENTITY_STRING_LEN: usize = 16;

pub const CUSTOM_BUS_ADDRESS: u8 = 0xC0;
pub const CUSTOM_ERROR_CODE: u8 = 0xC1;

pub const CUSTOM_INTERVAL_L: u8 = 0xC6;
pub const CUSTOM_INTERVAL_H: u8 = 0xC7;
pub const CUSTOM_CO2_INTERVAL_FACTOR: u8 = 0xCB;

pub const CUSTOM_FILTER_CO2: u8 = 0xD3;
pub const CUSTOM_OPERATING_MODE: u8 = 0xD8;
pub const CUSTOM_AUTO_ADJUST: u8 = 0xD9;

// ----------------------------------------------------------------------
// Limits
// ----------------------------------------------------------------------

/// Shortest global measurement interval (15.0 s) in deciseconds.
pub const INTERVAL_MIN_DECISEC: u16 = 150;
/// Longest global measurement interval (3600.0 s) in deciseconds.
pub const INTERVAL_MAX_DECISEC: u16 = 36_000;
/// Only bits 0 and 1 of `CUSTOM_OPERATING_MODE` are defined.
pub const OPERATING_MODE_MAX: u8 = 0x03;
/// Clock pulses with data released needed to reset the slave state machine.
pub const BUS_RESET_CLOCKS: u8 = 9;
/// Value written to `CUSTOM_AUTO_ADJUST` to start an adjustment.
pub const AUTO_ADJUST_START: u8 = 0x01;

/// Access permissions encoded for each register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterAccess {
    /// Read-only register.
    ReadOnly,
    /// Read/write register.
    ReadWrite,
}

/// Metadata for bitfield registers living in the custom memory map.
pub trait Register {
    /// Custom memory address.
    const ADDRESS: u8;
    /// Access permission classification.
    const ACCESS: RegisterAccess;
}

/// Operating functions bitfield (custom `0x07`).
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingFunctions {
    // Serial number readable at 0xA0 (bit 0).
    pub serial_number: bool,
    // Part name readable and writable at 0xB0 (bit 1).
    pub part_name: bool,
    // Bus address configurable at 0xC0 (bit 2).
    pub address_config: bool,
    #[skip]
    __: B1,
    // Global measurement interval configurable (bit 4).
    pub global_interval: bool,
    // Measurand-specific interval factor configurable (bit 5).
    pub specific_interval: bool,
    // CO2 filter configurable (bit 6).
    pub filter_config: bool,
    // Error code register available (bit 7).
    pub error_code: bool,
}

/// Operating mode support bitfield (custom `0x08`).
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingModeSupport {
    // Low power measure mode available (bit 0).
    pub low_power: bool,
    // E2 priority available (bit 1).
    pub e2_priority: bool,
    #[skip]
    __: B6,
}

/// Special features bitfield (custom `0x09`).
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialFeatures {
    // Automatic CO2 adjustment available (bit 0).
    pub auto_adjust: bool,
    #[skip]
    __: B7,
}

/// Operating mode register (custom `0xD8`).
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingMode {
    // Free-running or low power measuring (bit 0).
    pub measure_mode: MeasureMode,
    // Whether measurement or bus traffic wins (bit 1).
    pub priority: BusPriority,
    #[skip]
    __: B6,
}

/// Auto adjustment register (custom `0xD9`).
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoAdjust {
    // Adjustment in progress (bit 0).
    pub running: bool,
    #[skip]
    __: B7,
}

/// Status byte (main command `0x7`).
#[allow(unused_parens)]
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorStatus {
    #[skip]
    __: B3,
    // CO2 measurement error; details in the error code register (bit 3).
    pub co2_error: bool,
    #[skip]
    __: B4,
}

macro_rules! byte_register {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl From<u8> for $ty {
                fn from(value: u8) -> Self {
                    Self::from_bytes([value])
                }
            }

            impl From<$ty> for u8 {
                fn from(value: $ty) -> Self {
                    value.into_bytes()[0]
                }
            }
        )+
    };
}

byte_register!(
    OperatingFunctions,
    OperatingModeSupport,
    SpecialFeatures,
    OperatingMode,
    AutoAdjust,
    SensorStatus,
);

impl Register for OperatingFunctions {
    const ADDRESS: u8 = CUSTOM_OPERATING_FUNCTIONS;
    const ACCESS: RegisterAccess = RegisterAccess::ReadOnly;
}

impl Register for OperatingModeSupport {
    const ADDRESS: u8 = CUSTOM_OPERATING_MODE_SUPPORT;
    const ACCESS: RegisterAccess = RegisterAccess::ReadOnly;
}

impl Register for SpecialFeatures {
    const ADDRESS: u8 = CUSTOM_SPECIAL_FEATURES;
    const ACCESS: RegisterAccess = RegisterAccess::ReadOnly;
}

impl Register for OperatingMode {
    const ADDRESS: u8 = CUSTOM_OPERATING_MODE;
    const ACCESS: RegisterAccess = RegisterAccess::ReadWrite;
}

impl Register for AutoAdjust {
    const ADDRESS: u8 = CUSTOM_AUTO_ADJUST;
    const ACCESS: RegisterAccess = RegisterAccess::ReadWrite;
}
