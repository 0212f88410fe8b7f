//! Typed EE871 register commands layered on the E2 primitives.
//!
//! Writes that depend on an optional device feature check the capability
//! bits cached by `begin()` before validating arguments, and both checks run
//! before any bus traffic.

use crate::device::Ee871;
use crate::error::{Error, ErrorKind, Result};
use crate::interface::E2Bus;
use crate::params::{BusPriority, IntervalFactor, MeasureMode};
use crate::registers::{
    AutoAdjust,
    AUTO_ADJUST_START,
    OperatingFunctions,
    OperatingMode,
    OperatingModeSupport,
    Register,
    RegisterAccess,
    SensorStatus,
    SpecialFeatures,
    CUSTOM_BUS_ADDRESS,
    CUSTOM_CO2_GAIN_H,
    CUSTOM_CO2_GAIN_L,
    CUSTOM_CO2_INTERVAL_FACTOR,
    CUSTOM_CO2_OFFSET_H,
    CUSTOM_CO2_OFFSET_L,
    CUSTOM_CO2_POINT_LOWER_L,
    CUSTOM_E2_SPEC_VERSION,
    CUSTOM_ERROR_CODE,
    CUSTOM_FILTER_CO2,
    CUSTOM_FW_VERSION_MAIN,
    CUSTOM_INTERVAL_H,
    CUSTOM_INTERVAL_L,
    CUSTOM_PART_NAME_START,
    CUSTOM_SERIAL_START,
    DEVICE_ADDRESS_MAX,
    IDENTITY_STRING_LEN,
    INTERVAL_MAX_DECISEC,
    INTERVAL_MIN_DECISEC,
    MAIN_AVAIL_MEAS,
    MAIN_MV3_HI,
    MAIN_MV3_LO,
    MAIN_MV4_HI,
    MAIN_MV4_LO,
    MAIN_STATUS,
    MAIN_TYPE_HI,
    MAIN_TYPE_LO,
    MAIN_TYPE_SUB,
    OPERATING_MODE_MAX,
    SENSOR_GROUP_ID,
    SENSOR_SUBGROUP_ID,
};

/// Firmware release reported in custom `0x00`/`0x01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareVersion {
    /// Major release.
    pub main: u8,
    /// Minor release.
    pub sub: u8,
}

/// CO2 adjustment points (ppm) stored at custom `0x5C..0x5F`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationPoints {
    /// Lower adjustment point.
    pub lower: u16,
    /// Upper adjustment point.
    pub upper: u16,
}

impl<B> Ee871<B>
where
    B: E2Bus,
{
    // ==================================================================
    // == Capability Queries ============================================
    // ==================================================================
    /// Serial number readable.
    pub fn has_serial_number(&self) -> bool {
        self.capabilities().operating_functions.serial_number()
    }

    /// Part name readable and writable.
    pub fn has_part_name(&self) -> bool {
        self.capabilities().operating_functions.part_name()
    }

    /// Bus address writable.
    pub fn has_address_config(&self) -> bool {
        self.capabilities().operating_functions.address_config()
    }

    /// Global measurement interval writable.
    pub fn has_global_interval(&self) -> bool {
        self.capabilities().operating_functions.global_interval()
    }

    /// CO2 interval factor writable.
    pub fn has_specific_interval(&self) -> bool {
        self.capabilities().operating_functions.specific_interval()
    }

    /// CO2 filter writable.
    pub fn has_filter_config(&self) -> bool {
        self.capabilities().operating_functions.filter_config()
    }

    /// Error code register present.
    pub fn has_error_code(&self) -> bool {
        self.capabilities().operating_functions.error_code()
    }

    /// Low power measure mode selectable.
    pub fn has_low_power_mode(&self) -> bool {
        self.capabilities().operating_mode_support.low_power()
    }

    /// E2 bus priority selectable.
    pub fn has_e2_priority(&self) -> bool {
        self.capabilities().operating_mode_support.e2_priority()
    }

    /// Automatic CO2 adjustment available.
    pub fn has_auto_adjust(&self) -> bool {
        self.capabilities().special_features.auto_adjust()
    }

    // ==================================================================
    // == Identification ================================================
    // ==================================================================
    /// Reads the sensor group id; anything but `0x0367` is `DeviceNotFound`.
    pub fn read_group(&mut self) -> Result<u16> {
        let group = self.read_u16(MAIN_TYPE_LO, MAIN_TYPE_HI)?;
        if group != SENSOR_GROUP_ID {
            return Err(Error::with_detail(
                ErrorKind::DeviceNotFound,
                "Unexpected group id",
                i32::from(group),
            ));
        }
        Ok(group)
    }

    /// Reads the sensor subgroup id; anything but `0x09` is `DeviceNotFound`.
    pub fn read_subgroup(&mut self) -> Result<u8> {
        let subgroup = self.read_control_byte(MAIN_TYPE_SUB)?;
        if subgroup != SENSOR_SUBGROUP_ID {
            return Err(Error::with_detail(
                ErrorKind::DeviceNotFound,
                "Unexpected subgroup id",
                i32::from(subgroup),
            ));
        }
        Ok(subgroup)
    }

    /// Bitfield of physical quantities the sensor measures.
    pub fn read_available_measurements(&mut self) -> Result<u8> {
        self.read_control_byte(MAIN_AVAIL_MEAS)
    }

    /// Reads the firmware main and sub release.
    pub fn read_firmware_version(&mut self) -> Result<FirmwareVersion> {
        let mut raw = [0u8; 2];
        self.custom_read_into(CUSTOM_FW_VERSION_MAIN, &mut raw)?;
        Ok(FirmwareVersion {
            main: raw[0],
            sub: raw[1],
        })
    }

    /// Reads the E2 protocol revision implemented by the device.
    pub fn read_e2_spec_version(&mut self) -> Result<u8> {
        self.custom_read(CUSTOM_E2_SPEC_VERSION)
    }

    /// Reads the operating functions bitfield from the device (not the cache).
    pub fn read_operating_functions(&mut self) -> Result<OperatingFunctions> {
        self.read_register()
    }

    /// Reads the operating mode support bitfield from the device.
    pub fn read_operating_mode_support(&mut self) -> Result<OperatingModeSupport> {
        self.read_register()
    }

    /// Reads the special features bitfield from the device.
    pub fn read_special_features(&mut self) -> Result<SpecialFeatures> {
        self.read_register()
    }

    /// Reads the 16-byte serial number.
    pub fn read_serial_number(&mut self) -> Result<[u8; IDENTITY_STRING_LEN]> {
        self.require(self.has_serial_number(), "Serial number not supported")?;
        let mut serial = [0u8; IDENTITY_STRING_LEN];
        self.custom_read_into(CUSTOM_SERIAL_START, &mut serial)?;
        Ok(serial)
    }

    /// Reads the 16-byte user part name.
    pub fn read_part_name(&mut self) -> Result<[u8; IDENTITY_STRING_LEN]> {
        self.require(self.has_part_name(), "Part name not supported")?;
        let mut name = [0u8; IDENTITY_STRING_LEN];
        self.custom_read_into(CUSTOM_PART_NAME_START, &mut name)?;
        Ok(name)
    }

    /// Writes the user part name byte by byte, verifying each write.
    pub fn write_part_name(&mut self, name: &[u8; IDENTITY_STRING_LEN]) -> Result<()> {
        self.require(self.has_part_name(), "Part name not supported")?;
        for (address, &byte) in (CUSTOM_PART_NAME_START..).zip(name.iter()) {
            self.custom_write(address, byte)?;
        }
        Ok(())
    }

    // ==================================================================
    // == Configuration =================================================
    // ==================================================================
    /// Reads the stored E2 bus address.
    pub fn read_bus_address(&mut self) -> Result<u8> {
        self.custom_read(CUSTOM_BUS_ADDRESS)
    }

    /// Stores a new E2 address (0-7). The device answers on it after a
    /// power cycle.
    pub fn write_bus_address(&mut self, address: u8) -> Result<()> {
        self.require(self.has_address_config(), "Address config not supported")?;
        if address > DEVICE_ADDRESS_MAX {
            return Err(Error::with_detail(
                ErrorKind::OutOfRange,
                "Address must be 0-7",
                i32::from(address),
            ));
        }
        self.custom_write(CUSTOM_BUS_ADDRESS, address)
    }

    /// Global measurement interval in deciseconds.
    pub fn read_measurement_interval(&mut self) -> Result<u16> {
        let mut raw = [0u8; 2];
        self.custom_read_into(CUSTOM_INTERVAL_L, &mut raw)?;
        Ok(u16::from_le_bytes(raw))
    }

    /// Sets the global measurement interval (150-36000 deciseconds).
    pub fn write_measurement_interval(&mut self, deciseconds: u16) -> Result<()> {
        self.require(self.has_global_interval(), "Global interval not supported")?;
        if !(INTERVAL_MIN_DECISEC..=INTERVAL_MAX_DECISEC).contains(&deciseconds) {
            return Err(Error::with_detail(
                ErrorKind::OutOfRange,
                "Interval must be 150-36000 (15-3600s)",
                i32::from(deciseconds),
            ));
        }
        self.write_u16_pair(CUSTOM_INTERVAL_L, CUSTOM_INTERVAL_H, deciseconds)
    }

    /// Raw CO2 interval factor; see [`IntervalFactor`] for its meaning.
    pub fn read_co2_interval_factor(&mut self) -> Result<i8> {
        self.custom_read(CUSTOM_CO2_INTERVAL_FACTOR)
            .map(|raw| i8::from_le_bytes([raw]))
    }

    /// CO2 interval factor decoded relative to the global interval.
    pub fn read_co2_interval(&mut self) -> Result<IntervalFactor> {
        self.read_co2_interval_factor().map(IntervalFactor::from)
    }

    /// Writes the raw CO2 interval factor.
    pub fn write_co2_interval_factor(&mut self, factor: i8) -> Result<()> {
        self.require(self.has_specific_interval(), "Specific interval not supported")?;
        let [raw] = factor.to_le_bytes();
        self.custom_write(CUSTOM_CO2_INTERVAL_FACTOR, raw)
    }

    /// Reads the CO2 filter setting.
    pub fn read_co2_filter(&mut self) -> Result<u8> {
        self.custom_read(CUSTOM_FILTER_CO2)
    }

    /// Writes the CO2 filter setting.
    pub fn write_co2_filter(&mut self, filter: u8) -> Result<()> {
        self.require(self.has_filter_config(), "Filter config not supported")?;
        self.custom_write(CUSTOM_FILTER_CO2, filter)
    }

    /// Reads the measure mode and bus priority.
    pub fn read_operating_mode(&mut self) -> Result<OperatingMode> {
        self.read_register()
    }

    /// Writes the raw operating mode byte.
    ///
    /// Each set bit must be supported by the device; bits above 1 are
    /// rejected with `OutOfRange`.
    pub fn write_operating_mode(&mut self, mode: u8) -> Result<()> {
        let requested = OperatingMode::from(mode);
        self.require(
            requested.measure_mode() == MeasureMode::Freerunning || self.has_low_power_mode(),
            "Low power mode not supported",
        )?;
        self.require(
            requested.priority() == BusPriority::Measurement || self.has_e2_priority(),
            "E2 priority not supported",
        )?;
        if mode > OPERATING_MODE_MAX {
            return Err(Error::with_detail(
                ErrorKind::OutOfRange,
                "Invalid mode bits",
                i32::from(mode),
            ));
        }
        self.write_register(requested)
    }

    /// `true` while an automatic CO2 adjustment runs.
    pub fn read_auto_adjust_status(&mut self) -> Result<bool> {
        self.read_register::<AutoAdjust>().map(|reg| reg.running())
    }

    /// Starts an automatic CO2 adjustment. It cannot be cancelled.
    pub fn start_auto_adjust(&mut self) -> Result<()> {
        self.require(self.has_auto_adjust(), "Auto adjust not supported")?;
        self.write_register(AutoAdjust::from(AUTO_ADJUST_START))
    }

    // ==================================================================
    // == Calibration ===================================================
    // ==================================================================
    /// CO2 offset in ppm.
    pub fn read_co2_offset(&mut self) -> Result<i16> {
        let mut raw = [0u8; 2];
        self.custom_read_into(CUSTOM_CO2_OFFSET_L, &mut raw)?;
        Ok(i16::from_le_bytes(raw))
    }

    /// Writes the CO2 offset in ppm, low byte first.
    pub fn write_co2_offset(&mut self, offset: i16) -> Result<()> {
        let [low, high] = offset.to_le_bytes();
        self.custom_write(CUSTOM_CO2_OFFSET_L, low)?;
        self.custom_write(CUSTOM_CO2_OFFSET_H, high)
    }

    /// CO2 gain, scaled by 32768.
    pub fn read_co2_gain(&mut self) -> Result<u16> {
        let mut raw = [0u8; 2];
        self.custom_read_into(CUSTOM_CO2_GAIN_L, &mut raw)?;
        Ok(u16::from_le_bytes(raw))
    }

    /// Writes the CO2 gain, low byte first.
    pub fn write_co2_gain(&mut self, gain: u16) -> Result<()> {
        let [low, high] = gain.to_le_bytes();
        self.custom_write(CUSTOM_CO2_GAIN_L, low)?;
        self.custom_write(CUSTOM_CO2_GAIN_H, high)
    }

    /// Reads the lower and upper CO2 adjustment points.
    pub fn read_co2_cal_points(&mut self) -> Result<CalibrationPoints> {
        let mut raw = [0u8; 4];
        self.custom_read_into(CUSTOM_CO2_POINT_LOWER_L, &mut raw)?;
        Ok(CalibrationPoints {
            lower: u16::from_le_bytes([raw[0], raw[1]]),
            upper: u16::from_le_bytes([raw[2], raw[3]]),
        })
    }

    // ==================================================================
    // == Measurement ===================================================
    // ==================================================================
    /// Reads the status byte. In low power mode this also triggers a
    /// measurement.
    pub fn read_status(&mut self) -> Result<SensorStatus> {
        self.read_control_byte(MAIN_STATUS).map(SensorStatus::from)
    }

    /// Reads the device error code behind a CO2 error status.
    pub fn read_error_code(&mut self) -> Result<u8> {
        self.require(self.has_error_code(), "Error code not supported")?;
        self.custom_read(CUSTOM_ERROR_CODE)
    }

    /// CO2 fast response value in ppm.
    pub fn read_co2_fast(&mut self) -> Result<u16> {
        self.read_u16(MAIN_MV3_LO, MAIN_MV3_HI)
    }

    /// CO2 averaged value in ppm.
    pub fn read_co2_average(&mut self) -> Result<u16> {
        self.read_u16(MAIN_MV4_LO, MAIN_MV4_HI)
    }

    // ==================================================================
    // == Internal Helpers ==============================================
    // ==================================================================
    fn require(&self, supported: bool, message: &'static str) -> Result<()> {
        self.ensure_initialized()?;
        if supported {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::NotSupported, message))
        }
    }

    fn read_register<R>(&mut self) -> Result<R>
    where
        R: Register + From<u8>,
    {
        self.custom_read(R::ADDRESS).map(R::from)
    }

    fn write_register<R>(&mut self, value: R) -> Result<()>
    where
        R: Register,
        u8: From<R>,
    {
        if R::ACCESS == RegisterAccess::ReadOnly {
            return Err(Error::new(ErrorKind::InvalidParam, "Register is read-only"));
        }
        self.custom_write(R::ADDRESS, u8::from(value))
    }
}
