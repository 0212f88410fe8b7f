//! High-level EE871 device driver implementation.

use crate::config::{Config, ConfigError};
use crate::error::{Error, ErrorKind, Result};
use crate::framing::Framer;
use crate::health::{DriverState, Health};
use crate::interface::pins::PinBus;
use crate::interface::E2Bus;
use crate::log;
use crate::registers::{
    control_read,
    control_write,
    OperatingFunctions,
    OperatingModeSupport,
    SpecialFeatures,
    CUSTOM_INTERVAL_H,
    CUSTOM_INTERVAL_L,
    CUSTOM_MEMORY_SIZE,
    CUSTOM_OPERATING_FUNCTIONS,
    MAIN_COMMAND_MAX,
    MAIN_CUSTOM_PTR,
    MAIN_CUSTOM_WRITE,
    MAIN_TYPE_HI,
    MAIN_TYPE_LO,
    SENSOR_GROUP_ID,
};
use crate::transaction;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

/// Feature bitfields read once during [`Ee871::begin`].
///
/// Cleared bits disable the matching write operations (and a few reads) for
/// the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Custom `0x07`.
    pub operating_functions: OperatingFunctions,
    /// Custom `0x08`.
    pub operating_mode_support: OperatingModeSupport,
    /// Custom `0x09`.
    pub special_features: SpecialFeatures,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            operating_functions: OperatingFunctions::new(),
            operating_mode_support: OperatingModeSupport::new(),
            special_features: SpecialFeatures::new(),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Capabilities {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Capabilities {{ functions: {=u8:#x}, modes: {=u8:#x}, special: {=u8:#x} }}",
            u8::from(self.operating_functions),
            u8::from(self.operating_mode_support),
            u8::from(self.special_features)
        );
    }
}

/// Synchronous driver for one EE871 sensor on a bit-banged E2 bus.
pub struct Ee871<B> {
    bus: B,
    config: Config,
    initialized: bool,
    state: DriverState,
    now_ms: u32,
    health: Health,
    capabilities: Capabilities,
}

impl<B> Ee871<B> {
    // ==================================================================
    // == Driver Construction & Ownership ===============================
    // ==================================================================
    /// Creates an uninitialized driver around the provided transport.
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            config: Config::default(),
            initialized: false,
            state: DriverState::Uninitialized,
            now_ms: 0,
            health: Health::default(),
            capabilities: Capabilities::default(),
        }
    }

    /// Consumes the driver and returns the transport and last configuration.
    pub fn release(self) -> (B, Config) {
        (self.bus, self.config)
    }

    /// Provides mutable access to the underlying transport.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Returns the configuration accepted by the last `begin()`.
    pub fn config(&self) -> &Config {
        &self.config
    }

    // ==================================================================
    // == State & Health ================================================
    // ==================================================================
    /// Current driver state.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// `true` while the driver is `Ready` or `Degraded`.
    pub fn is_online(&self) -> bool {
        matches!(self.state, DriverState::Ready | DriverState::Degraded)
    }

    /// Snapshot of the health counters.
    pub fn health(&self) -> &Health {
        &self.health
    }

    /// Timestamp of the last successful tracked operation.
    pub fn last_ok_ms(&self) -> u32 {
        self.health.last_ok_ms
    }

    /// Timestamp of the last failed tracked operation.
    pub fn last_error_ms(&self) -> u32 {
        self.health.last_error_ms
    }

    /// Most recent tracked failure.
    pub fn last_error(&self) -> Option<Error> {
        self.health.last_error
    }

    /// Failures since the last tracked success.
    pub fn consecutive_failures(&self) -> u8 {
        self.health.consecutive_failures
    }

    /// Lifetime tracked failures.
    pub fn total_failures(&self) -> u32 {
        self.health.total_failures
    }

    /// Lifetime tracked successes.
    pub fn total_success(&self) -> u32 {
        self.health.total_success
    }

    /// Feature bitfields cached by `begin()`.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Updates the clock used to timestamp health events.
    pub fn tick(&mut self, now_ms: u32) {
        self.now_ms = now_ms;
    }

    /// Returns the driver to `Uninitialized` and forgets cached capabilities.
    pub fn end(&mut self) {
        self.initialized = false;
        self.state = DriverState::Uninitialized;
        self.capabilities = Capabilities::default();
    }

    pub(crate) fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::not_initialized())
        }
    }
}

impl<SCL, SDA, D> Ee871<PinBus<SCL, SDA, D>>
where
    SCL: OutputPin + InputPin,
    SDA: OutputPin + InputPin,
    D: DelayNs,
{
    // ==================================================================
    // == GPIO Convenience Constructors =================================
    // ==================================================================
    /// Convenience constructor for open-drain `embedded-hal` pins.
    pub fn new_pins(scl: SCL, sda: SDA, delay: D) -> Self {
        Self::new(PinBus::new(scl, sda, delay))
    }

    /// Releases the driver, returning the pins, delay and configuration.
    pub fn release_pins(self) -> (SCL, SDA, D, Config) {
        let (bus, config) = self.release();
        let (scl, sda, delay) = bus.release();
        (scl, sda, delay, config)
    }
}

impl<B> Ee871<B>
where
    B: E2Bus,
{
    // ==================================================================
    // == Lifecycle =====================================================
    // ==================================================================
    /// Validates `config`, checks the bus, identifies the sensor and caches
    /// its capabilities.
    ///
    /// A stuck bus gets one recovery attempt before `BusStuck` is returned.
    /// Capability discovery is best effort: if it fails every optional
    /// feature is treated as unsupported.
    pub fn begin(&mut self, config: Config) -> Result<()> {
        if self.initialized {
            return Err(Error::new(ErrorKind::AlreadyInitialized, "Call end() first"));
        }
        if !self.bus.is_bound() {
            return Err(ConfigError::MissingCallbacks.into());
        }
        config.validate()?;

        self.config = config;
        self.state = DriverState::Uninitialized;
        self.now_ms = 0;
        self.health = Health::default();
        self.capabilities = Capabilities::default();

        if !self.framer().is_idle() {
            log::warn!("ee871: bus not idle at begin");
            self.framer().recover()?;
        }

        self.identify()?;

        match self.read_capabilities() {
            Ok(capabilities) => self.capabilities = capabilities,
            Err(_err) => {
                log::warn!("ee871: capability read failed: {}", _err);
            }
        }

        self.initialized = true;
        self.state = DriverState::Ready;
        log::debug!("ee871: ready at address {=u8}", self.config.device_address);
        Ok(())
    }

    /// Checks that the sensor answers with its group id. Health is not updated.
    pub fn probe(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.identify()
    }

    /// Resets the bus and re-reads the group id.
    ///
    /// The reset outcome is ignored; the tracked identity read decides the
    /// result and moves the driver back to `Ready` on success.
    pub fn recover(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        let _ = self.bus_reset();
        self.read_group().map(|_| ())
    }

    // ==================================================================
    // == E2 Protocol Primitives ========================================
    // ==================================================================
    /// Reads the main command register selected by `main_command` (0x0-0xF).
    pub fn read_control_byte(&mut self, main_command: u8) -> Result<u8> {
        self.ensure_initialized()?;
        if main_command > MAIN_COMMAND_MAX {
            return Err(Error::with_detail(
                ErrorKind::InvalidParam,
                "Invalid main command",
                i32::from(main_command),
            ));
        }
        let control = control_read(main_command, self.config.device_address);
        self.read_control_tracked(control)
    }

    /// Reads two main command registers as a little-endian `u16`.
    pub fn read_u16(&mut self, main_low: u8, main_high: u8) -> Result<u16> {
        let low = self.read_control_byte(main_low)?;
        let high = self.read_control_byte(main_high)?;
        Ok(u16::from_le_bytes([low, high]))
    }

    /// Moves the device's custom memory cursor to `address`.
    pub fn set_custom_pointer(&mut self, address: u16) -> Result<()> {
        self.ensure_initialized()?;
        if address >= CUSTOM_MEMORY_SIZE {
            return Err(Error::with_detail(
                ErrorKind::OutOfRange,
                "Custom pointer > 0xFF",
                i32::from(address),
            ));
        }
        let control = control_write(MAIN_CUSTOM_PTR, self.config.device_address);
        let [high, low] = address.to_be_bytes();
        self.write_command_tracked(control, high, low)
    }

    /// Reads one custom memory byte.
    pub fn custom_read(&mut self, address: u8) -> Result<u8> {
        let mut value = [0u8; 1];
        self.custom_read_into(address, &mut value)?;
        Ok(value[0])
    }

    /// Reads `buf.len()` consecutive custom memory bytes starting at `address`.
    pub fn custom_read_into(&mut self, address: u8, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Err(Error::new(ErrorKind::InvalidParam, "Invalid buffer"));
        }
        let available = usize::from(CUSTOM_MEMORY_SIZE) - usize::from(address);
        if buf.len() > available {
            return Err(Error::new(
                ErrorKind::OutOfRange,
                "Read exceeds custom memory map",
            ));
        }
        self.set_custom_pointer(u16::from(address))?;

        for byte in buf.iter_mut() {
            *byte = self.read_control_byte(MAIN_CUSTOM_PTR)?;
        }
        Ok(())
    }

    /// Writes one custom memory byte, waits for the flash write and verifies it.
    ///
    /// The measurement interval bytes (`0xC6`/`0xC7`) are always written as a
    /// pair through [`write_measurement_interval`](Self::write_measurement_interval).
    pub fn custom_write(&mut self, address: u8, value: u8) -> Result<()> {
        self.ensure_initialized()?;
        if address == CUSTOM_INTERVAL_L || address == CUSTOM_INTERVAL_H {
            let partner = if address == CUSTOM_INTERVAL_L {
                CUSTOM_INTERVAL_H
            } else {
                CUSTOM_INTERVAL_L
            };
            let other = self.custom_read(partner)?;
            let interval = if address == CUSTOM_INTERVAL_L {
                u16::from_le_bytes([value, other])
            } else {
                u16::from_le_bytes([other, value])
            };
            return self.write_measurement_interval(interval);
        }

        let control = control_write(MAIN_CUSTOM_WRITE, self.config.device_address);
        self.write_command_tracked(control, address, value)?;

        self.bus.delay_ms(self.config.write_delay_ms);

        let verify = self.custom_read(address)?;
        if verify != value {
            log::warn!("ee871: verify failed at {=u8:#x}", address);
            return Err(Error::with_detail(
                ErrorKind::BusError,
                "Write verify failed",
                i32::from(verify),
            ));
        }
        Ok(())
    }

    /// Writes both bytes of a 16-bit register pair, waits once, then verifies
    /// the combined value.
    pub(crate) fn write_u16_pair(&mut self, low_address: u8, high_address: u8, value: u16) -> Result<()> {
        let control = control_write(MAIN_CUSTOM_WRITE, self.config.device_address);
        let [low, high] = value.to_le_bytes();

        self.write_command_tracked(control, low_address, low)?;
        self.write_command_tracked(control, high_address, high)?;

        self.bus.delay_ms(self.config.interval_write_delay_ms);

        let verify_low = self.custom_read(low_address)?;
        let verify_high = self.custom_read(high_address)?;
        let verify = u16::from_le_bytes([verify_low, verify_high]);
        if verify != value {
            log::warn!("ee871: pair verify failed {=u16} != {=u16}", verify, value);
            return Err(Error::with_detail(
                ErrorKind::BusError,
                "Interval verify failed",
                i32::from(verify),
            ));
        }
        Ok(())
    }

    // ==================================================================
    // == Bus Safety ====================================================
    // ==================================================================
    /// Clocks the bus free after a timeout or aborted transaction.
    pub fn bus_reset(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.framer().recover()
    }

    /// Succeeds when both lines are high; otherwise names the stuck line.
    pub fn check_bus_idle(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.framer().check_idle()
    }

    // ==================================================================
    // == Internal Helpers ==============================================
    // ==================================================================
    fn framer(&mut self) -> Framer<'_, B> {
        Framer::new(&mut self.bus, &self.config)
    }

    fn read_control_raw(&mut self, control: u8) -> Result<u8> {
        transaction::read_control_byte(&mut self.bus, &self.config, control)
    }

    fn write_command_raw(&mut self, control: u8, address: u8, data: u8) -> Result<()> {
        transaction::write_command(&mut self.bus, &self.config, control, address, data)
    }

    fn read_control_tracked(&mut self, control: u8) -> Result<u8> {
        let result = self.read_control_raw(control);
        self.update_health(result)
    }

    fn write_command_tracked(&mut self, control: u8, address: u8, data: u8) -> Result<()> {
        let result = self.write_command_raw(control, address, data);
        self.update_health(result)
    }

    fn update_health<T>(&mut self, result: Result<T>) -> Result<T> {
        if !self.initialized {
            return result;
        }

        self.health.record(&result, self.now_ms);
        let state = self.health.state(self.config.offline_threshold);
        if state != self.state {
            if state == DriverState::Ready {
                log::debug!("ee871: back online");
            } else {
                log::warn!(
                    "ee871: {} after {=u8} consecutive failures",
                    state,
                    self.health.consecutive_failures
                );
            }
        }
        self.state = state;
        result
    }

    /// Untracked group id check shared by `begin()` and `probe()`.
    fn identify(&mut self) -> Result<()> {
        let address = self.config.device_address;
        let low = self.read_control_raw(control_read(MAIN_TYPE_LO, address))?;
        let high = self.read_control_raw(control_read(MAIN_TYPE_HI, address))?;
        let group = u16::from_le_bytes([low, high]);
        if group != SENSOR_GROUP_ID {
            return Err(Error::with_detail(
                ErrorKind::DeviceNotFound,
                "Unexpected group id",
                i32::from(group),
            ));
        }
        Ok(())
    }

    /// Untracked pointer read of the three consecutive feature bytes.
    fn read_capabilities(&mut self) -> Result<Capabilities> {
        let address = self.config.device_address;
        self.write_command_raw(
            control_write(MAIN_CUSTOM_PTR, address),
            0x00,
            CUSTOM_OPERATING_FUNCTIONS,
        )?;
        let read = control_read(MAIN_CUSTOM_PTR, address);
        let functions = self.read_control_raw(read)?;
        let modes = self.read_control_raw(read)?;
        let special = self.read_control_raw(read)?;
        Ok(Capabilities {
            operating_functions: OperatingFunctions::from(functions),
            operating_mode_support: OperatingModeSupport::from(modes),
            special_features: SpecialFeatures::from(special),
        })
    }
}
