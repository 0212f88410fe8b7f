//! Configuration primitives for the EE871 driver.

use crate::registers::DEVICE_ADDRESS_MAX;

/// Shortest clock low/high time allowed by the E2 bus specification (µs).
pub const CLOCK_MIN_US: u16 = 100;
/// Shortest START/STOP hold time allowed by the E2 bus specification (µs).
pub const HOLD_MIN_US: u16 = 4;
/// Upper bound for the single register write settle delay (ms).
pub const WRITE_DELAY_MAX_MS: u32 = 1_000;
/// Upper bound for the measurement interval pair write settle delay (ms).
pub const INTERVAL_WRITE_DELAY_MAX_MS: u32 = 2_000;

/// Bus timing, timeout and health settings for the EE871 driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// E2 device address (0-7).
    pub device_address: u8,
    /// Minimum clock low time in microseconds.
    pub clock_low_us: u16,
    /// Minimum clock high time in microseconds.
    pub clock_high_us: u16,
    /// START hold time in microseconds.
    pub start_hold_us: u16,
    /// STOP hold time in microseconds.
    pub stop_hold_us: u16,
    /// Clock-stretch timeout per bit in microseconds.
    pub bit_timeout_us: u32,
    /// Clock-stretch timeout per byte in microseconds.
    pub byte_timeout_us: u32,
    /// Settle delay after a custom memory write, in milliseconds.
    pub write_delay_ms: u32,
    /// Settle delay after writing the measurement interval pair, in milliseconds.
    pub interval_write_delay_ms: u32,
    /// Consecutive failures before the driver reports `Offline`.
    pub offline_threshold: u8,
}

impl Config {
    /// Begins building a [`Config`] using the builder pattern.
    pub fn new() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Checks every field against the E2 bus limits and driver safety bounds.
    pub fn validate(&self) -> core::result::Result<(), ConfigError> {
        if self.device_address > DEVICE_ADDRESS_MAX {
            return Err(ConfigError::DeviceAddress);
        }
        if self.clock_low_us < CLOCK_MIN_US || self.clock_high_us < CLOCK_MIN_US {
            return Err(ConfigError::ClockTiming);
        }
        if self.start_hold_us < HOLD_MIN_US || self.stop_hold_us < HOLD_MIN_US {
            return Err(ConfigError::HoldTiming);
        }
        if self.bit_timeout_us == 0 || self.byte_timeout_us == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.byte_timeout_us < self.bit_timeout_us {
            return Err(ConfigError::ByteTimeoutBelowBit);
        }
        if self.offline_threshold == 0 {
            return Err(ConfigError::ZeroOfflineThreshold);
        }
        if self.write_delay_ms > WRITE_DELAY_MAX_MS {
            return Err(ConfigError::WriteDelay);
        }
        if self.interval_write_delay_ms > INTERVAL_WRITE_DELAY_MAX_MS {
            return Err(ConfigError::IntervalWriteDelay);
        }

        Ok(())
    }
}

/// Builder for [`Config`] allowing piecemeal construction.
#[derive(Debug, Clone, Copy)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a new builder seeded with [`Config::default()`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Sets the E2 device address.
    pub fn device_address(mut self, address: u8) -> Self {
        self.config.device_address = address;
        self
    }

    /// Sets the clock low and high times.
    pub fn clock_us(mut self, low: u16, high: u16) -> Self {
        self.config.clock_low_us = low;
        self.config.clock_high_us = high;
        self
    }

    /// Sets the START and STOP hold times.
    pub fn hold_us(mut self, start: u16, stop: u16) -> Self {
        self.config.start_hold_us = start;
        self.config.stop_hold_us = stop;
        self
    }

    /// Sets the per-bit and per-byte clock-stretch timeouts.
    pub fn timeouts_us(mut self, bit: u32, byte: u32) -> Self {
        self.config.bit_timeout_us = bit;
        self.config.byte_timeout_us = byte;
        self
    }

    /// Sets the register write settle delay.
    pub fn write_delay_ms(mut self, delay: u32) -> Self {
        self.config.write_delay_ms = delay;
        self
    }

    /// Sets the measurement interval write settle delay.
    pub fn interval_write_delay_ms(mut self, delay: u32) -> Self {
        self.config.interval_write_delay_ms = delay;
        self
    }

    /// Sets the consecutive failure count that marks the driver offline.
    pub fn offline_threshold(mut self, threshold: u8) -> Self {
        self.config.offline_threshold = threshold;
        self
    }

    /// Finalizes the builder and returns the [`Config`].
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_address: 0,
            clock_low_us: 100,
            clock_high_us: 100,
            start_hold_us: 100,
            stop_hold_us: 100,
            bit_timeout_us: 25_000,
            byte_timeout_us: 35_000,
            write_delay_ms: 150,
            interval_write_delay_ms: 300,
            offline_threshold: 5,
        }
    }
}

/// Validation errors generated while verifying a [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The transport is missing one or more line callbacks.
    MissingCallbacks,
    /// Device address above 7.
    DeviceAddress,
    /// Clock low or high time below 100 µs.
    ClockTiming,
    /// START or STOP hold time below 4 µs.
    HoldTiming,
    /// A clock-stretch timeout is zero.
    ZeroTimeout,
    /// Byte timeout shorter than the bit timeout.
    ByteTimeoutBelowBit,
    /// Offline threshold of zero.
    ZeroOfflineThreshold,
    /// Write settle delay above [`WRITE_DELAY_MAX_MS`].
    WriteDelay,
    /// Interval write settle delay above [`INTERVAL_WRITE_DELAY_MAX_MS`].
    IntervalWriteDelay,
}

impl ConfigError {
    /// Static description used when reporting the error.
    pub const fn message(self) -> &'static str {
        match self {
            Self::MissingCallbacks => "Missing E2 callbacks",
            Self::DeviceAddress => "Invalid device address",
            Self::ClockTiming => "Clock timing below bus minimum",
            Self::HoldTiming => "Start/stop hold below bus minimum",
            Self::ZeroTimeout => "Timeouts must be non-zero",
            Self::ByteTimeoutBelowBit => "byte_timeout_us must be >= bit_timeout_us",
            Self::ZeroOfflineThreshold => "offline_threshold must be > 0",
            Self::WriteDelay => "write_delay_ms exceeds safe limit",
            Self::IntervalWriteDelay => "interval_write_delay_ms exceeds safe limit",
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(err: ConfigError) -> Self {
        Self::new(crate::error::ErrorKind::InvalidConfig, err.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_driver_contract() {
        let cfg = Config::default();
        assert_eq!(cfg.device_address, 0);
        assert_eq!(cfg.clock_low_us, 100);
        assert_eq!(cfg.clock_high_us, 100);
        assert_eq!(cfg.bit_timeout_us, 25_000);
        assert_eq!(cfg.byte_timeout_us, 35_000);
        assert_eq!(cfg.write_delay_ms, 150);
        assert_eq!(cfg.interval_write_delay_ms, 300);
        assert_eq!(cfg.offline_threshold, 5);
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn rejects_address_above_seven() {
        let cfg = Config::new().device_address(8).build();
        assert_eq!(cfg.validate(), Err(ConfigError::DeviceAddress));
        let cfg = Config::new().device_address(7).build();
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn rejects_timing_below_bus_minimums() {
        let cfg = Config::new().clock_us(99, 100).build();
        assert_eq!(cfg.validate(), Err(ConfigError::ClockTiming));
        let cfg = Config::new().hold_us(4, 3).build();
        assert_eq!(cfg.validate(), Err(ConfigError::HoldTiming));
    }

    #[test]
    fn rejects_inconsistent_timeouts() {
        let cfg = Config::new().timeouts_us(0, 100).build();
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroTimeout));
        let cfg = Config::new().timeouts_us(2_000, 1_000).build();
        assert_eq!(cfg.validate(), Err(ConfigError::ByteTimeoutBelowBit));
    }

    #[test]
    fn rejects_zero_threshold_and_long_delays() {
        let cfg = Config::new().offline_threshold(0).build();
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroOfflineThreshold));
        let cfg = Config::new().write_delay_ms(WRITE_DELAY_MAX_MS + 1).build();
        assert_eq!(cfg.validate(), Err(ConfigError::WriteDelay));
        let cfg = Config::new()
            .interval_write_delay_ms(INTERVAL_WRITE_DELAY_MAX_MS + 1)
            .build();
        assert_eq!(cfg.validate(), Err(ConfigError::IntervalWriteDelay));
    }
}
