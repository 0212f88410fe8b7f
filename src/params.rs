//! Strongly typed parameter enumerations for the EE871 driver.
//!
//! These enums map directly to register field encodings and are used by the
//! bitfields in [`registers`](crate::registers).
//!
//! # Examples
//!
//! ```rust
//! use ee871::params::{BusPriority, MeasureMode};
//! use ee871::registers::OperatingMode;
//!
//! let mode = OperatingMode::new()
//!     .with_measure_mode(MeasureMode::LowPower)
//!     .with_priority(BusPriority::Measurement);
//! assert_eq!(u8::from(mode), 0x01);
//! ```

use modular_bitfield::prelude::Specifier;

/// Measuring mode encoded in `OPERATING_MODE[0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Specifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
#[bits = 1]
pub enum MeasureMode {
    /// Continuous measurement at the configured interval.
    Freerunning = 0,
    /// Low power mode; a status read triggers each measurement.
    LowPower = 1,
}

/// Arbitration between measurement and bus traffic in `OPERATING_MODE[1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Specifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
#[bits = 1]
pub enum BusPriority {
    /// A running measurement delays bus responses.
    Measurement = 0,
    /// Bus requests interrupt a running measurement.
    E2 = 1,
}

/// CO2 specific interval factor; positive multiplies, negative divides the
/// global interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IntervalFactor {
    /// Interval is the global interval multiplied by the factor.
    Multiply(u8),
    /// Interval is the global interval divided by the factor.
    Divide(u8),
    /// Factor of zero; the global interval applies unchanged.
    Unity,
}

impl From<i8> for IntervalFactor {
    fn from(raw: i8) -> Self {
        match raw {
            0 => Self::Unity,
            r if r > 0 => Self::Multiply(r as u8),
            r => Self::Divide(r.unsigned_abs()),
        }
    }
}
