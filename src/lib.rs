//! Driver for the E+E EE871 CO2 sensor on the bit-banged E2 bus.
//!
//! The driver owns a line-level transport implementing
//! [`E2Bus`](interface::E2Bus) and layers on top of it the E2 framing,
//! checksummed transactions, capability-gated register commands and a
//! health state machine.
//!
//! ```no_run
//! # fn demo<B: ee871::E2Bus>(bus: B) -> ee871::Result<()> {
//! use ee871::{Config, Ee871};
//!
//! let mut sensor = Ee871::new(bus);
//! sensor.begin(Config::default())?;
//! let ppm = sensor.read_co2_average()?;
//! # let _ = ppm;
//! # Ok(())
//! # }
//! ```
#![no_std]

#[cfg(test)]
extern crate std;

mod error;
mod framing;
mod log;
mod transaction;

pub mod checksum;
pub mod commands;
pub mod config;
pub mod device;
pub mod health;
pub mod interface;
pub mod params;
pub mod registers;

#[cfg(test)]
mod testing;

pub use crate::commands::{CalibrationPoints, FirmwareVersion};
pub use crate::config::{Config, ConfigError};
pub use crate::device::{Capabilities, Ee871};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::health::{DriverState, Health};
pub use crate::interface::E2Bus;
