//! E2 transport built on top of `embedded-hal` open-drain pins.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use super::E2Bus;
use crate::log;

/// Open-drain GPIO implementation of [`E2Bus`].
///
/// Both pins must be configured as open-drain outputs with pull-ups so that
/// `set_high` releases the line and `is_high` reads the real bus level.
/// Pin errors are not propagated: a failed write leaves the line as it was
/// and a failed read reports the line low, which the framing engine turns
/// into a timeout or a missing acknowledge.
pub struct PinBus<SCL, SDA, D> {
    scl: SCL,
    sda: SDA,
    delay: D,
}

impl<SCL, SDA, D> PinBus<SCL, SDA, D> {
    /// Creates a transport from the clock pin, data pin and delay provider.
    pub const fn new(scl: SCL, sda: SDA, delay: D) -> Self {
        Self { scl, sda, delay }
    }

    /// Consumes the transport and returns the owned pins and delay.
    pub fn release(self) -> (SCL, SDA, D) {
        (self.scl, self.sda, self.delay)
    }
}

impl<SCL, SDA, D> E2Bus for PinBus<SCL, SDA, D>
where
    SCL: OutputPin + InputPin,
    SDA: OutputPin + InputPin,
    D: DelayNs,
{
    fn set_scl(&mut self, level: bool) {
        let result = if level {
            self.scl.set_high()
        } else {
            self.scl.set_low()
        };
        if result.is_err() {
            log::trace!("ee871: SCL pin write failed");
        }
    }

    fn set_sda(&mut self, level: bool) {
        let result = if level {
            self.sda.set_high()
        } else {
            self.sda.set_low()
        };
        if result.is_err() {
            log::trace!("ee871: SDA pin write failed");
        }
    }

    fn read_scl(&mut self) -> bool {
        self.scl.is_high().unwrap_or(false)
    }

    fn read_sda(&mut self) -> bool {
        self.sda.is_high().unwrap_or(false)
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}
