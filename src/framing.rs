//! Bit and byte framing on the E2 bus.
//!
//! Every step follows the same pattern: drive or release a line, release the
//! clock, wait (bounded) for the device to let it rise, hold, drop the clock.
//! The device may stretch the clock by holding it low; the wait is limited
//! by the per-bit timeout and, inside a byte, by the per-byte budget.

use crate::config::Config;
use crate::error::{Error, ErrorKind, Result};
use crate::interface::E2Bus;
use crate::log;
use crate::registers::BUS_RESET_CLOCKS;

/// Clock line polling granularity (µs).
const POLL_STEP_US: u32 = 5;
/// Data setup time before the clock rises (µs).
const DATA_SETUP_US: u32 = 10;

fn detail_us(us: u32) -> i32 {
    i32::try_from(us).unwrap_or(i32::MAX)
}

/// Line-level E2 engine borrowing a transport and the active timing.
pub(crate) struct Framer<'a, B> {
    bus: &'a mut B,
    config: &'a Config,
}

impl<'a, B> Framer<'a, B>
where
    B: E2Bus,
{
    pub(crate) fn new(bus: &'a mut B, config: &'a Config) -> Self {
        Self { bus, config }
    }

    fn delay(&mut self, us: u32, elapsed: Option<&mut u32>) {
        self.bus.delay_us(us);
        if let Some(elapsed) = elapsed {
            *elapsed = elapsed.saturating_add(us);
        }
    }

    fn wait_scl_high(&mut self, mut elapsed: Option<&mut u32>) -> Result<()> {
        let mut waited = 0u32;
        while !self.bus.read_scl() {
            if waited >= self.config.bit_timeout_us {
                return Err(Error::with_detail(
                    ErrorKind::Timeout,
                    "Clock stretch timeout",
                    detail_us(waited),
                ));
            }
            if let Some(spent) = elapsed.as_deref() {
                if spent.saturating_add(POLL_STEP_US) > self.config.byte_timeout_us {
                    return Err(Error::with_detail(
                        ErrorKind::Timeout,
                        "Byte timeout",
                        detail_us(*spent),
                    ));
                }
            }
            self.delay(POLL_STEP_US, elapsed.as_deref_mut());
            waited += POLL_STEP_US;
        }
        Ok(())
    }

    /// Issues a START condition: data falls while the clock is high.
    pub(crate) fn start(&mut self) -> Result<()> {
        self.bus.set_sda(true);
        self.bus.set_scl(true);
        self.wait_scl_high(None)?;
        self.delay(u32::from(self.config.start_hold_us), None);
        self.bus.set_sda(false);
        self.delay(u32::from(self.config.start_hold_us), None);
        self.bus.set_scl(false);
        self.delay(u32::from(self.config.clock_low_us), None);
        Ok(())
    }

    /// Issues a STOP condition: data rises while the clock is high.
    ///
    /// Expects the clock low, as left by the last bit.
    pub(crate) fn stop(&mut self) -> Result<()> {
        self.bus.set_sda(false);
        self.delay(DATA_SETUP_US, None);
        self.bus.set_scl(true);
        self.wait_scl_high(None)?;
        self.delay(u32::from(self.config.stop_hold_us), None);
        self.bus.set_sda(true);
        self.delay(u32::from(self.config.stop_hold_us), None);
        Ok(())
    }

    /// One clock cycle with the data line set to `level` beforehand.
    /// Returns the data line sampled in the middle of the high phase.
    fn clock(&mut self, level: bool, elapsed: &mut u32) -> Result<bool> {
        self.bus.set_sda(level);
        self.delay(DATA_SETUP_US, Some(&mut *elapsed));
        self.bus.set_scl(true);
        self.wait_scl_high(Some(&mut *elapsed))?;
        let high = u32::from(self.config.clock_high_us);
        let sample_delay = high / 2;
        self.delay(sample_delay, Some(&mut *elapsed));
        let sampled = self.bus.read_sda();
        self.delay(high - sample_delay, Some(&mut *elapsed));
        self.bus.set_scl(false);
        self.delay(u32::from(self.config.clock_low_us), Some(&mut *elapsed));
        Ok(sampled)
    }

    pub(crate) fn write_bit(&mut self, bit: bool, elapsed: &mut u32) -> Result<()> {
        self.clock(bit, elapsed).map(|_| ())
    }

    pub(crate) fn read_bit(&mut self, elapsed: &mut u32) -> Result<bool> {
        self.clock(true, elapsed)
    }

    /// Shifts out `value`, most significant bit first.
    pub(crate) fn write_byte(&mut self, value: u8, elapsed: &mut u32) -> Result<()> {
        for shift in (0..8).rev() {
            self.write_bit(value & (1 << shift) != 0, elapsed)?;
        }
        Ok(())
    }

    /// Shifts in one byte, most significant bit first.
    pub(crate) fn read_byte(&mut self, elapsed: &mut u32) -> Result<u8> {
        let mut value = 0u8;
        for _ in 0..8 {
            value = (value << 1) | u8::from(self.read_bit(elapsed)?);
        }
        Ok(value)
    }

    /// Releases data for the ninth clock; `true` when the receiver pulled it low.
    pub(crate) fn read_ack(&mut self, elapsed: &mut u32) -> Result<bool> {
        self.clock(true, elapsed).map(|level| !level)
    }

    /// Drives the ninth clock: low for ACK, released for NACK. Leaves data released.
    pub(crate) fn send_ack(&mut self, ack: bool, elapsed: &mut u32) -> Result<()> {
        self.clock(!ack, elapsed)?;
        self.bus.set_sda(true);
        Ok(())
    }

    /// Both lines released and high.
    pub(crate) fn is_idle(&mut self) -> bool {
        let scl = self.bus.read_scl();
        let sda = self.bus.read_sda();
        scl && sda
    }

    /// Reports which line, if any, is held low.
    pub(crate) fn check_idle(&mut self) -> Result<()> {
        let scl_high = self.bus.read_scl();
        let sda_high = self.bus.read_sda();
        match (scl_high, sda_high) {
            (true, true) => Ok(()),
            (false, false) => Err(Error::new(
                ErrorKind::BusStuck,
                "Both SCL and SDA stuck low",
            )),
            (false, true) => Err(Error::new(ErrorKind::BusStuck, "SCL stuck low")),
            (true, false) => Err(Error::new(ErrorKind::BusStuck, "SDA stuck low")),
        }
    }

    /// Clocks nine pulses with data released, then a STOP, and verifies the
    /// bus is idle. Frees a device left mid-byte by an aborted transaction.
    pub(crate) fn recover(&mut self) -> Result<()> {
        log::debug!("ee871: bus recovery");
        let clock_low = u32::from(self.config.clock_low_us);
        let clock_high = u32::from(self.config.clock_high_us);
        let stop_hold = u32::from(self.config.stop_hold_us);

        self.bus.set_sda(true);
        for _ in 0..BUS_RESET_CLOCKS {
            self.bus.set_scl(false);
            self.delay(clock_low, None);
            self.bus.set_scl(true);
            let mut waited = 0u32;
            while !self.bus.read_scl() && waited < self.config.bit_timeout_us {
                self.delay(POLL_STEP_US, None);
                waited += POLL_STEP_US;
            }
            if waited >= self.config.bit_timeout_us {
                log::warn!("ee871: clock held low during recovery");
                return Err(Error::new(ErrorKind::BusStuck, "SCL stuck during reset"));
            }
            self.delay(clock_high, None);
        }

        self.bus.set_scl(false);
        self.delay(clock_low, None);
        self.bus.set_sda(false);
        self.delay(DATA_SETUP_US, None);
        self.bus.set_scl(true);
        self.delay(stop_hold, None);
        self.bus.set_sda(true);
        self.delay(stop_hold, None);

        if !self.is_idle() {
            return Err(Error::new(ErrorKind::BusStuck, "Bus stuck after reset"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SimDevice;

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn start_then_stop_is_seen_by_device() {
        let cfg = config();
        let mut sim = SimDevice::new();
        let mut framer = Framer::new(&mut sim, &cfg);
        framer.start().unwrap();
        framer.stop().unwrap();
        assert!(framer.is_idle());
        assert_eq!(sim.starts, 1);
        assert_eq!(sim.stops, 1);
    }

    #[test]
    fn unanswered_control_byte_is_not_acked() {
        let cfg = config();
        let mut sim = SimDevice::new();
        sim.respond = false;
        let mut framer = Framer::new(&mut sim, &cfg);
        framer.start().unwrap();
        let mut elapsed = 0;
        framer.write_byte(0x71, &mut elapsed).unwrap();
        assert!(!framer.read_ack(&mut elapsed).unwrap());
        framer.stop().unwrap();
    }

    #[test]
    fn byte_elapsed_accumulates_bit_timing() {
        let cfg = config();
        let mut sim = SimDevice::new();
        let mut framer = Framer::new(&mut sim, &cfg);
        framer.start().unwrap();
        let mut elapsed = 0;
        framer.write_byte(0x71, &mut elapsed).unwrap();
        // setup + high + low per bit, no stretching
        assert_eq!(elapsed, 8 * (10 + 100 + 100));
        framer.read_ack(&mut elapsed).unwrap();
        framer.stop().unwrap();
    }

    #[test]
    fn clock_held_low_times_out_with_elapsed_detail() {
        let cfg = Config::new().timeouts_us(500, 1_000).build();
        let mut sim = SimDevice::new();
        sim.scl_stuck_low = true;
        let mut framer = Framer::new(&mut sim, &cfg);
        let err = framer.start().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert_eq!(err.message, "Clock stretch timeout");
        assert_eq!(err.detail, 500);
    }

    #[test]
    fn stretching_past_byte_budget_times_out() {
        let cfg = Config::new().timeouts_us(1_000, 1_000).build();
        let mut sim = SimDevice::new();
        sim.stretch_us = 600;
        let mut framer = Framer::new(&mut sim, &cfg);
        framer.start().unwrap();
        let mut elapsed = 0;
        let err = framer.write_byte(0x71, &mut elapsed).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert_eq!(err.message, "Byte timeout");
    }

    #[test]
    fn check_idle_names_the_stuck_line() {
        let cfg = config();
        let mut sim = SimDevice::new();
        sim.hold_sda_for_pulses(u32::MAX);
        let err = Framer::new(&mut sim, &cfg).check_idle().unwrap_err();
        assert_eq!(err.kind, ErrorKind::BusStuck);
        assert_eq!(err.message, "SDA stuck low");

        sim.scl_stuck_low = true;
        let err = Framer::new(&mut sim, &cfg).check_idle().unwrap_err();
        assert_eq!(err.message, "Both SCL and SDA stuck low");
    }

    #[test]
    fn recovery_frees_data_line_after_pulses() {
        let cfg = config();
        let mut sim = SimDevice::new();
        sim.hold_sda_for_pulses(3);
        let mut framer = Framer::new(&mut sim, &cfg);
        assert!(!framer.is_idle());
        framer.recover().unwrap();
        assert!(framer.is_idle());
    }

    #[test]
    fn recovery_reports_stuck_clock() {
        let cfg = Config::new().timeouts_us(100, 100).build();
        let mut sim = SimDevice::new();
        sim.scl_stuck_low = true;
        let err = Framer::new(&mut sim, &cfg).recover().unwrap_err();
        assert_eq!(err.kind, ErrorKind::BusStuck);
        assert_eq!(err.message, "SCL stuck during reset");
    }
}
