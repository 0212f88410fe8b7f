//! Bus transport abstraction for the EE871 driver.
//!
//! The driver never touches hardware itself. It drives the two open-drain E2
//! lines through an [`E2Bus`] implementation: `true` releases a line (pulled
//! high), `false` drives it low.

pub mod callbacks;
pub mod pins;

/// Line-level access required by the E2 framing engine.
pub trait E2Bus {
    /// Drives (`false`) or releases (`true`) the clock line.
    fn set_scl(&mut self, level: bool);

    /// Drives (`false`) or releases (`true`) the data line.
    fn set_sda(&mut self, level: bool);

    /// Samples the clock line; `true` when high.
    fn read_scl(&mut self) -> bool;

    /// Samples the data line; `true` when high.
    fn read_sda(&mut self) -> bool;

    /// Blocks for at least `us` microseconds.
    fn delay_us(&mut self, us: u32);

    /// Blocks for at least `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            self.delay_us(1_000);
        }
    }

    /// Reports whether every line operation is backed by an implementation.
    ///
    /// `begin()` rejects transports returning `false` with `InvalidConfig`.
    fn is_bound(&self) -> bool {
        true
    }
}

impl<B: E2Bus + ?Sized> E2Bus for &mut B {
    fn set_scl(&mut self, level: bool) {
        (**self).set_scl(level)
    }

    fn set_sda(&mut self, level: bool) {
        (**self).set_sda(level)
    }

    fn read_scl(&mut self) -> bool {
        (**self).read_scl()
    }

    fn read_sda(&mut self) -> bool {
        (**self).read_sda()
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }

    fn is_bound(&self) -> bool {
        (**self).is_bound()
    }
}
