//! E2 transport assembled from plain function pointers.
//!
//! Useful when the board support code already exposes free functions for the
//! bus lines. Each callback receives the caller-owned context by mutable
//! reference.

use super::E2Bus;

/// Sets (`true` = release) or drives low one bus line.
pub type SetLineFn<C> = fn(level: bool, ctx: &mut C);
/// Samples one bus line; `true` when high.
pub type ReadLineFn<C> = fn(ctx: &mut C) -> bool;
/// Blocks for the given number of microseconds.
pub type DelayUsFn<C> = fn(us: u32, ctx: &mut C);

/// Callback table implementing [`E2Bus`].
///
/// All five callbacks must be present for the driver to accept the
/// transport; a partially populated table reports itself unbound.
pub struct CallbackBus<C> {
    /// Clock line setter.
    pub set_scl: Option<SetLineFn<C>>,
    /// Data line setter.
    pub set_sda: Option<SetLineFn<C>>,
    /// Clock line reader.
    pub read_scl: Option<ReadLineFn<C>>,
    /// Data line reader.
    pub read_sda: Option<ReadLineFn<C>>,
    /// Microsecond delay.
    pub delay_us: Option<DelayUsFn<C>>,
    /// Context threaded through every callback.
    pub context: C,
}

impl<C> CallbackBus<C> {
    /// Creates an empty table around `context`.
    pub const fn unbound(context: C) -> Self {
        Self {
            set_scl: None,
            set_sda: None,
            read_scl: None,
            read_sda: None,
            delay_us: None,
            context,
        }
    }

    /// Creates a fully populated table.
    pub const fn new(
        set_scl: SetLineFn<C>,
        set_sda: SetLineFn<C>,
        read_scl: ReadLineFn<C>,
        read_sda: ReadLineFn<C>,
        delay_us: DelayUsFn<C>,
        context: C,
    ) -> Self {
        Self {
            set_scl: Some(set_scl),
            set_sda: Some(set_sda),
            read_scl: Some(read_scl),
            read_sda: Some(read_sda),
            delay_us: Some(delay_us),
            context,
        }
    }

    /// Consumes the table and returns the context.
    pub fn into_context(self) -> C {
        self.context
    }
}

impl<C> E2Bus for CallbackBus<C> {
    fn set_scl(&mut self, level: bool) {
        if let Some(f) = self.set_scl {
            f(level, &mut self.context);
        }
    }

    fn set_sda(&mut self, level: bool) {
        if let Some(f) = self.set_sda {
            f(level, &mut self.context);
        }
    }

    // Missing readers report a low line so a half-bound table can never
    // look like an idle bus.
    fn read_scl(&mut self) -> bool {
        self.read_scl.is_some_and(|f| f(&mut self.context))
    }

    fn read_sda(&mut self) -> bool {
        self.read_sda.is_some_and(|f| f(&mut self.context))
    }

    fn delay_us(&mut self, us: u32) {
        if let Some(f) = self.delay_us {
            f(us, &mut self.context);
        }
    }

    fn is_bound(&self) -> bool {
        self.set_scl.is_some()
            && self.set_sda.is_some()
            && self.read_scl.is_some()
            && self.read_sda.is_some()
            && self.delay_us.is_some()
    }
}
