//! TIM3 as the control-tick source.
//!
//! The timer counts at a fixed 1 kHz base (prescaler from PCLK), so the
//! auto-reload register holds the period directly in milliseconds, up to
//! its 16-bit limit.

use stm32f0xx_hal::{pac, time::Hertz};
use tec_ctl::TickSource;

pub struct TickTimer {
    tim: pac::TIM3,
    pclk: Hertz,
}

impl TickTimer {
    /// Take ownership of TIM3. Runs once during init, before interrupts
    /// are unmasked.
    pub fn new(tim: pac::TIM3, pclk: Hertz) -> Self {
        // SAFETY: single clock-enable write during init; nothing else is
        // touching RCC concurrently yet.
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb1enr.modify(|_, w| w.tim3en().set_bit());

        Self { tim, pclk }
    }

    /// Stop, reprogram for `period_ms`, restart. `0` disarms.
    ///
    /// The counter is halted and the update interrupt masked before any
    /// compare value changes, so no tick can fire with a stale period.
    pub fn rearm(&mut self, period_ms: u32) {
        self.tim.cr1.modify(|_, w| w.cen().clear_bit());
        self.tim.dier.modify(|_, w| w.uie().clear_bit());

        if period_ms == 0 {
            return;
        }

        let period = if period_ms > u32::from(u16::MAX) + 1 {
            defmt::warn!("period {} ms exceeds the timer range, clamping", period_ms);
            u32::from(u16::MAX) + 1
        } else {
            period_ms
        };

        let psc = self.pclk.0 / 1_000 - 1;
        // SAFETY: whole-register writes of in-range values.
        self.tim.psc.write(|w| unsafe { w.bits(psc) });
        self.tim.arr.write(|w| unsafe { w.bits(period - 1) });
        self.tim.cnt.reset();

        // Load the new prescaler now. UG raises a spurious update flag,
        // which must be gone before the interrupt is unmasked.
        self.tim.egr.write(|w| w.ug().set_bit());
        self.tim.sr.modify(|_, w| w.uif().clear_bit());

        self.tim.dier.modify(|_, w| w.uie().set_bit());
        self.tim.cr1.modify(|_, w| w.cen().set_bit());
    }

    /// Clear the update flag. The only timer access the tick ISR makes.
    pub fn acknowledge(&mut self) {
        self.tim.sr.modify(|_, w| w.uif().clear_bit());
    }
}

/// [`TickSource`] over the RTIC-shared timer: rearms inside the resource
/// lock, masking the tick interrupt while compare values change.
pub struct LockedTick<M>(pub M);

impl<M: rtic::Mutex<T = TickTimer>> TickSource for LockedTick<M> {
    fn rearm(&mut self, period_ms: u32) {
        self.0.lock(|tim| tim.rearm(period_ms));
    }
}
