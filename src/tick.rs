//! Control-tick plumbing: the interrupt/main-loop handshake flag and the
//! abstractions over the hardware timer and monotonic clock.

use core::sync::atomic::{AtomicBool, Ordering};

/// Milliseconds since boot, 32-bit at a 1 kHz tick.
pub type Instant = fugit::TimerInstantU32<1_000>;
/// Millisecond duration, 32-bit at a 1 kHz tick.
pub type Duration = fugit::TimerDurationU32<1_000>;

/// The single piece of state shared between interrupt and main context.
///
/// The tick ISR only ever stores `true`; the main loop only ever stores
/// `false`. Load and store are the only operations used, so this works on
/// thumbv6 cores without CAS. The flag is level-triggered: ticks raised
/// while a service is already pending collapse into one service.
pub struct ControlFlag(AtomicBool);

impl ControlFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Request a control computation. The only operation permitted in
    /// interrupt context.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Consume a pending request. Main context only. A raise landing after
    /// the load is folded into the service this call just granted.
    pub fn take(&self) -> bool {
        if self.0.load(Ordering::Acquire) {
            self.0.store(false, Ordering::Release);
            true
        } else {
            false
        }
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for ControlFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodic hardware timer raising the control tick.
pub trait TickSource {
    /// Stop the running timer, reprogram it for `period_ms`, restart it.
    ///
    /// `0` disarms the tick entirely. The implementation must guarantee no
    /// tick fires with the stale period during reconfiguration, and must
    /// keep 1 ms granularity up to the hardware's maximum representable
    /// period.
    fn rearm(&mut self, period_ms: u32);
}

/// Monotonic millisecond clock.
pub trait Clock {
    fn now(&mut self) -> Instant;
}
