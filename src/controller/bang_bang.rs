//! Two-threshold comparator around the proportional band.

use crate::{dac::DacCode, thermometer::Temperature, tick::Duration};

/// Bang-bang law: full cooling above the band, off below it, hold inside.
///
/// `t_integral`/`t_derivative` have no effect here; a PID law can replace
/// this behind the same [`Controller`](super::Controller) interface.
pub struct BangBang;

impl super::Controller for BangBang {
    fn run(&mut self, error: Temperature, band: Temperature, _dt: Duration) -> Option<DacCode> {
        // Arithmetic shift, exact for fixed point. A zero or negative band
        // (the serial channel is untrusted) collapses the dead zone but
        // still branches deterministically.
        let half_band = band >> 1u32;

        if error >= half_band {
            Some(DacCode::FULL_NEGATIVE)
        } else if error < -half_band {
            Some(DacCode::ZERO)
        } else {
            None
        }
    }
}
