//! Control law deciding the TEC drive from the loop error.

use crate::{dac::DacCode, thermometer::Temperature, tick::Duration};

pub mod bang_bang;

pub trait Controller {
    /// Run the law for a single serviced tick.
    ///
    /// `error` is `temperature - setpoint`, `band` the proportional band
    /// around zero, `dt` the time since the previous serviced measurement
    /// (unused by the bang-bang law, available to an integral/derivative
    /// one). Returns the code to command, or `None` to hold the actuator at
    /// its previous output.
    fn run(&mut self, error: Temperature, band: Temperature, dt: Duration) -> Option<DacCode>;
}
