//! The live control record: everything the command dispatcher and the
//! control service read and write from the main context.

use crate::{
    thermometer::Temperature,
    tick::{Duration, Instant},
};

/// 24.50 °C
pub const DEFAULT_SETPOINT: Temperature = Temperature::from_bits(0x0018_8000);
/// 2.0 °C proportional band
pub const DEFAULT_BAND: Temperature = Temperature::const_from_int(2);
pub const DEFAULT_T_INTEGRAL: Temperature = Temperature::ZERO;
pub const DEFAULT_T_DERIVATIVE: Temperature = Temperature::ZERO;
/// 350 ms control tick
pub const DEFAULT_PERIOD_MS: u32 = 350;

/// Whether the control law drives the actuator, or only explicit `dac`
/// commands do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    OpenLoop,
    ClosedLoop,
}

impl Mode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenLoop => "open",
            Self::ClosedLoop => "closed",
        }
    }
}

impl core::str::FromStr for Mode {
    type Err = ();

    /// Modes are addressed by name or by index on the wire.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" | "0" => Ok(Self::OpenLoop),
            "closed" | "1" => Ok(Self::ClosedLoop),
            _ => Err(()),
        }
    }
}

/// Control state. One instance, owned by the main context for the program
/// lifetime. The tick ISR never touches it; it signals through
/// [`crate::tick::ControlFlag`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    /// Latest sensor reading. Written only by [`Self::record_measurement`].
    pub temperature: Temperature,
    /// Target temperature. Written only by the dispatcher.
    pub setpoint: Temperature,
    /// `temperature - setpoint`, recomputed with every measurement.
    /// Written only by [`Self::record_measurement`] so no reader can see a
    /// fresh temperature with a stale error.
    pub error: Temperature,
    /// Proportional band consumed by the bang-bang law.
    pub band: Temperature,
    /// Integral time, stored for a future PID law.
    pub t_integral: Temperature,
    /// Derivative time, stored for a future PID law.
    pub t_derivative: Temperature,
    /// Control-tick interval in milliseconds; 0 disables ticking.
    pub period_ms: u32,
    /// Stamp of the measurement last consumed by the control law.
    pub time_control: Instant,
    /// Stamp of the most recent measurement.
    pub time_recent: Instant,
    /// Gates invocation of the control law.
    pub mode: Mode,
    /// Free-form debug scalars (`u1`..`u3`), host pass-through only.
    pub user: [Temperature; 3],
}

impl ControlState {
    pub const fn new() -> Self {
        Self {
            temperature: Temperature::ZERO,
            setpoint: DEFAULT_SETPOINT,
            error: Temperature::ZERO,
            band: DEFAULT_BAND,
            t_integral: DEFAULT_T_INTEGRAL,
            t_derivative: DEFAULT_T_DERIVATIVE,
            period_ms: DEFAULT_PERIOD_MS,
            time_control: Instant::from_ticks(0),
            time_recent: Instant::from_ticks(0),
            mode: Mode::OpenLoop,
            user: [Temperature::ZERO; 3],
        }
    }

    /// Store a measurement and its paired error as one step.
    pub fn record_measurement(&mut self, temperature: Temperature, at: Instant) {
        self.temperature = temperature;
        self.error = temperature - self.setpoint;
        self.time_recent = at;
    }

    /// `dt` between the last-used and last-taken measurement, advancing the
    /// last-used stamp. Called once per serviced tick, before the law runs.
    pub fn advance_control_time(&mut self) -> Duration {
        let dt = self
            .time_recent
            .checked_duration_since(self.time_control)
            .unwrap_or(Duration::from_ticks(0));
        self.time_control = self.time_recent;
        dt
    }

    /// Apply the three control parameters together.
    pub fn set_parameters(
        &mut self,
        band: Temperature,
        t_integral: Temperature,
        t_derivative: Temperature,
    ) {
        self.band = band;
        self.t_integral = t_integral;
        self.t_derivative = t_derivative;
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_defaults() {
        let state = ControlState::new();
        assert_eq!(state.setpoint, Temperature::from_num(24.5));
        assert_eq!(state.band, Temperature::from_num(2));
        assert_eq!(state.t_integral, Temperature::ZERO);
        assert_eq!(state.t_derivative, Temperature::ZERO);
        assert_eq!(state.period_ms, 350);
        assert_eq!(state.mode, Mode::OpenLoop);
    }

    #[test]
    fn measurement_pairs_temperature_and_error() {
        let mut state = ControlState::new();
        state.setpoint = Temperature::from_num(20);
        state.record_measurement(Temperature::from_num(23.5), Instant::from_ticks(100));
        assert_eq!(state.temperature, Temperature::from_num(23.5));
        assert_eq!(state.error, Temperature::from_num(3.5));
        assert_eq!(state.time_recent, Instant::from_ticks(100));
    }

    #[test]
    fn dt_advances_control_stamp() {
        let mut state = ControlState::new();
        state.record_measurement(Temperature::ZERO, Instant::from_ticks(350));
        assert_eq!(state.advance_control_time(), Duration::from_ticks(350));
        assert_eq!(state.time_control, Instant::from_ticks(350));
        // A second service against the same measurement sees dt = 0.
        assert_eq!(state.advance_control_time(), Duration::from_ticks(0));
    }

    #[test]
    fn mode_parses_names_and_indices() {
        assert_eq!("open".parse(), Ok(Mode::OpenLoop));
        assert_eq!("0".parse(), Ok(Mode::OpenLoop));
        assert_eq!("closed".parse(), Ok(Mode::ClosedLoop));
        assert_eq!("1".parse(), Ok(Mode::ClosedLoop));
        assert_eq!("auto".parse::<Mode>(), Err(()));
    }
}
