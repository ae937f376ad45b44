//! Temperature controller driver: the cooperative main loop.

use embedded_hal::serial::{Read, Write as SerialWrite};

use crate::{
    controller::Controller,
    dac::Dac,
    state::{ControlState, Mode},
    terminal::{self, Line, LineBuffer},
    thermometer::Thermometer,
    tick::{Clock, ControlFlag, TickSource},
};

/// Drives one pass of serial intake, command dispatch and control service
/// per [`poll`](Self::poll), from the main context only.
///
/// The tick ISR communicates exclusively through the [`ControlFlag`];
/// everything else here is plain main-context-owned data.
pub struct TempController<'a, S, M, D, L, T, C> {
    serial: S,
    therm: M,
    dac: D,
    law: L,
    timer: T,
    clock: C,
    flag: &'a ControlFlag,
    state: ControlState,
    line: LineBuffer,
}

impl<'a, S, M, D, L, T, C> TempController<'a, S, M, D, L, T, C>
where
    S: Read<u8> + SerialWrite<u8>,
    M: Thermometer,
    D: Dac,
    L: Controller,
    T: TickSource,
    C: Clock,
{
    /// Build the controller with startup defaults and arm the tick timer
    /// at the default period. The DAC is expected to have been programmed
    /// to its zero code during hardware bring-up.
    pub fn new(
        serial: S,
        therm: M,
        dac: D,
        law: L,
        mut timer: T,
        clock: C,
        flag: &'a ControlFlag,
    ) -> Self {
        let state = ControlState::new();
        timer.rearm(state.period_ms);
        Self {
            serial,
            therm,
            dac,
            law,
            timer,
            clock,
            flag,
            state,
            line: LineBuffer::new(),
        }
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    /// One loop iteration: intake, dispatch, control service, in that
    /// order. A command landing in the dispatch phase is therefore visible
    /// to a tick already pending in the service phase of the same pass.
    ///
    /// Nothing here blocks except the measurement itself; the control
    /// period must exceed measurement plus dispatch latency or ticks are
    /// serviced late (documented, not corrected).
    pub fn poll(&mut self) {
        let line = self.intake();
        if let Some(line) = line {
            self.dispatch(&line);
        }
        if self.flag.take() {
            self.service();
        }
    }

    /// Drain available serial bytes into the line buffer, stopping at the
    /// first completed line.
    fn intake(&mut self) -> Option<Line> {
        loop {
            match self.serial.read() {
                Ok(b) => {
                    if let Some(line) = self.line.feed(b) {
                        return Some(line);
                    }
                }
                Err(nb::Error::WouldBlock) => return None,
                Err(nb::Error::Other(_)) => {
                    // Framing/noise/overrun: the line under assembly is
                    // suspect, drop it at its terminator.
                    self.line.poison();
                    #[cfg(feature = "defmt")]
                    defmt::warn!("serial reception fault, discarding line");
                }
            }
        }
    }

    fn dispatch(&mut self, line: &Line) {
        let now = self.clock.now();
        let mut out = SerialOut(&mut self.serial);
        terminal::execute(
            line,
            &mut self.state,
            &mut self.timer,
            &mut self.dac,
            now,
            &mut out,
        );
    }

    /// Exactly one measurement-and-decide cycle per taken flag.
    fn service(&mut self) {
        match self.therm.read() {
            Ok(temperature) => {
                let now = self.clock.now();
                self.state.record_measurement(temperature, now);
                let dt = self.state.advance_control_time();

                #[cfg(feature = "defmt")]
                defmt::debug!(
                    "temperature: {=f32}, error: {=f32}",
                    temperature.to_num::<f32>(),
                    self.state.error.to_num::<f32>()
                );

                if self.state.mode == Mode::ClosedLoop {
                    if let Some(code) = self.law.run(self.state.error, self.state.band, dt) {
                        if self.dac.set(code).is_err() {
                            #[cfg(feature = "defmt")]
                            defmt::warn!("actuator fault");
                        }
                    }
                }
            }
            Err(_) => {
                // Hold the last temperature/error and skip the law rather
                // than decide on a known-bad reading. Timestamps are left
                // alone: no measurement was taken.
                #[cfg(feature = "defmt")]
                defmt::warn!("sensor fault, holding last reading");
            }
        }
    }
}

/// `core::fmt::Write` adapter over a blocking serial transmitter.
struct SerialOut<'s, S>(&'s mut S);

impl<S: SerialWrite<u8>> core::fmt::Write for SerialOut<'_, S> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for b in s.bytes() {
            nb::block!(self.0.write(b)).map_err(|_| core::fmt::Error)?;
        }
        Ok(())
    }
}
