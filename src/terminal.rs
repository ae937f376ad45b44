//! Serial terminal: line intake, command execution, responses.
//!
//! Commands:
//! - `setpoint[,degC]` - Get or set the target temperature
//! - `params[,band,t_integral,t_derivative]` - Get or set the control parameters
//! - `period[,ms]` - Get or set the control tick period (0 disables)
//! - `mode[,open|closed]` - Get or set the loop mode
//! - `dac,code` - Raw actuator override
//! - `u1|u2|u3[,value]` - Get or set a debug scalar
//! - `temp` / `error` / `uptime` - Live readings
//! - `help` - Print this summary

use core::fmt::Write;

use crate::{
    command::{self, Command, ParseError},
    dac::Dac,
    state::ControlState,
    tick::{Instant, TickSource},
};

pub const BUFFER_SIZE: usize = 32;
const OK_STR: &str = "<ok>\r\n";

const HELP_STR: &str = "Commands:\r
    setpoint[,degC]\r
    params[,band,t_integral,t_derivative]\r
    period[,ms]\r
    mode[,open|closed]\r
    dac,code\r
    u1|u2|u3[,value]\r
    temp\r
    error\r
    uptime\r
    help\r
";

/// One completed command line, owned and detached from the intake buffer.
pub type Line = heapless::Vec<u8, BUFFER_SIZE>;

#[inline]
pub const fn is_newline(b: u8) -> bool {
    b == b'\n' || b == b'\r'
}

/// Fixed-capacity accumulator for incoming serial bytes.
///
/// A line longer than [`BUFFER_SIZE`] is poisoned and discarded whole once
/// its terminator arrives; the bytes after the terminator parse cleanly.
pub struct LineBuffer {
    buf: Line,
    poisoned: bool,
}

impl LineBuffer {
    pub const fn new() -> Self {
        Self {
            buf: Line::new(),
            poisoned: false,
        }
    }

    /// Feed one received byte. Returns the completed line when `byte`
    /// terminates a non-empty, non-poisoned line.
    ///
    /// The line is moved out of the accumulator before the caller parses
    /// it, so tokenization can never corrupt the next intake.
    pub fn feed(&mut self, byte: u8) -> Option<Line> {
        if is_newline(byte) {
            let line = core::mem::take(&mut self.buf);
            let poisoned = core::mem::replace(&mut self.poisoned, false);
            if poisoned || line.is_empty() {
                None
            } else {
                Some(line)
            }
        } else {
            if self.buf.push(byte).is_err() {
                self.poisoned = true;
            }
            None
        }
    }

    /// Discard whatever is accumulating, e.g. after a serial reception
    /// fault that may have corrupted it.
    pub fn poison(&mut self) {
        self.poisoned = true;
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse and execute one command line, writing exactly one response for
/// every non-empty line before returning.
pub fn execute<W, T, D>(
    line: &[u8],
    state: &mut ControlState,
    timer: &mut T,
    dac: &mut D,
    now: Instant,
    out: &mut W,
) where
    W: Write,
    T: TickSource,
    D: Dac,
{
    let Ok(text) = core::str::from_utf8(line) else {
        let _ = out.write_str("<err> bad encoding\r\n");
        return;
    };

    match command::parse(text) {
        Ok(cmd) => apply(cmd, state, timer, dac, now, out),
        Err(e) => report(e, out),
    }
}

fn apply<W, T, D>(
    cmd: Command,
    state: &mut ControlState,
    timer: &mut T,
    dac: &mut D,
    now: Instant,
    out: &mut W,
) where
    W: Write,
    T: TickSource,
    D: Dac,
{
    let _ = match cmd {
        Command::Setpoint(None) => write!(out, "{}\r\n", state.setpoint),
        Command::Setpoint(Some(v)) => {
            state.setpoint = v;
            out.write_str(OK_STR)
        }
        Command::Parameters(None) => write!(
            out,
            "{},{},{}\r\n",
            state.band, state.t_integral, state.t_derivative
        ),
        Command::Parameters(Some(p)) => {
            state.set_parameters(p.band, p.t_integral, p.t_derivative);
            out.write_str(OK_STR)
        }
        Command::Period(None) => write!(out, "{}\r\n", state.period_ms),
        Command::Period(Some(ms)) => {
            state.period_ms = ms;
            timer.rearm(ms);
            out.write_str(OK_STR)
        }
        Command::Mode(None) => write!(out, "{}\r\n", state.mode.as_str()),
        // Mode changes never touch the actuator: entering closed loop keeps
        // whatever was last commanded until the next decision, and leaving
        // it preserves the manual override semantics.
        Command::Mode(Some(m)) => {
            state.mode = m;
            out.write_str(OK_STR)
        }
        Command::Dac(code) => match dac.set(code) {
            Ok(()) => out.write_str(OK_STR),
            Err(_) => out.write_str("<err> actuator fault\r\n"),
        },
        Command::User(slot, None) => write!(out, "{}\r\n", state.user[slot.index()]),
        Command::User(slot, Some(v)) => {
            state.user[slot.index()] = v;
            out.write_str(OK_STR)
        }
        Command::Temperature => write!(out, "{}\r\n", state.temperature),
        Command::LoopError => write!(out, "{}\r\n", state.error),
        Command::Uptime => write!(out, "{}\r\n", now.duration_since_epoch().to_millis()),
        Command::Help => out.write_str(HELP_STR),
    };
}

fn report<W: Write>(err: ParseError<'_>, out: &mut W) {
    let _ = match err {
        ParseError::UnknownCommand(name) => write!(out, "<err> unknown command '{name}'\r\n"),
        ParseError::MissingArgument => out.write_str("<err> missing argument\r\n"),
        ParseError::BadArgument(tok) => write!(out, "<err> bad argument '{tok}'\r\n"),
        ParseError::ExtraArgument(tok) => write!(out, "<err> extra argument '{tok}'\r\n"),
    };
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::{string::String, vec::Vec};

    use super::*;
    use crate::{dac::fake::FakeDac, dac::DacCode, state::Mode};

    /// Records every rearm request.
    struct SpyTimer(Vec<u32>);

    impl TickSource for SpyTimer {
        fn rearm(&mut self, period_ms: u32) {
            self.0.push(period_ms);
        }
    }

    fn run(line: &str, state: &mut ControlState) -> (String, SpyTimer, FakeDac) {
        let mut out = String::new();
        let mut timer = SpyTimer(Vec::new());
        let mut dac = FakeDac::new();
        execute(
            line.as_bytes(),
            state,
            &mut timer,
            &mut dac,
            Instant::from_ticks(12_345),
            &mut out,
        );
        (out, timer, dac)
    }

    #[test]
    fn line_buffer_completes_on_cr_or_lf() {
        let mut buf = LineBuffer::new();
        for b in b"temp" {
            assert_eq!(buf.feed(*b), None);
        }
        let line = buf.feed(b'\r').unwrap();
        assert_eq!(&line[..], b"temp");
        // The LF of a CRLF pair terminates an empty line: no dispatch.
        assert_eq!(buf.feed(b'\n'), None);
    }

    #[test]
    fn overlong_line_is_dropped_whole() {
        let mut buf = LineBuffer::new();
        for _ in 0..100 {
            assert_eq!(buf.feed(b'x'), None);
        }
        assert_eq!(buf.feed(b'\n'), None);
        // Intake is clean again afterwards.
        for b in b"temp" {
            buf.feed(*b);
        }
        assert_eq!(&buf.feed(b'\n').unwrap()[..], b"temp");
    }

    #[test]
    fn poisoned_line_is_discarded_at_the_terminator() {
        let mut buf = LineBuffer::new();
        for b in b"setpo" {
            buf.feed(*b);
        }
        buf.poison();
        for b in b"int,1" {
            buf.feed(*b);
        }
        assert_eq!(buf.feed(b'\n'), None);
        for b in b"mode" {
            buf.feed(*b);
        }
        assert_eq!(&buf.feed(b'\n').unwrap()[..], b"mode");
    }

    #[test]
    fn setpoint_round_trip() {
        let mut state = ControlState::new();
        let (out, ..) = run("setpoint", &mut state);
        assert_eq!(out, "24.5\r\n");

        let (out, ..) = run("setpoint,30.0", &mut state);
        assert_eq!(out, OK_STR);
        let (out, ..) = run("setpoint", &mut state);
        assert_eq!(out, "30\r\n");

        let (out, ..) = run("setpoint,-5.25", &mut state);
        assert_eq!(out, OK_STR);
        let (out, ..) = run("setpoint", &mut state);
        assert_eq!(out, "-5.25\r\n");

        let (out, ..) = run("setpoint,0", &mut state);
        assert_eq!(out, OK_STR);
        let (out, ..) = run("setpoint", &mut state);
        assert_eq!(out, "0\r\n");
    }

    #[test]
    fn params_apply_together_and_read_back() {
        let mut state = ControlState::new();
        let (out, ..) = run("params", &mut state);
        assert_eq!(out, "2,0,0\r\n");

        for (set, readback) in [
            ("params,2.5,120,30", "2.5,120,30\r\n"),
            ("params,0,0,0", "0,0,0\r\n"),
            ("params,-1.5,-2,0.25", "-1.5,-2,0.25\r\n"),
        ] {
            let (out, ..) = run(set, &mut state);
            assert_eq!(out, OK_STR);
            let (out, ..) = run("params", &mut state);
            assert_eq!(out, readback);
        }
    }

    #[test]
    fn period_set_rearms_the_timer() {
        let mut state = ControlState::new();
        let (out, timer, _) = run("period,500", &mut state);
        assert_eq!(out, OK_STR);
        assert_eq!(state.period_ms, 500);
        assert_eq!(timer.0, [500]);

        // Zero disarms but is stored like any other value.
        let (out, timer, _) = run("period,0", &mut state);
        assert_eq!(out, OK_STR);
        assert_eq!(timer.0, [0]);
        let (out, timer, _) = run("period", &mut state);
        assert_eq!(out, "0\r\n");
        assert!(timer.0.is_empty());
    }

    #[test]
    fn mode_round_trip_without_touching_the_dac() {
        let mut state = ControlState::new();
        let (out, ..) = run("mode", &mut state);
        assert_eq!(out, "open\r\n");

        let (out, _, dac) = run("mode,closed", &mut state);
        assert_eq!(out, OK_STR);
        assert_eq!(state.mode, Mode::ClosedLoop);
        assert_eq!(dac.writes(), 0);

        let (out, _, dac) = run("mode,0", &mut state);
        assert_eq!(out, OK_STR);
        assert_eq!(state.mode, Mode::OpenLoop);
        assert_eq!(dac.writes(), 0);
    }

    #[test]
    fn dac_override_reaches_the_actuator() {
        let mut state = ControlState::new();
        let (out, _, dac) = run("dac,-32768", &mut state);
        assert_eq!(out, OK_STR);
        assert_eq!(dac.last(), DacCode::FULL_NEGATIVE);
        assert_eq!(dac.writes(), 1);
    }

    #[test]
    fn user_scalars_round_trip() {
        let mut state = ControlState::new();
        for (set, get, expect) in [
            ("u1,1.5", "u1", "1.5\r\n"),
            ("u2,-3", "u2", "-3\r\n"),
            ("u3,0", "u3", "0\r\n"),
        ] {
            let (out, ..) = run(set, &mut state);
            assert_eq!(out, OK_STR);
            let (out, ..) = run(get, &mut state);
            assert_eq!(out, expect);
        }
    }

    #[test]
    fn live_queries() {
        let mut state = ControlState::new();
        state.record_measurement(crate::Temperature::from_num(26.5), Instant::from_ticks(7));
        let (out, ..) = run("temp", &mut state);
        assert_eq!(out, "26.5\r\n");
        let (out, ..) = run("error", &mut state);
        assert_eq!(out, "2\r\n");
        let (out, ..) = run("uptime", &mut state);
        assert_eq!(out, "12345\r\n");
    }

    #[test]
    fn malformed_lines_leave_state_untouched() {
        let mut state = ControlState::new();
        let snapshot = state.clone();

        for line in [
            "bogus,1,2",
            "setpoint,abc",
            "params,1",
            "params,1,2,3,4",
            "mode,auto",
            "dac",
            "period,-1",
        ] {
            let (out, timer, dac) = run(line, &mut state);
            assert!(out.starts_with("<err>"), "{line}: {out}");
            assert_eq!(state, snapshot, "{line} mutated state");
            assert!(timer.0.is_empty(), "{line} touched the timer");
            assert_eq!(dac.writes(), 0, "{line} touched the dac");
        }
    }

    #[test]
    fn error_responses_are_distinguishable() {
        let mut state = ControlState::new();
        let (out, ..) = run("bogus,1,2", &mut state);
        assert_eq!(out, "<err> unknown command 'bogus'\r\n");
        let (out, ..) = run("dac", &mut state);
        assert_eq!(out, "<err> missing argument\r\n");
        let (out, ..) = run("setpoint,abc", &mut state);
        assert_eq!(out, "<err> bad argument 'abc'\r\n");
        let (out, ..) = run("uptime,9", &mut state);
        assert_eq!(out, "<err> extra argument '9'\r\n");
    }

    #[test]
    fn help_lists_the_protocol() {
        let mut state = ControlState::new();
        let (out, ..) = run("help", &mut state);
        assert!(out.starts_with("Commands:"));
        assert!(out.contains("setpoint"));
        assert!(out.contains("uptime"));
    }
}
