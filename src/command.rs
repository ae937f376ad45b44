//! Serial command protocol: `name,arg1,arg2,...` per line.
//!
//! Parsing produces a closed [`Command`] sum type, so the dispatcher's
//! match is checked for exhaustiveness at compile time instead of being
//! late-bound on the function name text.

use core::str::{FromStr, Split};

use crate::{dac::DacCode, state::Mode, thermometer::Temperature};

/// One of the three free-form debug scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSlot {
    U1,
    U2,
    U3,
}

impl UserSlot {
    pub const fn index(self) -> usize {
        match self {
            Self::U1 => 0,
            Self::U2 => 1,
            Self::U3 => 2,
        }
    }
}

/// The three control parameters, always applied together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlParams {
    pub band: Temperature,
    pub t_integral: Temperature,
    pub t_derivative: Temperature,
}

/// A fully parsed command line. `None` payloads on get/set commands mean
/// "query the current value".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `setpoint[,degrees]`
    Setpoint(Option<Temperature>),
    /// `params[,band,t_integral,t_derivative]`
    Parameters(Option<ControlParams>),
    /// `period[,ms]`; setting rearms the tick timer, 0 disarms.
    Period(Option<u32>),
    /// `mode[,open|closed|0|1]`
    Mode(Option<Mode>),
    /// `dac,code`: raw actuator override, bypassing the control law.
    Dac(DacCode),
    /// `u1[,value]` .. `u3[,value]`
    User(UserSlot, Option<Temperature>),
    /// `temp`
    Temperature,
    /// `error`
    LoopError,
    /// `uptime`
    Uptime,
    /// `help`
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError<'a> {
    UnknownCommand(&'a str),
    MissingArgument,
    BadArgument(&'a str),
    ExtraArgument(&'a str),
}

/// Parse one terminator-stripped, non-empty command line.
pub fn parse(line: &str) -> Result<Command, ParseError<'_>> {
    let mut parts = line.split(',');
    let cmd = match parts.next().unwrap_or("") {
        "setpoint" => Command::Setpoint(optional(&mut parts)?),
        "params" => Command::Parameters(match optional(&mut parts)? {
            None => None,
            Some(band) => Some(ControlParams {
                band,
                t_integral: required(&mut parts)?,
                t_derivative: required(&mut parts)?,
            }),
        }),
        "period" => Command::Period(optional(&mut parts)?),
        "mode" => Command::Mode(optional(&mut parts)?),
        "dac" => Command::Dac(required(&mut parts)?),
        "u1" => Command::User(UserSlot::U1, optional(&mut parts)?),
        "u2" => Command::User(UserSlot::U2, optional(&mut parts)?),
        "u3" => Command::User(UserSlot::U3, optional(&mut parts)?),
        "temp" => Command::Temperature,
        "error" => Command::LoopError,
        "uptime" => Command::Uptime,
        "help" => Command::Help,
        other => return Err(ParseError::UnknownCommand(other)),
    };
    finish(parts)?;
    Ok(cmd)
}

fn required<'a, T: FromStr>(parts: &mut Split<'a, char>) -> Result<T, ParseError<'a>> {
    match parts.next() {
        None => Err(ParseError::MissingArgument),
        Some(tok) => tok.parse().map_err(|_| ParseError::BadArgument(tok)),
    }
}

fn optional<'a, T: FromStr>(parts: &mut Split<'a, char>) -> Result<Option<T>, ParseError<'a>> {
    match parts.next() {
        None => Ok(None),
        Some(tok) => tok.parse().map(Some).map_err(|_| ParseError::BadArgument(tok)),
    }
}

fn finish<'a>(mut parts: Split<'a, char>) -> Result<(), ParseError<'a>> {
    match parts.next() {
        None => Ok(()),
        Some(tok) => Err(ParseError::ExtraArgument(tok)),
    }
}
