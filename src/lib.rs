//! Single-loop temperature controller for a thermoelectric (Peltier) device.
//!
//! An RTD thermometer is read at a fixed period, the temperature error is fed
//! to a bang-bang law around a proportional band, and the decision is written
//! to the DAC driving the TEC current. A line-oriented serial protocol
//! reconfigures the live loop (setpoint, gains, period, mode) without
//! disturbing the tick timing.
//!
//! The crate is `no_std` and hardware-agnostic: the firmware crate provides
//! the timer, serial port, thermometer and DAC behind the traits defined
//! here, and runs [`TempController::poll`] from its main context. The only
//! datum shared with interrupt context is [`tick::ControlFlag`].
//!
//! [`TempController::poll`]: temp_controller::TempController::poll

#![no_std]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod command;
pub mod controller;
pub mod dac;
pub mod state;
pub mod temp_controller;
pub mod terminal;
pub mod thermometer;
pub mod tick;

pub use crate::{
    command::Command,
    controller::{bang_bang::BangBang, Controller},
    dac::{Dac, DacCode},
    state::{ControlState, Mode},
    temp_controller::TempController,
    thermometer::{Temperature, Thermometer},
    tick::{Clock, ControlFlag, TickSource},
};
