//! Temperature sensor interface

use fixed::types::I16F16;

/// I16F16 is a fixed point number with 16 fractional bits and 16 integer bits.
/// This gives us a precision well below a milli-degree & a range of
/// (-32768, 32768) degrees Celsius, so every protocol argument with a
/// centi-degree fraction round-trips exactly.
pub type Temperature = I16F16;

pub trait Thermometer {
    type Error;

    /// Read the temperature in degrees Celsius.
    ///
    /// Acquisition is synchronous and may block for up to ~100 ms; the
    /// control period must leave room for it.
    fn read(&mut self) -> Result<Temperature, Self::Error>;
}

/// Fake thermometer for testing
#[cfg(any(test, feature = "fake"))]
pub mod fake {
    use core::convert::Infallible;

    use crate::thermometer::{Temperature, Thermometer};

    /// A fake thermometer that returns a settable temperature
    pub struct FakeThermometer {
        temp: Temperature,
    }

    impl FakeThermometer {
        pub fn new(temp: impl Into<Temperature>) -> Self {
            Self { temp: temp.into() }
        }

        /// Get the current temperature
        pub fn temp(&self) -> Temperature {
            self.temp
        }
        /// Get a mutable reference to the current temperature
        pub fn temp_mut(&mut self) -> &mut Temperature {
            &mut self.temp
        }
    }

    impl Thermometer for FakeThermometer {
        type Error = Infallible;

        fn read(&mut self) -> Result<Temperature, Self::Error> {
            Ok(self.temp)
        }
    }
}
