//! TEC current DAC interface.
//!
//! The TEC driver takes a signed 16-bit code: negative codes drive cooling
//! current, zero turns the output stage off. The bang-bang law only ever
//! commands the two extremes; the raw override command accepts anything in
//! range.

use core::{fmt, num::ParseIntError, str::FromStr};

/// Signed DAC output code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DacCode(pub i16);

static_assertions::assert_eq_size!(DacCode, u16);

impl DacCode {
    /// Full-scale cooling drive.
    pub const FULL_NEGATIVE: Self = Self(i16::MIN);
    /// Output stage off.
    pub const ZERO: Self = Self(0);
}

impl From<i16> for DacCode {
    fn from(code: i16) -> Self {
        Self(code)
    }
}

impl FromStr for DacCode {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl fmt::Display for DacCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Driver programming the TEC current DAC.
pub trait Dac {
    type Error;

    /// Program the output code. Fire-and-forget; the analog slew is the
    /// hardware's business.
    fn set(&mut self, code: DacCode) -> Result<(), Self::Error>;
}

/// Fake DAC for testing
#[cfg(any(test, feature = "fake"))]
pub mod fake {
    use core::convert::Infallible;

    use super::{Dac, DacCode};

    /// A fake DAC remembering what was last commanded.
    pub struct FakeDac {
        last: DacCode,
        writes: usize,
    }

    impl FakeDac {
        pub const fn new() -> Self {
            Self {
                last: DacCode::ZERO,
                writes: 0,
            }
        }

        /// Last commanded code.
        pub fn last(&self) -> DacCode {
            self.last
        }

        /// Number of codes programmed so far.
        pub fn writes(&self) -> usize {
            self.writes
        }
    }

    impl Default for FakeDac {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Dac for FakeDac {
        type Error = Infallible;

        fn set(&mut self, code: DacCode) -> Result<(), Self::Error> {
            self.last = code;
            self.writes += 1;
            Ok(())
        }
    }
}
