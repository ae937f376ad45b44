//! RTD front end: a MAX31865-style RTD-to-digital converter on SPI.
//!
//! One-shot conversions with the bias current dropped between reads to
//! limit element self-heating. A full read costs roughly 75 ms of settling
//! and conversion time; the control period has to absorb that.

use defmt::Format;
use embedded_hal::{
    blocking::delay::DelayMs,
    blocking::spi::{Transfer, Write},
    digital::v2::OutputPin,
};
use tec_ctl::{Temperature, Thermometer};

const REG_CONFIG: u8 = 0x00;
const REG_RTD_MSB: u8 = 0x01;
/// Write access is the register address with the top bit set.
const WRITE: u8 = 0x80;

const CFG_VBIAS: u8 = 0x80;
const CFG_ONE_SHOT: u8 = 0x20;
const CFG_FILTER_50HZ: u8 = 0x01;

/// Reference resistor, in ohms. PT100 boards ship 400 R.
const R_REF: i64 = 400;
/// PT100 element: 100 R at 0 degrees, ~0.385 R per degree.
const R_ZERO_MILLIOHM: i64 = 100_000;
const MILLIOHM_PER_DEGREE: i64 = 385;

#[derive(Debug, Format, Copy, Clone)]
pub enum Error<E> {
    /// SPI transfer failed
    Spi(E),
    /// The converter flagged the element (open or shorted RTD)
    Fault,
}

impl<E> Error<E> {
    pub fn as_str(&self) -> &'static str {
        match self {
            Error::Spi(_) => "SPI error",
            Error::Fault => "RTD fault",
        }
    }
}

impl<E> From<E> for Error<E> {
    fn from(value: E) -> Self {
        Self::Spi(value)
    }
}

pub struct Rtd<SPI, CS, D> {
    spi: SPI,
    cs: CS,
    delay: D,
}

impl<SPI, CS, D, E> Rtd<SPI, CS, D>
where
    SPI: Transfer<u8, Error = E> + Write<u8, Error = E>,
    CS: OutputPin,
    D: DelayMs<u32>,
{
    pub fn new(spi: SPI, cs: CS, delay: D) -> Self {
        Self { spi, cs, delay }
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Error<E>> {
        let _ = self.cs.set_low();
        let res = self.spi.write(&[reg | WRITE, value]);
        let _ = self.cs.set_high();
        res.map_err(Error::Spi)
    }

    fn read_rtd(&mut self) -> Result<u16, Error<E>> {
        let mut buf = [REG_RTD_MSB, 0, 0];
        let _ = self.cs.set_low();
        let res = self.spi.transfer(&mut buf);
        let _ = self.cs.set_high();
        res.map_err(Error::Spi)?;
        Ok(u16::from_be_bytes([buf[1], buf[2]]))
    }
}

impl<SPI, CS, D, E> Thermometer for Rtd<SPI, CS, D>
where
    SPI: Transfer<u8, Error = E> + Write<u8, Error = E>,
    CS: OutputPin,
    D: DelayMs<u32>,
{
    type Error = Error<E>;

    fn read(&mut self) -> Result<Temperature, Self::Error> {
        // Bias the element, let the input filter settle, convert once.
        self.write_reg(REG_CONFIG, CFG_VBIAS | CFG_FILTER_50HZ)?;
        self.delay.delay_ms(10);
        self.write_reg(REG_CONFIG, CFG_VBIAS | CFG_ONE_SHOT | CFG_FILTER_50HZ)?;
        self.delay.delay_ms(65);

        let raw = self.read_rtd()?;
        self.write_reg(REG_CONFIG, CFG_FILTER_50HZ)?;

        if raw & 1 != 0 {
            return Err(Error::Fault);
        }

        // 15-bit code is the RTD/reference resistance ratio times 2^15.
        // Linear PT100 approximation, carried in milliohms/millidegrees so
        // the intermediate products stay inside i64.
        let r_milliohm = i64::from(raw >> 1) * R_REF * 1_000 / 32_768;
        let t_millideg = (r_milliohm - R_ZERO_MILLIOHM) * 1_000 / MILLIOHM_PER_DEGREE;

        let bits = (t_millideg << 16) / 1_000;
        let bits = bits.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        Ok(Temperature::from_bits(bits))
    }
}
