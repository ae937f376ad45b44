//! TEC current DAC: an AD5662-style 16-bit DAC, bit-banged.
//!
//! The F042 has a single SPI peripheral and the RTD converter owns it, so
//! the DAC gets a software interface on three GPIOs. At the handful of
//! writes per second the loop produces, speed is irrelevant.

use embedded_hal::digital::v2::OutputPin;
use tec_ctl::{Dac, DacCode};

/// Mode bits 00 (normal operation) in the top byte of the 24-bit frame.
const FRAME_LEN: u32 = 24;

pub struct TecDac<SCLK, SYNC, DIN> {
    sclk: SCLK,
    sync: SYNC,
    din: DIN,
}

impl<SCLK, SYNC, DIN> TecDac<SCLK, SYNC, DIN>
where
    SCLK: OutputPin,
    SYNC: OutputPin,
    DIN: OutputPin,
{
    pub fn new(mut sclk: SCLK, mut sync: SYNC, din: DIN) -> Self {
        let _ = sync.set_high();
        let _ = sclk.set_high();
        Self { sclk, sync, din }
    }

    fn shift_out(&mut self, frame: u32) {
        let _ = self.sync.set_low();
        for bit in (0..FRAME_LEN).rev() {
            if frame >> bit & 1 == 1 {
                let _ = self.din.set_high();
            } else {
                let _ = self.din.set_low();
            }
            // Data is latched on the falling clock edge.
            let _ = self.sclk.set_high();
            cortex_m::asm::delay(8);
            let _ = self.sclk.set_low();
            cortex_m::asm::delay(8);
        }
        let _ = self.sclk.set_high();
        let _ = self.sync.set_high();
    }
}

impl<SCLK, SYNC, DIN> Dac for TecDac<SCLK, SYNC, DIN>
where
    SCLK: OutputPin,
    SYNC: OutputPin,
    DIN: OutputPin,
{
    type Error = core::convert::Infallible;

    fn set(&mut self, code: DacCode) -> Result<(), Self::Error> {
        // The converter wants offset binary: full-scale negative is 0x0000.
        let word = (i32::from(code.0) + 32_768) as u32;
        self.shift_out(word);
        Ok(())
    }
}
