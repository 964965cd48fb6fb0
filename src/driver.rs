use crate::{IoWire, Transport};
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use thiserror::Error;

/// Error type of the bit-banged line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DriverError<E: Sized + Debug> {
    /// Wire not high before reset, probably shorted to ground
    #[error("wire held low")]
    WireFault,
    #[error("pin error: {0:?}")]
    PortError(E),
}

impl<E: Sized + Debug> From<E> for DriverError<E> {
    fn from(e: E) -> Self {
        DriverError::PortError(e)
    }
}

/// Bit-banged 1-Wire master at standard speed
pub struct Driver<W: IoWire> {
    io_wire: W,
}

impl<E: Debug, W: IoWire<Error = E>> Driver<W> {
    pub fn new(io_wire: W) -> Self {
        Driver { io_wire }
    }

    pub fn release(self) -> W {
        self.io_wire
    }

    /// Reset pulse followed by the presence window
    ///
    /// `Err(WireFault)` when the line never goes high beforehand, otherwise
    /// whether any device pulled the line low during the window.
    pub fn reset(&mut self, delay: &mut impl DelayNs) -> Result<bool, DriverError<E>> {
        self.set_high()?;
        self.ensure_wire_high(delay)?;
        self.set_low()?;
        delay.delay_us(480);
        self.set_high()?;

        let mut presence = false;
        for _ in 0..7 {
            delay.delay_us(10);
            presence |= self.is_low()?;
        }
        delay.delay_us(410);
        Ok(presence)
    }

    fn ensure_wire_high(&mut self, delay: &mut impl DelayNs) -> Result<(), DriverError<E>> {
        for _ in 0..125 {
            if self.is_high()? {
                return Ok(());
            }
            delay.delay_us(2);
        }
        Err(DriverError::WireFault)
    }

    /// Read slot, sampled 5 µs after the falling edge
    pub(crate) fn read_bit(&mut self, delay: &mut impl DelayNs) -> Result<bool, E> {
        self.set_low()?;
        delay.delay_us(3);
        self.set_high()?;
        delay.delay_us(2);
        let val = self.is_high();
        delay.delay_us(61);
        val
    }

    pub(crate) fn write_byte(&mut self, delay: &mut impl DelayNs, byte: u8) -> Result<(), E> {
        let mut byte = byte;
        for _ in 0..8 {
            self.write_bit(delay, (byte & 0x01) == 0x01)?;
            byte >>= 1;
        }
        Ok(())
    }

    pub(crate) fn write_bit(&mut self, delay: &mut impl DelayNs, high: bool) -> Result<(), E> {
        self.set_low()?;
        delay.delay_us(if high { 10 } else { 65 });
        self.set_high()?;
        delay.delay_us(if high { 55 } else { 5 });
        Ok(())
    }

    #[inline(always)]
    pub(crate) fn set_high(&mut self) -> Result<(), E> {
        self.io_wire.set_high()
    }

    #[inline(always)]
    pub(crate) fn set_low(&mut self) -> Result<(), E> {
        self.io_wire.set_low()
    }

    #[inline(always)]
    pub(crate) fn is_high(&mut self) -> Result<bool, E> {
        self.io_wire.is_high()
    }

    #[inline(always)]
    pub(crate) fn is_low(&mut self) -> Result<bool, E> {
        self.io_wire.is_low()
    }
}

impl<E: Debug, W: IoWire<Error = E>> Transport for Driver<W> {
    type Error = DriverError<E>;

    fn reset(&mut self, delay: &mut impl DelayNs) -> Result<bool, Self::Error> {
        Driver::reset(self, delay)
    }

    fn write_byte(&mut self, delay: &mut impl DelayNs, byte: u8) -> Result<(), Self::Error> {
        Driver::write_byte(self, delay, byte).map_err(Into::into)
    }

    fn write_bit(&mut self, delay: &mut impl DelayNs, bit: bool) -> Result<(), Self::Error> {
        Driver::write_bit(self, delay, bit).map_err(Into::into)
    }

    fn read_two_bits(&mut self, delay: &mut impl DelayNs) -> Result<(bool, bool), Self::Error> {
        let bit = self.read_bit(delay)?;
        let complement = self.read_bit(delay)?;
        Ok((bit, complement))
    }
}
