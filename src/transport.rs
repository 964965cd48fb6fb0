use core::fmt::Debug;
use embedded_hal::delay::DelayNs;

/// Logical 1-Wire operations the ROM search drives
///
/// Every call blocks until the exchange on the bus is complete. The `delay`
/// argument is how the implementation waits between writing a request and
/// sampling the answer, so a bit-banged line can busy-wait while a USB
/// adapter sleeps between its control transfers.
pub trait Transport {
    type Error: Debug;

    /// Reset pulse, `Ok(true)` when at least one device answered with a
    /// presence pulse
    fn reset(&mut self, delay: &mut impl DelayNs) -> Result<bool, Self::Error>;

    fn write_byte(&mut self, delay: &mut impl DelayNs, byte: u8) -> Result<(), Self::Error>;

    fn write_bit(&mut self, delay: &mut impl DelayNs, bit: bool) -> Result<(), Self::Error>;

    /// The two read slots of a search step: `(bit, complement)`, each being
    /// the wired-AND over all devices still taking part
    fn read_two_bits(&mut self, delay: &mut impl DelayNs) -> Result<(bool, bool), Self::Error>;
}

/// Meaning of the two read slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitPair {
    /// `(0, 0)`: participants hold both values at this position
    Collision,
    /// `(0, 1)` or `(1, 0)`: every participant holds the given bit
    Forced(bool),
    /// `(1, 1)`: nobody answered
    NoResponse,
}

impl BitPair {
    pub fn from_slots(bit: bool, complement: bool) -> Self {
        match (bit, complement) {
            (false, false) => BitPair::Collision,
            (true, true) => BitPair::NoResponse,
            (bit, _) => BitPair::Forced(bit),
        }
    }

    /// Packed form `bit | complement << 1`, as some USB adapters report it
    pub fn from_raw(raw: u8) -> Self {
        Self::from_slots(raw & 0x01 != 0, raw & 0x02 != 0)
    }
}
