use crate::{Crc8, Error};
use byteorder::{ByteOrder, LittleEndian};
use core::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    ops::Deref,
    str::FromStr,
};

/// 64-bit ROM code of one device: `[family:1][serial:6][crc:1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct RomCode {
    raw: [u8; Self::BYTES as usize],
}

impl From<[u8; Self::BYTES as usize]> for RomCode {
    fn from(raw: [u8; Self::BYTES as usize]) -> Self {
        RomCode { raw }
    }
}

impl From<RomCode> for [u8; RomCode::BYTES as usize] {
    fn from(rom: RomCode) -> [u8; RomCode::BYTES as usize] {
        rom.raw
    }
}

/// Byte 0 is the least significant byte
impl From<u64> for RomCode {
    fn from(value: u64) -> Self {
        let mut raw = [0u8; Self::BYTES as usize];
        LittleEndian::write_u64(&mut raw, value);
        RomCode { raw }
    }
}

impl From<RomCode> for u64 {
    fn from(rom: RomCode) -> u64 {
        LittleEndian::read_u64(&rom.raw)
    }
}

impl Deref for RomCode {
    type Target = [u8; Self::BYTES as usize];

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

impl AsRef<[u8]> for RomCode {
    fn as_ref(&self) -> &[u8] {
        self.deref() as _
    }
}

impl RomCode {
    /// The length of a ROM code in bytes
    pub const BYTES: u8 = 8;

    /// The length of a ROM code in bits
    pub const BITS: u8 = Self::BYTES * 8;

    /// Builds a code from family and serial, filling in the checksum byte
    pub fn new(family_code: u8, serial: [u8; 6]) -> Self {
        let mut raw = [0u8; Self::BYTES as usize];
        raw[0] = family_code;
        raw[1..7].copy_from_slice(&serial);
        raw[7] = Crc8::checksum(&raw[..7]);
        RomCode { raw }
    }

    pub fn family_code(&self) -> u8 {
        self[0]
    }

    pub fn serial(&self) -> [u8; 6] {
        let mut serial = [0u8; 6];
        serial.copy_from_slice(&self[1..7]);
        serial
    }

    /// Stored checksum byte
    pub fn crc(&self) -> u8 {
        self[7]
    }

    /// Checksum over family and serial
    pub fn computed_crc(&self) -> u8 {
        Crc8::checksum(&self[..7])
    }

    pub fn is_valid(&self) -> bool {
        self.computed_crc() == self.crc()
    }

    pub fn validate<E: Debug>(&self) -> Result<(), Error<E>> {
        let computed = self.computed_crc();
        if computed != self.crc() {
            Err(Error::CrcMismatch {
                computed,
                stored: self.crc(),
            })
        } else {
            Ok(())
        }
    }

    /// Bit `index` in search order (bit 0 is the LSB of the family code)
    pub fn bit(&self, index: u8) -> bool {
        if index >= Self::BITS {
            return false;
        }
        self[(index / 8) as usize] & (0x01 << (index % 8)) != 0x00
    }
}

/// Error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RomCodeError {
    NotEnough,
    Invalid,
}

fn hex_to_u8(c: char) -> Option<u8> {
    c.to_digit(16).map(|d| d as u8)
}

impl FromStr for RomCode {
    type Err = RomCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut raw = [0u8; Self::BYTES as usize];
        let mut chars = s.chars().filter(|c| !c.is_whitespace() && *c != ':');

        for byte in raw.iter_mut() {
            match (chars.next(), chars.next()) {
                (Some(h), Some(l)) => match (hex_to_u8(h), hex_to_u8(l)) {
                    (Some(h), Some(l)) => {
                        *byte = (h << 4) | l;
                    }
                    _ => return Err(RomCodeError::Invalid),
                },
                _ => return Err(RomCodeError::NotEnough),
            }
        }

        if chars.next().is_some() {
            return Err(RomCodeError::Invalid);
        }

        Ok(RomCode { raw })
    }
}

impl Display for RomCode {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self[0], self[1], self[2], self[3], self[4], self[5], self[6], self[7],
        )
    }
}
