use core::fmt::{Display, Formatter, Result as FmtResult};

/// Dallas 1-Wire CRC8 polynomial: x^8 + x^5 + x^4 + x^0
pub const DALLAS_POLY: u8 = 0x31;

/// Bit-reflected form of [`DALLAS_POLY`]
pub const DALLAS_POLY_REFLECTED: u8 = 0x8C;

const TABLE_SIZE: usize = 1 << 8;

/// Reflected Dallas table, built at compile time and shared by every [`Crc8`]
pub static DALLAS: Crc8Table = Crc8Table::reflected(DALLAS_POLY_REFLECTED);

/// Byte-at-a-time CRC8 lookup table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crc8Table {
    table: [u8; TABLE_SIZE],
}

impl Crc8Table {
    /// Table for LSB-first processing, `poly` given in reflected form
    pub const fn reflected(poly: u8) -> Self {
        let mut table = [0u8; TABLE_SIZE];
        let mut i = 0;
        while i < TABLE_SIZE {
            let mut crc = i as u8;
            let mut step = 0;
            while step < 8 {
                let carry = crc & 0x01 != 0;
                crc >>= 1;
                if carry {
                    crc ^= poly;
                }
                step += 1;
            }
            table[i] = crc;
            i += 1;
        }
        Crc8Table { table }
    }

    /// Table for MSB-first processing, `poly` given in direct form
    pub const fn direct(poly: u8) -> Self {
        let mut table = [0u8; TABLE_SIZE];
        let mut i = 0;
        while i < TABLE_SIZE {
            let mut crc = i as u8;
            let mut step = 0;
            while step < 8 {
                let carry = crc & 0x80 != 0;
                crc <<= 1;
                if carry {
                    crc ^= poly;
                }
                step += 1;
            }
            table[i] = crc;
            i += 1;
        }
        Crc8Table { table }
    }

    #[inline(always)]
    pub fn lookup(&self, index: u8) -> u8 {
        self.table[index as usize]
    }
}

/// Running CRC8 register
///
/// Feeding `[a, b]` in one call gives the same value as feeding `[a]` then
/// `[b]`. Call [`Crc8::reset`] before reusing an accumulator for unrelated
/// data.
#[derive(Debug, Clone)]
pub struct Crc8<'t> {
    table: &'t Crc8Table,
    crc: u8,
}

impl Default for Crc8<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc8<'static> {
    /// Accumulator over the [`DALLAS`] table
    pub fn new() -> Self {
        Self::with_table(&DALLAS)
    }

    /// Dallas CRC8 of `data` in one go
    pub fn checksum(data: &[u8]) -> u8 {
        let mut crc = Self::new();
        crc.update(data)
    }
}

impl<'t> Crc8<'t> {
    pub fn with_table(table: &'t Crc8Table) -> Self {
        Crc8 { table, crc: 0 }
    }

    pub fn update(&mut self, data: &[u8]) -> u8 {
        for byte in data {
            self.crc = self.table.lookup(self.crc ^ byte);
        }
        self.crc
    }

    pub fn reset(&mut self) {
        self.crc = 0;
    }

    pub fn value(&self) -> u8 {
        self.crc
    }
}

impl Display for Crc8<'_> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{:02x}", self.crc)
    }
}

#[cfg(test)]
mod test {
    use super::{Crc8, Crc8Table, DALLAS, DALLAS_POLY, DALLAS_POLY_REFLECTED};
    use std::string::ToString;

    const DS2401_ROM: [u8; 7] = [0x02, 0x1c, 0xb8, 0x01, 0x00, 0x00, 0x00];
    const DS18B20_ROM: [u8; 7] = [0x28, 0xc2, 0x84, 0xbd, 0x01, 0x00, 0x00];

    // shift-register form, one bit at a time
    fn bitwise(crc: u8, data: &[u8]) -> u8 {
        let mut crc = crc;
        for byte in data.iter() {
            let mut byte = *byte;
            for _ in 0..8 {
                let mix = (crc ^ byte) & 0x01;
                crc >>= 1;
                if mix != 0x00 {
                    crc ^= DALLAS_POLY_REFLECTED;
                }
                byte >>= 1;
            }
        }
        crc
    }

    #[test]
    fn known_rom_checksums() {
        let mut crc = Crc8::new();
        assert_eq!(crc.update(&DS2401_ROM), 0xa2);
        assert_eq!(crc.value(), 0xa2);

        crc.reset();
        crc.update(&DS18B20_ROM);
        assert_eq!(crc.value(), 0x9c);
    }

    #[test]
    fn table_is_deterministic() {
        let table = Crc8Table::reflected(DALLAS_POLY_REFLECTED);
        assert_eq!(table, DALLAS);
        assert_eq!(table, Crc8Table::reflected(DALLAS_POLY_REFLECTED));
        assert_eq!(table.lookup(0), 0);
        assert_eq!(table.lookup(1), 0x5e);
        assert_eq!(table.lookup(0x80), 0x8c);
    }

    #[test]
    fn table_matches_bitwise_reference() {
        for i in 0..=255u8 {
            assert_eq!(DALLAS.lookup(i), bitwise(0, &[i]), "entry {:#04x}", i);
        }
        assert_eq!(Crc8::checksum(&DS18B20_ROM), bitwise(0, &DS18B20_ROM));
    }

    #[test]
    fn reset_matches_fresh_accumulator() {
        let mut reused = Crc8::new();
        reused.update(&[0xde, 0xad, 0xbe, 0xef]);
        reused.reset();
        assert_eq!(reused.value(), 0);
        assert_eq!(reused.update(&DS2401_ROM), Crc8::new().update(&DS2401_ROM));
    }

    #[test]
    fn split_updates_concatenate() {
        let (head, tail) = DS18B20_ROM.split_at(3);
        let mut split = Crc8::new();
        split.update(head);
        split.update(tail);
        assert_eq!(split.value(), Crc8::checksum(&DS18B20_ROM));
    }

    #[test]
    fn empty_input_keeps_register() {
        let mut crc = Crc8::new();
        assert_eq!(crc.update(&[]), 0);
        crc.update(&DS2401_ROM);
        assert_eq!(crc.update(&[]), 0xa2);
    }

    #[test]
    fn trailing_checksum_clears_register() {
        let mut crc = Crc8::new();
        crc.update(&DS2401_ROM);
        assert_eq!(crc.update(&[0xa2]), 0);
    }

    #[test]
    fn direct_table_mirrors_reflected() {
        let direct = Crc8Table::direct(DALLAS_POLY);
        let mirrored: std::vec::Vec<u8> = DS18B20_ROM.iter().map(|b| b.reverse_bits()).collect();
        let mut crc = Crc8::with_table(&direct);
        crc.update(&mirrored);
        assert_eq!(crc.value().reverse_bits(), 0x9c);
    }

    #[test]
    fn display_as_hex() {
        let mut crc = Crc8::new();
        crc.update(&DS2401_ROM);
        assert_eq!(crc.to_string(), "a2");
    }
}
