//! Simulated multi-drop bus
//!
//! Every device drives the two read slots with its bit and the complement,
//! the line reads as the wired-AND of all devices still taking part, and a
//! written bit drops every device that holds the other value.

use crate::{Command, OpCode, RomCode, Transport};
use embedded_hal::delay::DelayNs;
use std::vec::Vec;

pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimFault {
    Glitch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Command,
    Search { bit: u8 },
}

struct SimDevice {
    rom: u64,
    alarmed: bool,
    active: bool,
}

pub struct SimBus {
    devices: Vec<SimDevice>,
    phase: Phase,
    unplug: Option<(usize, u64)>,
    pub resets: usize,
    /// Search commands received
    pub passes: usize,
    /// Number of upcoming reads that fail
    pub fail_reads: usize,
    /// Every read fails once more than this many searches were started
    pub fail_after_passes: Option<usize>,
}

impl SimBus {
    pub fn new(roms: &[RomCode]) -> Self {
        SimBus {
            devices: roms
                .iter()
                .map(|rom| SimDevice {
                    rom: u64::from(*rom),
                    alarmed: false,
                    active: false,
                })
                .collect(),
            phase: Phase::Idle,
            unplug: None,
            resets: 0,
            passes: 0,
            fail_reads: 0,
            fail_after_passes: None,
        }
    }

    pub fn set_alarmed(&mut self, rom: RomCode) {
        let rom = u64::from(rom);
        for device in self.devices.iter_mut().filter(|d| d.rom == rom) {
            device.alarmed = true;
        }
    }

    /// Removes `rom` at the first reset after `passes` searches
    pub fn unplug_after(&mut self, passes: usize, rom: RomCode) {
        self.unplug = Some((passes, u64::from(rom)));
    }

    fn participants(&self) -> impl Iterator<Item = &SimDevice> {
        self.devices.iter().filter(|d| d.active)
    }
}

impl Transport for SimBus {
    type Error = SimFault;

    fn reset(&mut self, _delay: &mut impl DelayNs) -> Result<bool, Self::Error> {
        self.resets += 1;
        if let Some((passes, rom)) = self.unplug {
            if self.passes >= passes {
                self.devices.retain(|d| d.rom != rom);
                self.unplug = None;
            }
        }
        for device in self.devices.iter_mut() {
            device.active = false;
        }
        self.phase = Phase::Command;
        Ok(!self.devices.is_empty())
    }

    fn write_byte(&mut self, _delay: &mut impl DelayNs, byte: u8) -> Result<(), Self::Error> {
        if self.phase != Phase::Command {
            self.phase = Phase::Idle;
            return Ok(());
        }
        let alarmed_only = if byte == Command::SearchRom.op_code() {
            false
        } else if byte == Command::SearchRomAlarmed.op_code() {
            true
        } else {
            self.phase = Phase::Idle;
            return Ok(());
        };
        for device in self.devices.iter_mut() {
            device.active = !alarmed_only || device.alarmed;
        }
        self.passes += 1;
        self.phase = Phase::Search { bit: 0 };
        Ok(())
    }

    fn write_bit(&mut self, _delay: &mut impl DelayNs, value: bool) -> Result<(), Self::Error> {
        if let Phase::Search { bit } = self.phase {
            for device in self.devices.iter_mut() {
                if ((device.rom >> bit) & 0x01 == 0x01) != value {
                    device.active = false;
                }
            }
            self.phase = if bit + 1 < RomCode::BITS {
                Phase::Search { bit: bit + 1 }
            } else {
                Phase::Idle
            };
        }
        Ok(())
    }

    fn read_two_bits(&mut self, _delay: &mut impl DelayNs) -> Result<(bool, bool), Self::Error> {
        if self.fail_reads > 0 {
            self.fail_reads -= 1;
            return Err(SimFault::Glitch);
        }
        if matches!(self.fail_after_passes, Some(passes) if self.passes > passes) {
            return Err(SimFault::Glitch);
        }
        let bit = match self.phase {
            Phase::Search { bit } => bit,
            _ => return Ok((true, true)),
        };
        let all_one = self.participants().all(|d| (d.rom >> bit) & 0x01 == 0x01);
        let all_zero = self.participants().all(|d| (d.rom >> bit) & 0x01 == 0x00);
        Ok((all_one, all_zero))
    }
}

/// Device code with a valid checksum, `serial` taken as 48 bits
pub fn rom(family: u8, serial: u64) -> RomCode {
    let bytes = serial.to_le_bytes();
    let mut serial = [0u8; 6];
    serial.copy_from_slice(&bytes[..6]);
    RomCode::new(family, serial)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod test {
    use super::{rom, NoDelay, SimBus};
    use crate::Transport;

    #[test]
    fn wired_and_of_participants() {
        let a = rom(0x28, 0x01);
        let b = rom(0x28, 0x02);
        let mut bus = SimBus::new(&[a, b]);
        let mut delay = NoDelay;
        assert_eq!(bus.reset(&mut delay), Ok(true));
        bus.write_byte(&mut delay, 0xF0).unwrap();
        // family bit 0 is 0 on both
        assert_eq!(bus.read_two_bits(&mut delay), Ok((false, true)));

        for _ in 0..8 {
            let (bit, _) = bus.read_two_bits(&mut delay).unwrap();
            bus.write_bit(&mut delay, bit).unwrap();
        }
        // serial bit 0 differs
        assert_eq!(bus.read_two_bits(&mut delay), Ok((false, false)));
    }
}
