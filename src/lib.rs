#![no_std]
#![doc = include_str!("../README.md")]

extern crate alloc;
#[cfg(test)]
extern crate std;

mod command;
mod crc8;
mod driver;
mod iowire;
mod result;
mod rom;
mod search;
#[cfg(test)]
mod sim;
mod transport;

pub use command::{Command, OpCode};
pub use crc8::{Crc8, Crc8Table, DALLAS, DALLAS_POLY, DALLAS_POLY_REFLECTED};
pub use driver::{Driver, DriverError};
pub use iowire::{Inverted, IoWire};
pub use result::{Error, ErrorKind};
pub use rom::{RomCode, RomCodeError};
pub use search::{
    search_devices, Branch, BranchFailure, RomSearch, RomSearchIter, SearchConfig, SearchReport,
    DEFAULT_ATTEMPTS,
};
pub use transport::{BitPair, Transport};
