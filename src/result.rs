use crate::RomCode;
use core::fmt::Debug;
use thiserror::Error;

/// Error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error<E: Sized + Debug> {
    /// The transport reported a failure
    #[error("transport failure: {0:?}")]
    Transport(E),
    /// No presence pulse after reset
    #[error("no presence pulse on the bus")]
    NoPresence,
    /// Both read slots high: nobody is taking part any more
    #[error("no device answered at bit {bit}")]
    NoResponse { bit: u8 },
    /// The devices on the bus disagree with an already forced prefix bit
    #[error("bus diverged from the forced path at bit {bit}")]
    PathDiverged { bit: u8 },
    #[error("search produced an all-zero ROM code")]
    AllZeroRom,
    #[error("CRC mismatch: computed {computed:#04x}, stored {stored:#04x}")]
    CrcMismatch { computed: u8, stored: u8 },
    /// Two branches produced the same ROM code
    #[error("ROM code {0} found twice")]
    DuplicateRom(RomCode),
}

/// Coarse classification of [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TransportFailure,
    NoPresence,
    BusProtocolViolation,
    ChecksumMismatch,
}

impl<E: Sized + Debug> Error<E> {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(_) => ErrorKind::TransportFailure,
            Error::NoPresence => ErrorKind::NoPresence,
            Error::NoResponse { .. }
            | Error::PathDiverged { .. }
            | Error::AllZeroRom
            | Error::DuplicateRom(_) => ErrorKind::BusProtocolViolation,
            Error::CrcMismatch { .. } => ErrorKind::ChecksumMismatch,
        }
    }
}

impl<E: Sized + Debug> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::Transport(e)
    }
}
