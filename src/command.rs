pub trait OpCode {
    fn op_code(&self) -> u8;
}

/// ROM commands issued right after a reset
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    #[default]
    SearchRom = 0xF0,
    /// Conditional search, only devices in alarm state take part
    SearchRomAlarmed = 0xEC,
}

impl OpCode for Command {
    fn op_code(&self) -> u8 {
        *self as _
    }
}
