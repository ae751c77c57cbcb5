// Command protocol shared by the binary (CAN) and text (UART) transports

pub mod binary;
pub mod text;

use crate::led::BlinkRequest;
use crate::rpm::ControlScheme;
use crate::state::Lifecycle;

/// Command index (first byte / first number of every request)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CommandIndex {
    Kill = 0,
    Reverse = 1,
    Duty = 2,
    Rpm = 3,
    ControlScheme = 4,
    TargetRpm = 5,
    CyclesPerRotation = 6,
    MotorEnable = 7,
    Blink = 8,
    Buzz = 9,
}

impl CommandIndex {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CommandIndex::Kill),
            1 => Some(CommandIndex::Reverse),
            2 => Some(CommandIndex::Duty),
            3 => Some(CommandIndex::Rpm),
            4 => Some(CommandIndex::ControlScheme),
            5 => Some(CommandIndex::TargetRpm),
            6 => Some(CommandIndex::CyclesPerRotation),
            7 => Some(CommandIndex::MotorEnable),
            8 => Some(CommandIndex::Blink),
            9 => Some(CommandIndex::Buzz),
            _ => None,
        }
    }
}

/// Decoded request
///
/// Setters carry `None` when the request had no payload; they then act as a read-only query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Kill,
    Reverse,
    Duty(Option<u8>),
    Rpm,
    ControlScheme(Option<u8>),
    TargetRpm(Option<u16>),
    CyclesPerRotation(Option<u8>),
    MotorEnable(Option<bool>),
    Blink(BlinkRequest),
    Buzz { period_us: u16, duration_ms: u16 },
}

impl Command {
    pub const fn index(&self) -> CommandIndex {
        match self {
            Command::Kill => CommandIndex::Kill,
            Command::Reverse => CommandIndex::Reverse,
            Command::Duty(_) => CommandIndex::Duty,
            Command::Rpm => CommandIndex::Rpm,
            Command::ControlScheme(_) => CommandIndex::ControlScheme,
            Command::TargetRpm(_) => CommandIndex::TargetRpm,
            Command::CyclesPerRotation(_) => CommandIndex::CyclesPerRotation,
            Command::MotorEnable(_) => CommandIndex::MotorEnable,
            Command::Blink(_) => CommandIndex::Blink,
            Command::Buzz { .. } => CommandIndex::Buzz,
        }
    }
}

/// Response to a request (current value after the command ran)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reply {
    Reverse(bool),
    Duty(u8),
    Rpm(u32),
    ControlScheme(ControlScheme),
    TargetRpm(u16),
    CyclesPerRotation(u8),
    MotorEnabled(bool),
}

/// Follow-up work a transport has to perform after [`crate::esc::Esc::apply`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Nothing left to do
    Done,
    /// Run the spin-up and start with this duty
    Enable(u8),
    /// Play a tone
    Buzz { period_us: u32, duration_ms: u32 },
    /// Blink the status LED
    Blink(BlinkRequest),
    /// Emergency stop performed: halt forever
    Halt,
}

/// Periodic status snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusReport {
    pub rpm: u32,
    pub duty: u8,
    pub lifecycle: Lifecycle,
    pub reverse: bool,
    pub scheme: ControlScheme,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_roundtrip() {
        for raw in 0..=9u8 {
            let index = CommandIndex::from_u8(raw).unwrap();
            assert_eq!(index as u8, raw);
        }
        assert_eq!(CommandIndex::from_u8(10), None);
        assert_eq!(CommandIndex::from_u8(0xFF), None);
    }

    #[test]
    fn test_command_index() {
        assert_eq!(Command::Duty(None).index(), CommandIndex::Duty);
        assert_eq!(
            Command::Buzz {
                period_us: 1000,
                duration_ms: 500
            }
            .index(),
            CommandIndex::Buzz
        );
    }
}
