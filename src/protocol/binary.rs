// Binary command codec (carried over CAN)
//
// Request frame:  [index, payload...]   multi-byte values are big-endian
// Response frame: [index, value...]

use super::{Command, CommandIndex, Reply, StatusReport};
use crate::led::BlinkRequest;
use crate::rpm::ControlScheme;
use crate::state::Lifecycle;

/// CAN message IDs (the device address is added to each base)
pub mod can_ids {
    /// Command request ([index, payload...])
    pub const REQUEST_BASE: u32 = 0x300;

    /// Command response ([index, value...])
    pub const RESPONSE_BASE: u32 = 0x380;

    /// Periodic status (rpm: u16, duty: u8, lifecycle: u8, flags: u8, 5 bytes)
    pub const STATUS_BASE: u32 = 0x200;

    pub const fn request(address: u8) -> u32 {
        REQUEST_BASE + address as u32
    }

    pub const fn response(address: u8) -> u32 {
        RESPONSE_BASE + address as u32
    }

    pub const fn status(address: u8) -> u32 {
        STATUS_BASE + address as u32
    }
}

/// Status flag bits
pub mod status_flags {
    pub const REVERSE: u8 = 0x01;
    pub const RPM_SCHEME: u8 = 0x02;
}

fn read_word(data: &[u8]) -> Option<u16> {
    if data.len() < 2 {
        return None;
    }
    Some(u16::from_be_bytes([data[0], data[1]]))
}

/// Parse a command request
///
/// # Arguments
/// * `data` - frame data, first byte is the command index
///
/// # Returns
/// * `Some(command)` for a known index; setters without payload become queries
/// * `None` for an empty frame, an unknown index or a Blink/Buzz frame shorter than 4 payload bytes
pub fn parse_frame(data: &[u8]) -> Option<Command> {
    let (&raw_index, payload) = data.split_first()?;

    let Some(index) = CommandIndex::from_u8(raw_index) else {
        debug!("Binary command: unknown index {}", raw_index);
        return None;
    };

    let byte = payload.first().copied();

    let command = match index {
        CommandIndex::Kill => Command::Kill,
        CommandIndex::Reverse => Command::Reverse,
        CommandIndex::Duty => Command::Duty(byte),
        CommandIndex::Rpm => Command::Rpm,
        CommandIndex::ControlScheme => Command::ControlScheme(byte),
        CommandIndex::TargetRpm => Command::TargetRpm(read_word(payload)),
        CommandIndex::CyclesPerRotation => Command::CyclesPerRotation(byte),
        CommandIndex::MotorEnable => Command::MotorEnable(byte.map(|b| b != 0)),
        CommandIndex::Blink => {
            let period_ms = read_word(payload)?;
            let count = read_word(payload.get(2..)?)?;
            Command::Blink(BlinkRequest { period_ms, count })
        }
        CommandIndex::Buzz => {
            let period_us = read_word(payload)?;
            let duration_ms = read_word(payload.get(2..)?)?;
            Command::Buzz {
                period_us,
                duration_ms,
            }
        }
    };

    Some(command)
}

/// Encoded response frame (index byte plus up to two value bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFrame {
    bytes: [u8; 3],
    len: usize,
}

impl ResponseFrame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

fn byte_frame(index: CommandIndex, value: u8) -> ResponseFrame {
    ResponseFrame {
        bytes: [index as u8, value, 0],
        len: 2,
    }
}

fn word_frame(index: CommandIndex, value: u16) -> ResponseFrame {
    let [high, low] = value.to_be_bytes();
    ResponseFrame {
        bytes: [index as u8, high, low],
        len: 3,
    }
}

/// Encode a reply
///
/// Bytes for flags and small values, big-endian words for RPM figures
/// (the measured RPM saturates at `u16::MAX`).
pub fn encode_reply(reply: Reply) -> ResponseFrame {
    match reply {
        Reply::Reverse(reverse) => byte_frame(CommandIndex::Reverse, reverse as u8),
        Reply::Duty(duty) => byte_frame(CommandIndex::Duty, duty),
        Reply::Rpm(rpm) => word_frame(CommandIndex::Rpm, rpm.min(u16::MAX as u32) as u16),
        Reply::ControlScheme(scheme) => byte_frame(CommandIndex::ControlScheme, scheme as u8),
        Reply::TargetRpm(rpm) => word_frame(CommandIndex::TargetRpm, rpm),
        Reply::CyclesPerRotation(cycles) => byte_frame(CommandIndex::CyclesPerRotation, cycles),
        Reply::MotorEnabled(enabled) => byte_frame(CommandIndex::MotorEnable, enabled as u8),
    }
}

/// Encode the periodic status frame
pub fn encode_status(status: &StatusReport) -> [u8; 5] {
    let mut data = [0u8; 5];

    let rpm = status.rpm.min(u16::MAX as u32) as u16;
    data[0..2].copy_from_slice(&rpm.to_be_bytes());
    data[2] = status.duty;
    data[3] = status.lifecycle as u8;

    let mut flags = 0;
    if status.reverse {
        flags |= status_flags::REVERSE;
    }
    if status.scheme == ControlScheme::Rpm {
        flags |= status_flags::RPM_SCHEME;
    }
    data[4] = flags;

    data
}

/// Decode the periodic status frame
pub fn decode_status(data: &[u8]) -> Option<StatusReport> {
    if data.len() < 5 {
        return None;
    }

    let scheme = if data[4] & status_flags::RPM_SCHEME != 0 {
        ControlScheme::Rpm
    } else {
        ControlScheme::Duty
    };

    Some(StatusReport {
        rpm: u16::from_be_bytes([data[0], data[1]]) as u32,
        duty: data[2],
        lifecycle: Lifecycle::from_u8(data[3]),
        reverse: data[4] & status_flags::REVERSE != 0,
        scheme,
    })
}
