// Text command codec (carried over UART)
//
// A request is a run of decimal numbers separated by any non-digit characters,
// e.g. "2-100" (set duty to 100) or "8a2000a5" (blink 5 times, 2000 ms period).
// The first number is the command index, the following numbers are the payload.

use core::fmt::Write;

use heapless::String;

use super::{Command, CommandIndex, Reply};
use crate::led::BlinkRequest;
use crate::rpm::ControlScheme;

/// Maximum length of one formatted line
pub const LINE_CAPACITY: usize = 64;

pub type Line = String<LINE_CAPACITY>;

/// Iterator over the decimal numbers contained in a request
struct Numbers<'a> {
    bytes: &'a [u8],
}

impl Iterator for Numbers<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let start = self.bytes.iter().position(u8::is_ascii_digit)?;
        let rest = &self.bytes[start..];
        let len = rest
            .iter()
            .position(|b| !b.is_ascii_digit())
            .unwrap_or(rest.len());

        let value = rest[..len].iter().fold(0u32, |acc, b| {
            acc.saturating_mul(10).saturating_add((b - b'0') as u32)
        });

        self.bytes = &rest[len..];
        Some(value)
    }
}

fn as_u8(value: Option<u32>) -> Option<u8> {
    value.and_then(|v| u8::try_from(v).ok())
}

fn as_u16(value: Option<u32>) -> Option<u16> {
    value.and_then(|v| u16::try_from(v).ok())
}

/// Parse one request line
///
/// # Returns
/// * `Some(command)` for a known index; a missing or out-of-range payload makes a setter a query
/// * `None` when the line holds no number, the index is unknown, or Blink/Buzz lack a parameter
pub fn parse_line(line: &[u8]) -> Option<Command> {
    let mut numbers = Numbers { bytes: line };

    let raw_index = numbers.next()?;
    let Some(index) = as_u8(Some(raw_index)).and_then(CommandIndex::from_u8) else {
        debug!("Text command: unknown index {}", raw_index);
        return None;
    };

    let command = match index {
        CommandIndex::Kill => Command::Kill,
        CommandIndex::Reverse => Command::Reverse,
        CommandIndex::Duty => Command::Duty(as_u8(numbers.next())),
        CommandIndex::Rpm => Command::Rpm,
        CommandIndex::ControlScheme => Command::ControlScheme(as_u8(numbers.next())),
        CommandIndex::TargetRpm => Command::TargetRpm(as_u16(numbers.next())),
        CommandIndex::CyclesPerRotation => Command::CyclesPerRotation(as_u8(numbers.next())),
        CommandIndex::MotorEnable => Command::MotorEnable(numbers.next().map(|v| v != 0)),
        CommandIndex::Blink => {
            let period_ms = as_u16(numbers.next())?;
            let count = as_u16(numbers.next())?;
            Command::Blink(BlinkRequest { period_ms, count })
        }
        CommandIndex::Buzz => {
            let period_us = as_u16(numbers.next())?;
            let duration_ms = as_u16(numbers.next())?;
            Command::Buzz {
                period_us,
                duration_ms,
            }
        }
    };

    Some(command)
}

/// Format a reply as a human readable line
pub fn format_reply(reply: &Reply) -> Line {
    let mut line = Line::new();

    // Every message fits in LINE_CAPACITY
    let _ = match *reply {
        Reply::Reverse(true) => write!(line, "ESC is spinning in reverse."),
        Reply::Reverse(false) => write!(line, "ESC is spinning normally."),
        Reply::Duty(duty) => write!(line, "Current PWM duty: {}", duty),
        Reply::Rpm(rpm) => write!(line, "Current RPM: {}", rpm),
        Reply::ControlScheme(ControlScheme::Duty) => write!(line, "PWM control"),
        Reply::ControlScheme(ControlScheme::Rpm) => write!(line, "RPM control"),
        Reply::TargetRpm(rpm) => write!(line, "Target RPM: {}", rpm),
        Reply::CyclesPerRotation(cycles) => write!(
            line,
            "Cycles in a rotation: {} ({} steps)",
            cycles,
            cycles as u32 * 6
        ),
        Reply::MotorEnabled(true) => write!(line, "! MOTOR ENABLED !"),
        Reply::MotorEnabled(false) => write!(line, "! MOTOR DISABLED !"),
    };

    line
}

/// Acknowledgement printed for commands that have no reply
pub fn format_acknowledge(command: &Command) -> Option<Line> {
    let mut line = Line::new();

    let _ = match *command {
        Command::Kill => write!(line, "DISABLING MOTOR PERMANENTLY"),
        Command::Blink(request) => write!(
            line,
            "Blinking LED for {} ms, {} times.",
            request.period_ms, request.count
        ),
        Command::Buzz {
            period_us,
            duration_ms,
        } => write!(
            line,
            "Buzzing with period of {} us for {} ms.",
            period_us, duration_ms
        ),
        _ => return None,
    };

    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_dash_separator() {
        assert_eq!(parse_line(b"2-100\n"), Some(Command::Duty(Some(100))));
        assert_eq!(parse_line(b"2\r\n"), Some(Command::Duty(None)));
    }

    #[test]
    fn test_parse_letter_separated_parameters() {
        assert_eq!(
            parse_line(b"8a2000a5"),
            Some(Command::Blink(BlinkRequest {
                period_ms: 2000,
                count: 5
            }))
        );
        assert_eq!(
            parse_line(b"9a1000a500"),
            Some(Command::Buzz {
                period_us: 1000,
                duration_ms: 500
            })
        );
        assert_eq!(parse_line(b"9a1000"), None);
    }

    #[test]
    fn test_out_of_range_payload_is_query() {
        assert_eq!(parse_line(b"2-300"), Some(Command::Duty(None)));
        assert_eq!(parse_line(b"5-70000"), Some(Command::TargetRpm(None)));
        assert_eq!(parse_line(b"5-1500"), Some(Command::TargetRpm(Some(1500))));
    }

    #[test]
    fn test_line_without_number_is_ignored() {
        // a line without digits must not be read as Kill (0)
        assert_eq!(parse_line(b""), None);
        assert_eq!(parse_line(b"\r\n"), None);
        assert_eq!(parse_line(b"abc"), None);
    }

    #[test]
    fn test_kill_and_unknown() {
        assert_eq!(parse_line(b"0"), Some(Command::Kill));
        assert_eq!(parse_line(b"42"), None);
        assert_eq!(parse_line(b"99999999999"), None);
    }

    #[test]
    fn test_format_reply() {
        assert_eq!(format_reply(&Reply::Duty(100)).as_str(), "Current PWM duty: 100");
        assert_eq!(format_reply(&Reply::Rpm(1234)).as_str(), "Current RPM: 1234");
        assert_eq!(
            format_reply(&Reply::CyclesPerRotation(2)).as_str(),
            "Cycles in a rotation: 2 (12 steps)"
        );
        assert_eq!(
            format_reply(&Reply::Reverse(true)).as_str(),
            "ESC is spinning in reverse."
        );
    }

    #[test]
    fn test_format_acknowledge() {
        let line = format_acknowledge(&Command::Buzz {
            period_us: 1000,
            duration_ms: 500,
        });
        assert_eq!(
            line.as_deref(),
            Some("Buzzing with period of 1000 us for 500 ms.")
        );
        assert!(format_acknowledge(&Command::Rpm).is_none());
    }
}
