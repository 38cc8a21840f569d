//! Sensor-control command dispatch.
//!
//! One extracted line carries semicolon-delimited tokens:
//!
//! ```text
//! MEASURE;DISPLAY;\n
//! ```
//!
//! A line without a single delimiter is plain data, not a command
//! sequence - it is echoed to the terminal verbatim. Repeating a command
//! back to back is rejected as a likely transmission error. `SLEEP` is
//! terminal for its line: tokens after it are never looked at.

use core::fmt::Write;

use crate::config::MAX_TOKEN_LEN;
use crate::error::LinkError;
use crate::logging::write_bytes;

/// Token delimiter within one command line.
pub const DELIMITER: u8 = b';';

/// Sensor-control verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorCmd {
    Wakeup,
    Measure,
    Display,
    Sleep,
    Help,
}

/// Table entry mapping a token to its verb.
pub struct CommandDescriptor {
    pub name: &'static str,
    pub brief: &'static str,
    pub cmd: SensorCmd,
}

/// The fixed vocabulary, compared case-sensitively.
pub static COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor {
        name: "WAKEUP",
        brief: "wake up from sleep mode",
        cmd: SensorCmd::Wakeup,
    },
    CommandDescriptor {
        name: "MEASURE",
        brief: "measure and send to terminal",
        cmd: SensorCmd::Measure,
    },
    CommandDescriptor {
        name: "DISPLAY",
        brief: "start measuring and display on 8segment",
        cmd: SensorCmd::Display,
    },
    CommandDescriptor {
        name: "SLEEP",
        brief: "enter sleep mode",
        cmd: SensorCmd::Sleep,
    },
    CommandDescriptor {
        name: "HELP",
        brief: "print all commands",
        cmd: SensorCmd::Help,
    },
];

/// Procedures behind the verbs.
///
/// Side effects are procedure-specific: transmitting measurements,
/// starting the display refresh timer, arming the low-power gate. `HELP`
/// is rendered by the dispatcher itself from the descriptor table.
pub trait CommandHost {
    /// Leave sleep mode (re-arm timers, report wake-up).
    fn wakeup(&mut self, out: &mut dyn Write);

    /// Read the sensor and report the temperature.
    fn measure(&mut self, out: &mut dyn Write);

    /// Start the periodic 7-segment refresh.
    fn display(&mut self, out: &mut dyn Write);

    /// Stop timers and arm the low-power gate.
    fn sleep(&mut self, out: &mut dyn Write);
}

/// Print one help line per verb.
pub fn print_help(out: &mut dyn Write) {
    for c in COMMANDS {
        let _ = writeln!(out, "{}; - {}", c.name, c.brief);
    }
}

fn find_command(token: &[u8]) -> Option<&'static CommandDescriptor> {
    if token.is_empty() || token.len() > MAX_TOKEN_LEN {
        return None;
    }
    COMMANDS.iter().find(|c| c.name.as_bytes() == token)
}

/// Dispatch one extracted line.
///
/// `line` runs up to and including the end-of-line byte `eol`. Delimiters
/// are counted before the terminator; that many tokens execute in order,
/// trailing unterminated input is ignored. The duplicate check compares
/// against the last token that matched a known verb.
pub fn dispatch(
    line: &[u8],
    eol: u8,
    host: &mut dyn CommandHost,
    out: &mut dyn Write,
) -> Result<(), LinkError> {
    let body = match line.iter().position(|&b| b == eol) {
        Some(pos) => &line[..pos],
        None => line,
    };

    let cmd_count = body.iter().filter(|&&b| b == DELIMITER).count();

    // no delimiter: plain data, echo and stop
    if cmd_count == 0 {
        let _ = out.write_str("Message received: ");
        write_bytes(out, line);
        return Err(LinkError::NoCommand);
    }

    let mut last: Option<&'static str> = None;

    for token in body.split(|&b| b == DELIMITER).take(cmd_count) {
        if last.is_some_and(|prev| prev.as_bytes() == token) {
            let _ = writeln!(out, "Error, same command twice in a row");
            return Err(LinkError::DuplicateCommand);
        }

        let desc = match find_command(token) {
            Some(desc) => desc,
            None => {
                let _ = writeln!(out, "Command unknown");
                print_help(out);
                return Err(LinkError::NoCommand);
            }
        };

        match desc.cmd {
            SensorCmd::Wakeup => host.wakeup(out),
            SensorCmd::Measure => host.measure(out),
            SensorCmd::Display => host.display(out),
            SensorCmd::Help => print_help(out),
            SensorCmd::Sleep => {
                // terminal for the line: remaining tokens are dropped
                host.sleep(out);
                return Ok(());
            }
        }

        last = Some(desc.name);
    }

    Ok(())
}
