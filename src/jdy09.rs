//! JDY-09 Bluetooth module driver.
//!
//! AT-style configuration while the module is disconnected, transparent
//! data forwarding while connected. The module's STATE pin decides which:
//!
//! ```text
//! STATE EXTI ──▶ ConnectionGate ──▶ gates AT vs data,
//!                                   flushes the RX queue on every edge
//! UART RX IRQ ──▶ LineQueue ──▶ response lines for command round-trips
//! ```
//!
//! The driver itself runs in the foreground and may block: one command
//! round-trip transmits, then busy-waits for a single response line inside
//! the fixed timeout. No retry anywhere - a failed command is reported and
//! abandoned.

use core::fmt::Write;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::config::{LinkConfig, MAX_CMD_LEN, MAX_LINE_LEN, MAX_NAME_LEN, MAX_PIN_LEN};
use crate::error::LinkError;
use crate::frame::{LineQueue, MessageStatus};
use crate::logging::{write_bytes, LogStream};
use crate::transport::{Clock, Transport};

/// Connection state derived from the STATE pin.
///
/// Created disconnected at init; transitions only on edge events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connected,
}

/// Query commands with a fixed wire string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtCommand {
    Version,
    Reset,
    Laddr,
    Baud,
    Pin,
    Name,
    Default,
}

impl AtCommand {
    /// Wire bytes, CRLF-terminated.
    pub fn wire(&self) -> &'static [u8] {
        match self {
            Self::Version => b"AT+VERSION\r\n",
            Self::Reset => b"AT+RESET\r\n",
            Self::Laddr => b"AT+LADDR\r\n",
            Self::Baud => b"AT+BAUD\r\n",
            Self::Pin => b"AT+PIN\r\n",
            Self::Name => b"AT+NAME\r\n",
            Self::Default => b"AT+DEFAULT\r\n",
        }
    }
}

/// Baud rate codes understood by `AT+BAUD<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BaudRate {
    B9600 = 4,
    B19200 = 5,
    B38400 = 6,
    B57600 = 7,
    B115200 = 8,
    B128000 = 9,
}

impl BaudRate {
    /// Code digit on the wire.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Bits per second.
    pub fn bps(self) -> u32 {
        match self {
            Self::B9600 => 9_600,
            Self::B19200 => 19_200,
            Self::B38400 => 38_400,
            Self::B57600 => 57_600,
            Self::B115200 => 115_200,
            Self::B128000 => 128_000,
        }
    }
}

/// Link-state tracking and RX hygiene for one module.
///
/// Registered against the STATE pin's edge callback. Every transition, in
/// either direction, flushes the associated receive queue: partial data
/// accumulated in the previous state cannot be trusted.
pub struct ConnectionGate<'a, const N: usize> {
    queue: &'a LineQueue<N>,
    log: &'a LogStream,

    /// STATE pin number this gate listens to.
    pin: u8,

    connected: AtomicBool,
}

impl<'a, const N: usize> ConnectionGate<'a, N> {
    /// Create a gate in the disconnected state.
    pub const fn new(queue: &'a LineQueue<N>, log: &'a LogStream, pin: u8) -> Self {
        Self {
            queue,
            log,
            pin,
            connected: AtomicBool::new(false),
        }
    }

    /// Edge callback. `level` is the STATE pin level after the edge:
    /// high on a new connection, low on a disconnect.
    ///
    /// Interrupt-safe: notification goes through the log stream, never the
    /// terminal UART.
    pub fn on_edge(&self, pin: u8, level: bool) {
        if pin != self.pin {
            return;
        }

        self.connected.store(level, Ordering::Release);

        if level {
            crate::link_info!(self.log, "device connected");
        } else {
            crate::link_info!(self.log, "device disconnected");
        }

        // stale partial data from the previous state is useless
        self.queue.flush();
    }

    pub fn state(&self) -> LinkState {
        if self.is_connected() {
            LinkState::Connected
        } else {
            LinkState::Disconnected
        }
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

/// Scratch buffer for building parameterized AT commands.
struct CmdBuffer {
    buf: [u8; MAX_CMD_LEN],
    len: usize,
}

impl CmdBuffer {
    fn new() -> Self {
        Self {
            buf: [0u8; MAX_CMD_LEN],
            len: 0,
        }
    }

    fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl Write for CmdBuffer {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let bytes = s.as_bytes();
        let available = self.buf.len() - self.len;
        let to_copy = bytes.len().min(available);
        self.buf[self.len..self.len + to_copy].copy_from_slice(&bytes[..to_copy]);
        self.len += to_copy;
        Ok(())
    }
}

/// Foreground driver for one JDY-09 channel.
pub struct Jdy09<'a, T: Transport, C: Clock, const N: usize> {
    rx: &'a LineQueue<N>,
    gate: &'a ConnectionGate<'a, N>,
    port: T,
    clock: C,
    config: LinkConfig,
}

impl<'a, T: Transport, C: Clock, const N: usize> Jdy09<'a, T, C, N> {
    pub fn new(
        rx: &'a LineQueue<N>,
        gate: &'a ConnectionGate<'a, N>,
        port: T,
        clock: C,
        config: LinkConfig,
    ) -> Self {
        Self {
            rx,
            gate,
            port,
            clock,
            config,
        }
    }

    /// Boot-time banner and module identity queries.
    ///
    /// Drops anything queued before init, disconnects an already-paired
    /// module, then queries version, address, baud, name and pin so the
    /// operator sees the module identity on the terminal.
    pub fn init(&mut self, out: &mut dyn Write) {
        let _ = writeln!(out, "JDY-09 initializing ({})", crate::VERSION);

        self.rx.flush();

        if self.gate.is_connected() {
            let _ = self.disconnect(out);
        }

        for cmd in [
            AtCommand::Version,
            AtCommand::Laddr,
            AtCommand::Baud,
            AtCommand::Name,
            AtCommand::Pin,
        ] {
            let _ = self.send_command(cmd, out);
        }
    }

    /// Send one query command. Legal only while disconnected.
    pub fn send_command(&mut self, cmd: AtCommand, out: &mut dyn Write) -> Result<(), LinkError> {
        self.require_state(LinkState::Disconnected, out)?;
        self.send_and_await(cmd.wire(), out)
    }

    /// Reconfigure the module's baud rate. The UART peripheral must be
    /// reconfigured to match after the module restarts.
    pub fn set_baud_rate(&mut self, baud: BaudRate, out: &mut dyn Write) -> Result<(), LinkError> {
        self.require_state(LinkState::Disconnected, out)?;

        let mut wire = CmdBuffer::new();
        let _ = write!(wire, "AT+BAUD{}\r\n", baud.code());
        self.send_and_await(wire.as_bytes(), out)?;

        let _ = writeln!(out, "New baud set - restart device");
        Ok(())
    }

    /// Rename the module (at most [`MAX_NAME_LEN`] chars).
    pub fn set_name(&mut self, name: &str, out: &mut dyn Write) -> Result<(), LinkError> {
        if name.len() > MAX_NAME_LEN {
            let _ = writeln!(out, "Defined name too long, max {} chars", MAX_NAME_LEN);
            return Err(LinkError::ArgTooLong);
        }
        self.require_state(LinkState::Disconnected, out)?;

        let mut wire = CmdBuffer::new();
        let _ = write!(wire, "AT+NAME{}\r\n", name);
        self.send_and_await(wire.as_bytes(), out)?;

        let _ = writeln!(out, "New name set - restart device");
        Ok(())
    }

    /// Change the pairing pin (at most [`MAX_PIN_LEN`] chars).
    pub fn set_pin(&mut self, pin: &str, out: &mut dyn Write) -> Result<(), LinkError> {
        if pin.len() > MAX_PIN_LEN {
            let _ = writeln!(out, "Defined pin too long, max {} digits", MAX_PIN_LEN);
            return Err(LinkError::ArgTooLong);
        }
        self.require_state(LinkState::Disconnected, out)?;

        let mut wire = CmdBuffer::new();
        let _ = write!(wire, "AT+PIN{}\r\n", pin);
        self.send_and_await(wire.as_bytes(), out)?;

        let _ = writeln!(out, "New pin set - restart device");
        Ok(())
    }

    /// Drop the active peer connection. Legal only while connected.
    pub fn disconnect(&mut self, out: &mut dyn Write) -> Result<(), LinkError> {
        if !self.gate.is_connected() {
            let _ = writeln!(out, "Module already disconnected");
            return Err(LinkError::LinkState);
        }
        self.send_and_await(b"AT+DISC\r\n", out)
    }

    /// Forward a payload to the connected peer. Legal only while connected.
    pub fn send_data(&mut self, data: &[u8], out: &mut dyn Write) -> Result<(), LinkError> {
        self.require_state(LinkState::Connected, out)?;

        self.port
            .transmit(data, self.config.timeout_ms)
            .map_err(|timeout| {
                let error = LinkError::from(timeout);
                let _ = writeln!(out, "{}", error.message());
                error
            })?;

        let _ = writeln!(out, "Data transfer to connected device completed");
        Ok(())
    }

    /// Connection state as the gate sees it.
    pub fn state(&self) -> LinkState {
        self.gate.state()
    }

    /// The underlying transport (the receive pump reads through it).
    pub fn port(&self) -> &T {
        &self.port
    }

    fn require_state(&self, wanted: LinkState, out: &mut dyn Write) -> Result<(), LinkError> {
        if self.gate.state() != wanted {
            let msg = match wanted {
                LinkState::Disconnected => "AT commands possible only in offline mode",
                LinkState::Connected => "Send data possible only in online mode",
            };
            let _ = writeln!(out, "{}", msg);
            return Err(LinkError::LinkState);
        }
        Ok(())
    }

    /// One command round-trip: echo, transmit, await one response line.
    ///
    /// The response wait suspends the foreground inside the same fixed
    /// timeout budget as the transmit; interrupts keep producing into the
    /// queue meanwhile. On expiry the request is abandoned - the module
    /// may still answer later, but that line belongs to whoever extracts
    /// it next.
    fn send_and_await(&mut self, wire: &[u8], out: &mut dyn Write) -> Result<(), LinkError> {
        let _ = out.write_str("Sending: ");
        write_bytes(out, wire);

        self.port
            .transmit(wire, self.config.timeout_ms)
            .map_err(|timeout| {
                let error = LinkError::from(timeout);
                let _ = writeln!(out, "{}", error.message());
                error
            })?;

        let started = self.clock.now_ms();
        while self.rx.lines() == 0 {
            if self.clock.now_ms().wrapping_sub(started) >= self.config.timeout_ms {
                let _ = writeln!(out, "{}", LinkError::Timeout.message());
                return Err(LinkError::Timeout);
            }
        }

        let mut msg = [0u8; MAX_LINE_LEN];
        if let MessageStatus::Ready { len } = self.rx.take_line(&mut msg) {
            let _ = out.write_str("Response: ");
            write_bytes(out, &msg[..len]);
        }
        self.rx.clear_pending();

        Ok(())
    }
}
