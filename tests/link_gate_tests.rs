//! Connection gating and AT command round-trips

use core::cell::Cell;
use core::fmt::Write;

use rust_jdy09_thermo::config::LinkConfig;
use rust_jdy09_thermo::error::LinkError;
use rust_jdy09_thermo::frame::LineQueue;
use rust_jdy09_thermo::jdy09::{AtCommand, BaudRate, ConnectionGate, Jdy09, LinkState};
use rust_jdy09_thermo::logging::LogStream;
use rust_jdy09_thermo::transport::{Clock, Transport, TransmitTimeout};

const STATE_PIN: u8 = 4;

/// Records transmits; optionally answers each one with a canned line.
struct MockPort<'a> {
    sent: Vec<u8>,
    queue: &'a LineQueue,
    response: Option<&'static [u8]>,
}

impl<'a> MockPort<'a> {
    fn new(queue: &'a LineQueue) -> Self {
        Self {
            sent: Vec::new(),
            queue,
            response: None,
        }
    }

    fn answering(queue: &'a LineQueue, response: &'static [u8]) -> Self {
        Self {
            sent: Vec::new(),
            queue,
            response: Some(response),
        }
    }
}

impl Transport for MockPort<'_> {
    fn transmit(&mut self, bytes: &[u8], _timeout_ms: u32) -> Result<(), TransmitTimeout> {
        self.sent.extend_from_slice(bytes);
        if let Some(response) = self.response {
            self.queue.push_chunk(response).unwrap();
        }
        Ok(())
    }
}

/// Advances 100 ms per reading, so a 1000 ms wait expires quickly.
#[derive(Default)]
struct TickingClock {
    now: Cell<u32>,
}

impl Clock for TickingClock {
    fn now_ms(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now + 100);
        now
    }
}

fn drain_text(log: &LogStream) -> String {
    let mut text = String::new();
    while let Some(entry) = log.drain() {
        text.push_str(entry.text());
        text.push('\n');
    }
    text
}

#[test]
fn test_edge_transitions_flush_and_notify() {
    let queue: LineQueue = LineQueue::new(b'\n');
    let log: LogStream = LogStream::new();
    let gate = ConnectionGate::new(&queue, &log, STATE_PIN);

    assert_eq!(gate.state(), LinkState::Disconnected);

    // a complete line plus a partial one accumulated before the edge
    queue.push_chunk(b"queued\n").unwrap();
    for &b in b"stale partial" {
        queue.push_byte(b);
    }

    gate.on_edge(STATE_PIN, true);
    assert_eq!(gate.state(), LinkState::Connected);
    assert!(queue.is_empty(), "rising edge must flush the queue");
    assert_eq!(queue.lines(), 0);
    assert!(drain_text(&log).contains("device connected"));

    queue.push_chunk(b"mid-connection noise\n").unwrap();

    gate.on_edge(STATE_PIN, false);
    assert_eq!(gate.state(), LinkState::Disconnected);
    assert!(queue.is_empty(), "falling edge must flush the queue too");
    assert!(drain_text(&log).contains("device disconnected"));
}

#[test]
fn test_edge_on_other_pin_is_ignored() {
    let queue: LineQueue = LineQueue::new(b'\n');
    let log: LogStream = LogStream::new();
    let gate = ConnectionGate::new(&queue, &log, STATE_PIN);

    queue.push_chunk(b"keep me\n").unwrap();
    gate.on_edge(STATE_PIN + 1, true);

    assert_eq!(gate.state(), LinkState::Disconnected);
    assert_eq!(queue.lines(), 1, "foreign pin must not flush");
    assert!(!log.has_entries());
}

#[test]
fn test_at_command_round_trip() {
    let queue: LineQueue = LineQueue::new(b'\n');
    let log: LogStream = LogStream::new();
    let gate = ConnectionGate::new(&queue, &log, STATE_PIN);
    let port = MockPort::answering(&queue, b"+VERSION=JDY-09-V2.4\n");
    let mut out = String::new();

    let mut link = Jdy09::new(
        &queue,
        &gate,
        port,
        TickingClock::default(),
        LinkConfig::jdy09(),
    );

    assert_eq!(link.send_command(AtCommand::Version, &mut out), Ok(()));
    assert_eq!(link.port().sent, b"AT+VERSION\r\n");
    assert!(out.contains("Sending: AT+VERSION"));
    assert!(out.contains("Response: +VERSION=JDY-09-V2.4"));
    assert!(!queue.pending(), "round-trip must acknowledge the response");
}

#[test]
fn test_at_command_rejected_while_connected() {
    let queue: LineQueue = LineQueue::new(b'\n');
    let log: LogStream = LogStream::new();
    let gate = ConnectionGate::new(&queue, &log, STATE_PIN);
    gate.on_edge(STATE_PIN, true);

    let port = MockPort::new(&queue);
    let mut out = String::new();
    let mut link = Jdy09::new(
        &queue,
        &gate,
        port,
        TickingClock::default(),
        LinkConfig::jdy09(),
    );

    assert_eq!(
        link.send_command(AtCommand::Version, &mut out),
        Err(LinkError::LinkState)
    );
    assert!(link.port().sent.is_empty(), "nothing may reach the wire");
    assert!(out.contains("AT commands possible only in offline mode"));
}

#[test]
fn test_send_data_requires_connection() {
    let queue: LineQueue = LineQueue::new(b'\n');
    let log: LogStream = LogStream::new();
    let gate = ConnectionGate::new(&queue, &log, STATE_PIN);

    let port = MockPort::new(&queue);
    let mut out = String::new();
    let mut link = Jdy09::new(
        &queue,
        &gate,
        port,
        TickingClock::default(),
        LinkConfig::jdy09(),
    );

    assert_eq!(
        link.send_data(b"23.50\n", &mut out),
        Err(LinkError::LinkState)
    );
    assert!(link.port().sent.is_empty());
    assert!(out.contains("Send data possible only in online mode"));

    gate.on_edge(STATE_PIN, true);
    assert_eq!(link.send_data(b"23.50\n", &mut out), Ok(()));
    assert_eq!(link.port().sent, b"23.50\n");
}

#[test]
fn test_response_timeout_is_reported_once() {
    let queue: LineQueue = LineQueue::new(b'\n');
    let log: LogStream = LogStream::new();
    let gate = ConnectionGate::new(&queue, &log, STATE_PIN);

    // transmit succeeds, but the module never answers
    let port = MockPort::new(&queue);
    let mut out = String::new();
    let mut link = Jdy09::new(
        &queue,
        &gate,
        port,
        TickingClock::default(),
        LinkConfig::jdy09(),
    );

    assert_eq!(
        link.send_command(AtCommand::Laddr, &mut out),
        Err(LinkError::Timeout)
    );
    assert_eq!(link.port().sent, b"AT+LADDR\r\n");
    assert!(out.contains("no response, UART communication error"));
}

#[test]
fn test_set_baud_builds_the_code_digit() {
    let queue: LineQueue = LineQueue::new(b'\n');
    let log: LogStream = LogStream::new();
    let gate = ConnectionGate::new(&queue, &log, STATE_PIN);
    let port = MockPort::answering(&queue, b"OK\n");
    let mut out = String::new();

    let mut link = Jdy09::new(
        &queue,
        &gate,
        port,
        TickingClock::default(),
        LinkConfig::jdy09(),
    );

    assert_eq!(link.set_baud_rate(BaudRate::B57600, &mut out), Ok(()));
    assert_eq!(link.port().sent, b"AT+BAUD7\r\n");
    assert_eq!(BaudRate::B57600.bps(), 57_600);
    assert!(out.contains("New baud set"));
}

#[test]
fn test_overlong_name_never_reaches_the_wire() {
    let queue: LineQueue = LineQueue::new(b'\n');
    let log: LogStream = LogStream::new();
    let gate = ConnectionGate::new(&queue, &log, STATE_PIN);
    let port = MockPort::new(&queue);
    let mut out = String::new();

    let mut link = Jdy09::new(
        &queue,
        &gate,
        port,
        TickingClock::default(),
        LinkConfig::jdy09(),
    );

    assert_eq!(
        link.set_name("a-name-of-nineteen-c", &mut out),
        Err(LinkError::ArgTooLong)
    );
    assert!(link.port().sent.is_empty());
    assert!(out.contains("name too long"));

    assert_eq!(
        link.set_pin("12345", &mut out),
        Err(LinkError::ArgTooLong)
    );
    assert!(link.port().sent.is_empty());
    assert!(out.contains("pin too long"));
}

#[test]
fn test_disconnect_when_already_disconnected() {
    let queue: LineQueue = LineQueue::new(b'\n');
    let log: LogStream = LogStream::new();
    let gate = ConnectionGate::new(&queue, &log, STATE_PIN);
    let port = MockPort::new(&queue);
    let mut out = String::new();

    let mut link = Jdy09::new(
        &queue,
        &gate,
        port,
        TickingClock::default(),
        LinkConfig::jdy09(),
    );

    assert_eq!(link.disconnect(&mut out), Err(LinkError::LinkState));
    assert!(link.port().sent.is_empty());
    assert!(out.contains("Module already disconnected"));
}

#[test]
fn test_init_queries_module_identity() {
    let queue: LineQueue = LineQueue::new(b'\n');
    let log: LogStream = LogStream::new();
    let gate = ConnectionGate::new(&queue, &log, STATE_PIN);
    let port = MockPort::answering(&queue, b"OK\n");
    let mut out = String::new();

    let mut link = Jdy09::new(
        &queue,
        &gate,
        port,
        TickingClock::default(),
        LinkConfig::jdy09(),
    );
    link.init(&mut out);

    let sent = String::from_utf8(link.port().sent.clone()).unwrap();
    for cmd in ["AT+VERSION", "AT+LADDR", "AT+BAUD", "AT+NAME", "AT+PIN"] {
        assert!(sent.contains(cmd), "init must query {}", cmd);
    }
    assert!(out.contains("JDY-09 initializing"));
}
