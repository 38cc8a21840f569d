//! thermo - main entry point
//!
//! Wires the JDY-09 link and the control console on an ESP32:
//! two UARTs (module + terminal), the STATE pin, the TMP102 on I2C, and
//! the single foreground loop that drains logs, extracts lines and
//! dispatches commands. All shared state is static and lock-free.

use core::fmt::Write;

use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyIOPin, IOPin, PinDriver};
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::uart::{config::Config as UartConfig, UartDriver};
use esp_idf_svc::hal::units::Hertz;

use rust_jdy09_thermo::config::{LinkConfig, MAX_LINE_LEN, RX_RING_CAPACITY};
use rust_jdy09_thermo::frame::LineQueue;
use rust_jdy09_thermo::hal::{
    pump_rx, subscribe_state_pin, EspClock, StatePinConfig, UartTransport,
};
use rust_jdy09_thermo::jdy09::{ConnectionGate, Jdy09};
use rust_jdy09_thermo::logging::LogStream;
use rust_jdy09_thermo::parser::{dispatch, CommandHost};
use rust_jdy09_thermo::power::PowerGate;
use rust_jdy09_thermo::sensor::{write_centi, BusError, RegisterBus, Tmp102};
use rust_jdy09_thermo::transport::Clock;
use rust_jdy09_thermo::VERSION;

/// STATE pin of the JDY-09.
const STATE_PIN: u8 = 4;

/// Display window length started by the DISPLAY command.
const DISPLAY_WINDOW_MS: u32 = 60_000;

// Shared between interrupt and foreground context; everything inside is
// lock-free.
static LINK_LOG: LogStream = LogStream::new();
static BT_RX: LineQueue<RX_RING_CAPACITY> = LineQueue::new(b'\n');
static CTRL_RX: LineQueue<RX_RING_CAPACITY> = LineQueue::new(b'\n');
static BT_GATE: ConnectionGate<'static, RX_RING_CAPACITY> =
    ConnectionGate::new(&BT_RX, &LINK_LOG, STATE_PIN);
static POWER: PowerGate = PowerGate::new();

/// Terminal UART as a notification sink.
struct Terminal<'a, 'd> {
    uart: &'a UartDriver<'d>,
}

impl Write for Terminal<'_, '_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.uart.write(s.as_bytes()).map_err(|_| core::fmt::Error)?;
        Ok(())
    }
}

/// TMP102 over the I2C peripheral.
struct I2cBus<'d> {
    i2c: I2cDriver<'d>,
}

impl RegisterBus for I2cBus<'_> {
    fn read_reg(&mut self, addr: u8, reg: u8, out: &mut [u8; 2]) -> Result<(), BusError> {
        self.i2c
            .write_read(addr, &[reg], out, esp_idf_svc::hal::delay::BLOCK)
            .map_err(|_| BusError)
    }
}

/// Command procedures wired to the board.
struct ThermoHost<'d> {
    sensor: Tmp102<I2cBus<'d>>,
    clock: EspClock,
    display_until: Option<u32>,
}

impl CommandHost for ThermoHost<'_> {
    fn wakeup(&mut self, out: &mut dyn Write) {
        let _ = writeln!(out, "System wake up");
    }

    fn measure(&mut self, out: &mut dyn Write) {
        match self.sensor.read_centi_celsius() {
            Ok(centi) => {
                let _ = out.write_str("Measurement done: ");
                let _ = write_centi(out, centi);
                let _ = writeln!(out, " deg C");
            }
            Err(_) => {
                let _ = writeln!(out, "Sensor read failed");
            }
        }
    }

    fn display(&mut self, out: &mut dyn Write) {
        self.display_until = Some(self.clock.now_ms().wrapping_add(DISPLAY_WINDOW_MS));
        let _ = writeln!(out, "Temperature displayed for 1 minute");
    }

    fn sleep(&mut self, out: &mut dyn Write) {
        self.display_until = None;
        let _ = writeln!(out, "Entering sleep mode");
        POWER.request_sleep();
    }
}

fn drain_logs(out: &mut dyn Write) {
    while let Some(entry) = LINK_LOG.drain() {
        let _ = writeln!(out, "{}: {}", entry.level.as_str(), entry.text());
    }
}

fn main() {
    esp_idf_svc::sys::link_patches();

    let peripherals = Peripherals::take().expect("peripherals already taken");
    let pins = peripherals.pins;

    // JDY-09 on UART1 at its default baud
    let bt_config = UartConfig::default().baudrate(Hertz(9_600));
    let bt_uart = UartDriver::new(
        peripherals.uart1,
        pins.gpio17,
        pins.gpio16,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &bt_config,
    )
    .expect("bt uart init");

    // operator terminal on UART0
    let term_config = UartConfig::default().baudrate(Hertz(115_200));
    let term_uart = UartDriver::new(
        peripherals.uart0,
        pins.gpio1,
        pins.gpio3,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &term_config,
    )
    .expect("terminal uart init");

    let i2c = I2cDriver::new(
        peripherals.i2c0,
        pins.gpio21,
        pins.gpio22,
        &I2cConfig::default(),
    )
    .expect("i2c init");

    let state_pin = PinDriver::input(pins.gpio4.downgrade()).expect("state pin init");
    let _state_pin = subscribe_state_pin(state_pin, &StatePinConfig::default(), &BT_GATE)
        .expect("state pin subscribe");

    let mut term = Terminal { uart: &term_uart };
    let _ = writeln!(term, "{}", VERSION);

    let clock = EspClock;
    let mut host = ThermoHost {
        sensor: Tmp102::new(I2cBus { i2c }),
        clock,
        display_until: None,
    };

    let bt_port = UartTransport::new(bt_uart);
    let mut jdy09 = Jdy09::new(&BT_RX, &BT_GATE, bt_port, clock, LinkConfig::jdy09());
    jdy09.init(&mut term);

    let mut line = [0u8; MAX_LINE_LEN];

    loop {
        drain_logs(&mut term);

        // move driver-queued bytes into the line queues
        let _ = pump_rx(jdy09.port().driver(), &BT_RX, &LINK_LOG);
        let _ = pump_rx(&term_uart, &CTRL_RX, &LINK_LOG);

        if POWER.is_sleeping() {
            // parked: only a completed control line resumes the foreground
            if CTRL_RX.lines() > 0 {
                POWER.wake();
                let _ = writeln!(term, "Waking up...");
            } else {
                FreeRtos::delay_ms(50);
                continue;
            }
        }

        if let Some(until) = host.display_until {
            if (clock.now_ms().wrapping_sub(until) as i32) >= 0 {
                host.display_until = None;
                let _ = writeln!(term, "Display window ended");
            }
        }

        // operator commands from the terminal
        if CTRL_RX.take_line(&mut line).is_ready() {
            let _ = dispatch(&line, b'\n', &mut host, &mut term);
            CTRL_RX.clear_pending();
        }

        // while a peer is connected, its lines carry the same vocabulary;
        // while disconnected the queue holds AT responses, consumed inside
        // the driver's round-trips
        if BT_GATE.is_connected() && BT_RX.take_line(&mut line).is_ready() {
            let _ = dispatch(&line, b'\n', &mut host, &mut term);
            BT_RX.clear_pending();
        }

        FreeRtos::delay_ms(10);
    }
}
