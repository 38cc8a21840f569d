//! # rust-jdy09-thermo
//!
//! Firmware glue between an MCU, a JDY-09 Bluetooth-serial module and a
//! TMP102 temperature sensor.
//!
//! ## Architecture
//!
//! ```text
//! UART RX IRQ ──▶ LineQueue ──take_line──▶ dispatch / AT round-trips
//!                 (lock-free)              (foreground)
//! STATE EXTI ──▶ ConnectionGate ── gates AT vs data, flushes on edges
//! ```
//!
//! - Producers (interrupt context) never block; a full ring drops bytes
//! - Consumers run in the single foreground context and may block
//! - No heap, no locks: fixed arrays and atomics only

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod error;
pub mod frame;
pub mod jdy09;
pub mod logging;
pub mod parser;
pub mod power;
pub mod ring;
pub mod sensor;
pub mod transport;

#[cfg(feature = "esp32")]
pub mod hal;

/// Firmware version string (set by build.rs, includes git hash).
pub const VERSION: &str = env!("VERSION_STRING");

pub use config::LinkConfig;
pub use error::LinkError;
pub use frame::{FramingError, LineQueue, MessageStatus};
pub use jdy09::{AtCommand, BaudRate, ConnectionGate, Jdy09, LinkState};
pub use logging::{LogLevel, LogStream};
pub use parser::{dispatch, CommandHost, SensorCmd, COMMANDS};
pub use power::PowerGate;
pub use ring::RingBuffer;
