//! Hardware binding for the ESP-IDF target.
//!
//! Thin wrappers around ESP-IDF peripherals. Framing, dispatch and gating
//! stay in the core modules; this layer only moves bytes and edges.

pub mod gpio;
pub mod uart;

pub use gpio::{subscribe_state_pin, StatePinConfig};
pub use uart::{pump_rx, EspClock, UartTransport};
