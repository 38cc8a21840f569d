//! STATE pin binding.
//!
//! The JDY-09 raises STATE while a peer is connected. Both edges matter:
//! the gate flushes the receive queue on every transition.

use esp_idf_svc::hal::gpio::{AnyIOPin, Input, InterruptType, PinDriver, Pull};
use esp_idf_svc::sys::EspError;

use crate::jdy09::ConnectionGate;

/// STATE pin wiring.
pub struct StatePinConfig {
    pub pin: u8,
    /// The module drives the pin, no pull needed by default.
    pub pull: Pull,
}

impl Default for StatePinConfig {
    fn default() -> Self {
        Self {
            pin: 4,
            pull: Pull::Floating,
        }
    }
}

/// Subscribe the gate to both edges of the STATE pin.
///
/// The ISR closure reads the post-edge level through the raw register so
/// the pin driver itself can stay parked inside the subscription.
pub fn subscribe_state_pin<const N: usize>(
    mut driver: PinDriver<'static, AnyIOPin, Input>,
    config: &StatePinConfig,
    gate: &'static ConnectionGate<'static, N>,
) -> Result<PinDriver<'static, AnyIOPin, Input>, EspError> {
    driver.set_pull(config.pull)?;
    driver.set_interrupt_type(InterruptType::AnyEdge)?;

    let pin = config.pin;
    let on_edge = move || {
        // SAFETY: raw level read of a configured input pin
        let level = unsafe { esp_idf_svc::sys::gpio_get_level(pin as i32) } != 0;
        gate.on_edge(pin, level);
    };

    // SAFETY: The ISR closure only touches lock-free state (the gate's
    // atomics, the log stream, the ring flush).
    unsafe {
        driver.subscribe(on_edge)?;
    }
    driver.enable_interrupt()?;

    Ok(driver)
}
