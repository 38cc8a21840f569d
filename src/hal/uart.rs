//! UART transport and receive pump.
//!
//! Transmit is blocking with a tick timeout. Receive goes through the
//! ESP-IDF driver's interrupt-fed queue; [`pump_rx`] drains it in batches
//! into a [`LineQueue`], which is where line accounting happens.

use core::time::Duration;

use esp_idf_svc::hal::delay::{TickType, NON_BLOCK};
use esp_idf_svc::hal::uart::UartDriver;
use esp_idf_svc::sys::{EspError, TickType_t};

use crate::config::MAX_LINE_LEN;
use crate::frame::LineQueue;
use crate::logging::LogStream;
use crate::transport::{Clock, TransmitTimeout, Transport};

fn ms_to_ticks(ms: u32) -> TickType_t {
    TickType::from(Duration::from_millis(ms as u64)).into()
}

/// Blocking transmit over an ESP-IDF UART.
pub struct UartTransport<'d> {
    uart: UartDriver<'d>,
}

impl<'d> UartTransport<'d> {
    pub fn new(uart: UartDriver<'d>) -> Self {
        Self { uart }
    }

    /// Shared access for the receive pump.
    pub fn driver(&self) -> &UartDriver<'d> {
        &self.uart
    }
}

impl Transport for UartTransport<'_> {
    fn transmit(&mut self, bytes: &[u8], timeout_ms: u32) -> Result<(), TransmitTimeout> {
        self.uart.write(bytes).map_err(|_| TransmitTimeout)?;
        self.uart
            .wait_tx_done(ms_to_ticks(timeout_ms))
            .map_err(|_| TransmitTimeout)
    }
}

/// Drain one receive batch from the driver queue into the line queue.
///
/// Call from the receive task or the foreground loop; returns the number
/// of bytes moved. A batch without an end-of-line marker is reported on
/// the log stream and discarded by the queue.
pub fn pump_rx<const N: usize>(
    uart: &UartDriver<'_>,
    queue: &LineQueue<N>,
    log: &LogStream,
) -> Result<usize, EspError> {
    let mut chunk = [0u8; MAX_LINE_LEN];

    let n = uart.read(&mut chunk, NON_BLOCK)?;
    if n == 0 {
        return Ok(0);
    }

    if queue.push_chunk(&chunk[..n]).is_err() {
        crate::link_warn!(log, "Error, message has to be finished with LF");
    }

    Ok(n)
}

/// Millisecond clock over the ESP timer.
#[derive(Clone, Copy, Default)]
pub struct EspClock;

impl Clock for EspClock {
    fn now_ms(&self) -> u32 {
        // esp_timer_get_time is microseconds since boot
        let us = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
        (us / 1_000) as u32
    }
}
