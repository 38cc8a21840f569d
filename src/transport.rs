//! Byte-transport and time seams.
//!
//! The UART/DMA peripheral is an external collaborator: the core only
//! needs a blocking transmit with a timeout, plus a monotonic millisecond
//! clock for response waits. The `hal` module provides the ESP-IDF
//! implementations; tests provide recording mocks.

/// The transmit did not complete within its timeout. The in-flight request
/// is abandoned; there is no retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmitTimeout;

/// Blocking byte transmit.
pub trait Transport {
    /// Send all of `bytes` within `timeout_ms`.
    fn transmit(&mut self, bytes: &[u8], timeout_ms: u32) -> Result<(), TransmitTimeout>;
}

/// Monotonic millisecond clock, wrapping.
pub trait Clock {
    fn now_ms(&self) -> u32;
}
