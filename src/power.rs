//! Low-power wait as an explicit suspend/resume state.
//!
//! The SLEEP command does not block inside the dispatcher; it arms this
//! gate. The foreground loop observes the flag and parks in the platform's
//! wait-for-interrupt until a wake interrupt clears it. Interrupt
//! producers keep filling the receive rings while the foreground sleeps,
//! bounded by ring capacity.
//!
//! There is no cancellation of an armed sleep other than the wake signal.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Suspend/resume gate between the SLEEP procedure and the wake interrupt.
pub struct PowerGate {
    /// True from `request_sleep` until the next `wake`.
    sleeping: AtomicBool,

    /// Wake events observed since boot (diagnostics, never cleared).
    wakeups: AtomicU32,
}

impl PowerGate {
    /// Create an awake gate.
    pub const fn new() -> Self {
        Self {
            sleeping: AtomicBool::new(false),
            wakeups: AtomicU32::new(0),
        }
    }

    /// Arm the gate. Called by the SLEEP procedure in the foreground; the
    /// suspend point is well-defined here.
    #[inline]
    pub fn request_sleep(&self) {
        self.sleeping.store(true, Ordering::Release);
    }

    /// Resume point. Safe to call from any interrupt; waking an awake gate
    /// is a no-op.
    #[inline]
    pub fn wake(&self) {
        if self.sleeping.swap(false, Ordering::AcqRel) {
            self.wakeups.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// True while the foreground should stay parked.
    #[inline]
    pub fn is_sleeping(&self) -> bool {
        self.sleeping.load(Ordering::Acquire)
    }

    /// Wake events observed since boot.
    #[inline]
    pub fn wakeups(&self) -> u32 {
        self.wakeups.load(Ordering::Relaxed)
    }
}

impl Default for PowerGate {
    fn default() -> Self {
        Self::new()
    }
}
