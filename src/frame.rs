//! Line framing over the receive ring.
//!
//! A [`LineQueue`] pairs one [`RingBuffer`] with the bookkeeping that turns
//! a byte stream into messages:
//!
//! ```text
//! push_byte / push_chunk ──▶ RingBuffer ──▶ take_line
//! (interrupt context)                       (foreground)
//! ```
//!
//! The producer half never blocks: a full ring drops the byte and counts
//! it. The consumer half drains exactly one completed line per call and
//! surfaces at most one unacknowledged message at a time.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::{MAX_LINE_LEN, RX_RING_CAPACITY};
use crate::ring::RingBuffer;

/// Result of a [`LineQueue::take_line`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    /// No completed line queued; the buffer was not touched.
    None,
    /// One line copied out: `len` bytes including the end-of-line byte.
    /// A NUL terminator follows when the buffer has room.
    Ready { len: usize },
}

impl MessageStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, MessageStatus::Ready { .. })
    }
}

/// A reception batch carried no end-of-line marker.
///
/// Such a batch cannot be trusted to align with queued content, so the
/// whole ring was flushed and the batch discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramingError;

/// Byte ring plus line bookkeeping for one serial channel.
///
/// Shares the ring's SPSC contract: `push_byte`/`push_chunk` belong to the
/// receive interrupt, `take_line`/`clear_pending` to the foreground.
/// [`flush`](Self::flush) additionally runs from the link-state edge
/// callback on connection transitions.
pub struct LineQueue<const N: usize = RX_RING_CAPACITY> {
    ring: RingBuffer<N>,

    /// End-of-line marker for this channel.
    eol: u8,

    /// Completed-but-unextracted lines. Never goes negative: only the
    /// consumer decrements, and only after observing a non-zero count.
    lines: AtomicU32,

    /// At most one surfaced-but-unacknowledged message at a time.
    pending: AtomicBool,

    /// Bytes dropped on ring overflow.
    dropped: AtomicU32,

    /// Batches rejected for missing an end-of-line marker.
    framing_errors: AtomicU32,

    /// Extractions that found the ring empty mid-line (line counter out of
    /// sync with buffer content - a logic-invariant violation).
    underflows: AtomicU32,
}

impl<const N: usize> LineQueue<N> {
    /// Create an empty queue with the given end-of-line marker.
    pub const fn new(eol: u8) -> Self {
        Self {
            ring: RingBuffer::new(),
            eol,
            lines: AtomicU32::new(0),
            pending: AtomicBool::new(false),
            dropped: AtomicU32::new(0),
            framing_errors: AtomicU32::new(0),
            underflows: AtomicU32::new(0),
        }
    }

    // --- producer side (interrupt context) ---

    /// Push one received byte.
    ///
    /// Overflow is a silent drop: the byte is counted but not queued, and
    /// a dropped end-of-line byte does not count a line either - the line
    /// counter only ever promises bytes the ring actually holds.
    #[inline]
    pub fn push_byte(&self, byte: u8) {
        if self.ring.write(byte).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        if byte == self.eol {
            self.lines.fetch_add(1, Ordering::Release);
        }
    }

    /// Push one reception batch, as delivered by block-oriented transports.
    ///
    /// Counts the end-of-line markers written and accumulates them onto
    /// the line counter. A batch with **zero** markers is a framing error:
    /// it cannot be trusted to align with queued content, so the whole
    /// ring is flushed (batch and backlog) and `Err` is returned for the
    /// caller to report. No retry - the data is gone.
    pub fn push_chunk(&self, bytes: &[u8]) -> Result<u32, FramingError> {
        let mut newlines = 0u32;
        let mut saw_eol = false;

        for &byte in bytes {
            if byte == self.eol {
                saw_eol = true;
            }
            if self.ring.write(byte).is_err() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            if byte == self.eol {
                newlines += 1;
            }
        }

        if !saw_eol {
            self.ring.flush();
            self.lines.store(0, Ordering::Release);
            self.framing_errors.fetch_add(1, Ordering::Relaxed);
            return Err(FramingError);
        }

        self.lines.fetch_add(newlines, Ordering::Release);
        Ok(newlines)
    }

    // --- consumer side (foreground context) ---

    /// Drain one completed line into `out`.
    ///
    /// Returns [`MessageStatus::None`] without touching the buffer when no
    /// line is queued. Otherwise copies bytes up to and including the first
    /// unread end-of-line byte, appends a NUL terminator, decrements the
    /// line counter by one and sets the pending flag.
    ///
    /// `out` must hold at least [`MAX_LINE_LEN`] bytes; shorter buffers
    /// lose the tail of the line.
    pub fn take_line(&self, out: &mut [u8]) -> MessageStatus {
        debug_assert!(out.len() >= MAX_LINE_LEN);

        if self.lines.load(Ordering::Acquire) == 0 {
            return MessageStatus::None;
        }

        let mut len = 0usize;
        loop {
            let byte = match self.ring.read() {
                Ok(byte) => byte,
                Err(_) => {
                    // The counter promised a line the ring does not hold.
                    // Re-arm from scratch instead of spinning forever.
                    self.underflows.fetch_add(1, Ordering::Relaxed);
                    self.lines.store(0, Ordering::Release);
                    return MessageStatus::None;
                }
            };

            if len < out.len() {
                out[len] = byte;
                len += 1;
            }

            if byte == self.eol {
                break;
            }
        }

        if len < out.len() {
            out[len] = 0;
        }

        self.lines.fetch_sub(1, Ordering::AcqRel);
        self.pending.store(true, Ordering::Release);
        MessageStatus::Ready { len }
    }

    /// Acknowledge the surfaced message. Called by the consumer after it
    /// has finished processing the extracted line.
    #[inline]
    pub fn clear_pending(&self) {
        self.pending.store(false, Ordering::Release);
    }

    /// True while a surfaced message awaits [`clear_pending`](Self::clear_pending).
    #[inline]
    pub fn pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Completed-but-unextracted lines.
    #[inline]
    pub fn lines(&self) -> u32 {
        self.lines.load(Ordering::Acquire)
    }

    /// Discard all queued content and line bookkeeping. Runs on link-state
    /// transitions to drop stale partial data from the previous state.
    pub fn flush(&self) {
        self.ring.flush();
        self.lines.store(0, Ordering::Release);
    }

    /// True when the underlying ring holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Bytes lost to ring overflow since boot.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Batches rejected for missing an end-of-line marker.
    #[inline]
    pub fn framing_errors(&self) -> u32 {
        self.framing_errors.load(Ordering::Relaxed)
    }

    /// Mid-line underflows observed (should stay zero).
    #[inline]
    pub fn underflows(&self) -> u32 {
        self.underflows.load(Ordering::Relaxed)
    }
}
