//! Interrupt-safe notification logging.
//!
//! Interrupt-context components (receive callbacks, the STATE pin edge
//! handler) must not touch the blocking terminal UART. They push
//! preformatted entries onto a lock-free ring instead; the foreground loop
//! drains the ring to the display terminal at its leisure:
//!
//! ```text
//! IRQ handlers ──link_warn!()──▶ LogStream ──drain──▶ terminal UART
//!               non-blocking      lock-free            blocking ok
//! ```
//!
//! A full ring drops the entry and counts it; nothing ever blocks in
//! interrupt context.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};

/// Maximum message length.
pub const MAX_MSG_LEN: usize = 96;

/// Log buffer size (number of entries). Must be a power of 2.
pub const LOG_BUFFER_SIZE: usize = 64;

/// Log level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    /// Convert to string for output.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

/// A single log entry.
#[derive(Clone, Copy)]
pub struct LogEntry {
    /// Log level.
    pub level: LogLevel,
    /// Message length.
    pub len: u8,
    /// Message bytes (not null-terminated).
    pub msg: [u8; MAX_MSG_LEN],
}

impl LogEntry {
    const EMPTY: LogEntry = LogEntry {
        level: LogLevel::Info,
        len: 0,
        msg: [0; MAX_MSG_LEN],
    };

    /// Message as text.
    pub fn text(&self) -> &str {
        core::str::from_utf8(&self.msg[..self.len as usize]).unwrap_or("<invalid utf8>")
    }
}

/// Lock-free log ring (multiple producers, single consumer).
///
/// - Any interrupt or the foreground may push (coordinated via atomic
///   `fetch_add`)
/// - Push never blocks (drops the entry if full)
/// - The foreground drains at its leisure
pub struct LogStream<const N: usize = LOG_BUFFER_SIZE> {
    entries: UnsafeCell<[LogEntry; N]>,
    write_idx: AtomicU32,
    read_idx: AtomicU32,
    dropped: AtomicU32,
}

// SAFETY: Multiple producers coordinated via atomic fetch_add, single
// consumer (foreground drain).
unsafe impl<const N: usize> Sync for LogStream<N> {}
unsafe impl<const N: usize> Send for LogStream<N> {}

impl<const N: usize> LogStream<N> {
    const MASK: usize = N - 1;

    /// Create a new empty log stream.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "log buffer size must be power of 2");

        Self {
            entries: UnsafeCell::new([LogEntry::EMPTY; N]),
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Push a log entry. Interrupt-safe, never blocks.
    ///
    /// Returns `true` if the entry was queued, `false` if dropped.
    #[inline]
    pub fn push(&self, level: LogLevel, msg: &[u8]) -> bool {
        // fetch_add hands every producer a unique slot
        let write = self.write_idx.fetch_add(1, Ordering::AcqRel);
        let read = self.read_idx.load(Ordering::Acquire);

        if write.wrapping_sub(read) >= N as u32 {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let idx = (write as usize) & Self::MASK;

        // SAFETY: fetch_add made this index unique to this producer.
        unsafe {
            let entry = &mut (*self.entries.get())[idx];
            entry.level = level;
            entry.len = msg.len().min(MAX_MSG_LEN) as u8;
            entry.msg[..entry.len as usize].copy_from_slice(&msg[..entry.len as usize]);
        }

        true
    }

    /// Drain the next entry, oldest first. Foreground only.
    #[inline]
    pub fn drain(&self) -> Option<LogEntry> {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);

        if read == write {
            return None;
        }

        let idx = (read as usize) & Self::MASK;

        // SAFETY: Single consumer, unique index.
        let entry = unsafe { (*self.entries.get())[idx] };

        self.read_idx.store(read.wrapping_add(1), Ordering::Release);
        Some(entry)
    }

    /// True when entries are waiting.
    #[inline]
    pub fn has_entries(&self) -> bool {
        self.read_idx.load(Ordering::Relaxed) != self.write_idx.load(Ordering::Acquire)
    }

    /// Entries waiting to be drained.
    #[inline]
    pub fn pending(&self) -> u32 {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }

    /// Entries lost to a full ring.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<const N: usize> Default for LogStream<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a message into a buffer; output beyond the buffer is cut off.
///
/// Returns the number of bytes written.
#[inline]
pub fn format_to_buffer(buf: &mut [u8], args: core::fmt::Arguments<'_>) -> usize {
    use core::fmt::Write;

    struct BufWriter<'a> {
        buf: &'a mut [u8],
        pos: usize,
    }

    impl<'a> Write for BufWriter<'a> {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            let bytes = s.as_bytes();
            let remaining = self.buf.len() - self.pos;
            let to_write = bytes.len().min(remaining);
            self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
            self.pos += to_write;
            Ok(())
        }
    }

    let mut writer = BufWriter { buf, pos: 0 };
    let _ = core::fmt::write(&mut writer, args);
    writer.pos
}

/// Write raw line bytes to a notification sink as text.
pub fn write_bytes(out: &mut dyn core::fmt::Write, bytes: &[u8]) {
    let _ = out.write_str(core::str::from_utf8(bytes).unwrap_or("<invalid utf8>"));
}

/// Interrupt-safe log macro.
///
/// Use this from receive and edge callbacks instead of writing to the
/// terminal directly.
///
/// # Example
///
/// ```ignore
/// link_log!(LogLevel::Warn, LINK_LOG, "dropped {} bytes", n);
/// ```
#[macro_export]
macro_rules! link_log {
    ($level:expr, $stream:expr, $($arg:tt)*) => {{
        let mut buf = [0u8; $crate::logging::MAX_MSG_LEN];
        let len = $crate::logging::format_to_buffer(&mut buf, format_args!($($arg)*));
        $stream.push($level, &buf[..len]);
    }};
}

/// Interrupt-safe info log.
#[macro_export]
macro_rules! link_info {
    ($stream:expr, $($arg:tt)*) => {
        $crate::link_log!($crate::logging::LogLevel::Info, $stream, $($arg)*)
    };
}

/// Interrupt-safe warning log.
#[macro_export]
macro_rules! link_warn {
    ($stream:expr, $($arg:tt)*) => {
        $crate::link_log!($crate::logging::LogLevel::Warn, $stream, $($arg)*)
    };
}

/// Interrupt-safe error log.
#[macro_export]
macro_rules! link_error {
    ($stream:expr, $($arg:tt)*) => {
        $crate::link_log!($crate::logging::LogLevel::Error, $stream, $($arg)*)
    };
}

/// Interrupt-safe debug log.
#[macro_export]
macro_rules! link_debug {
    ($stream:expr, $($arg:tt)*) => {
        $crate::link_log!($crate::logging::LogLevel::Debug, $stream, $($arg)*)
    };
}
