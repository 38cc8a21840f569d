//! Line accounting between the receive callbacks and the foreground

use rust_jdy09_thermo::config::MAX_LINE_LEN;
use rust_jdy09_thermo::frame::{LineQueue, MessageStatus};

fn take(queue: &LineQueue) -> Option<Vec<u8>> {
    let mut out = [0u8; MAX_LINE_LEN];
    match queue.take_line(&mut out) {
        MessageStatus::Ready { len } => Some(out[..len].to_vec()),
        MessageStatus::None => None,
    }
}

#[test]
fn test_batch_with_k_markers_counts_k_lines() {
    let queue: LineQueue = LineQueue::new(b'\n');

    assert_eq!(queue.push_chunk(b"a\nbb\nccc\n"), Ok(3));
    assert_eq!(queue.lines(), 3);
}

#[test]
fn test_line_counter_accumulates_across_batches() {
    let queue: LineQueue = LineQueue::new(b'\n');

    queue.push_chunk(b"first\n").unwrap();
    queue.push_chunk(b"second\n").unwrap();

    // both lines survive: the counter accumulates, it is not reassigned
    assert_eq!(queue.lines(), 2);
    assert_eq!(take(&queue).unwrap(), b"first\n");
    assert_eq!(take(&queue).unwrap(), b"second\n");
}

#[test]
fn test_unterminated_batch_is_a_framing_error() {
    let queue: LineQueue = LineQueue::new(b'\n');

    queue.push_chunk(b"good\n").unwrap();
    assert!(queue.push_chunk(b"partial without marker").is_err());

    // the flush took the backlog with it
    assert_eq!(queue.lines(), 0);
    assert!(queue.is_empty());
    assert_eq!(queue.framing_errors(), 1);
    assert!(take(&queue).is_none());
}

#[test]
fn test_take_line_with_nothing_queued_is_a_noop() {
    let queue: LineQueue = LineQueue::new(b'\n');

    for &b in b"incomplete" {
        queue.push_byte(b);
    }
    assert!(take(&queue).is_none());

    // the partial line is still intact in the buffer
    for &b in b" line\n" {
        queue.push_byte(b);
    }
    assert_eq!(take(&queue).unwrap(), b"incomplete line\n");
}

#[test]
fn test_take_line_decrements_by_exactly_one() {
    let queue: LineQueue = LineQueue::new(b'\n');
    queue.push_chunk(b"one\ntwo\nthree\n").unwrap();

    assert_eq!(queue.lines(), 3);
    assert_eq!(take(&queue).unwrap(), b"one\n");
    assert_eq!(queue.lines(), 2);
    assert_eq!(take(&queue).unwrap(), b"two\n");
    assert_eq!(queue.lines(), 1);
    assert_eq!(take(&queue).unwrap(), b"three\n");
    assert_eq!(queue.lines(), 0);
}

#[test]
fn test_pending_flag_lifecycle() {
    let queue: LineQueue = LineQueue::new(b'\n');
    queue.push_chunk(b"msg\n").unwrap();

    assert!(!queue.pending());

    let mut out = [0u8; MAX_LINE_LEN];
    assert!(queue.take_line(&mut out).is_ready());
    assert!(queue.pending());

    queue.clear_pending();
    assert!(!queue.pending());
}

#[test]
fn test_alternate_end_of_line_byte() {
    let queue: LineQueue = LineQueue::new(b'\r');

    queue.push_chunk(b"CRLF style\r\n").unwrap();
    assert_eq!(queue.lines(), 1);

    // extraction stops at the configured marker; the stray LF stays queued
    assert_eq!(take(&queue).unwrap(), b"CRLF style\r");
}
