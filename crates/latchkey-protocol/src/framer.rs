//! Line framer for the device's status stream.
//!
//! The device prints one status word per line (`Serial.println`, so lines end
//! in `\r\n`). Bytes arrive from the serial port in arbitrary chunks: a read
//! may carry half a word, exactly one line, or several lines at once. The
//! framer accumulates bytes and emits a [`StatusLine`] for every `\n`.
//!
//! # Framing rules
//!
//! - Every `\n` terminates a line, wherever it falls inside a chunk.
//! - Leading and trailing `\r`/`\n` are stripped from the emitted text.
//! - Two terminators in a row yield an empty line. Consumers decide what an
//!   empty line means; the driver ignores them.
//! - Bytes that are not valid UTF-8 are replaced lossily.
//! - A line is only emitted once its terminator has arrived.
//!
//! The output depends only on the byte sequence, never on how it was split
//! across [`LineFramer::feed`] calls.
//!
//! # Usage
//!
//! ```
//! use latchkey_protocol::LineFramer;
//!
//! let mut framer = LineFramer::new();
//!
//! framer.feed(b"BU");
//! assert!(framer.next_line().is_none());
//!
//! framer.feed(b"SY\r\nLOCKED\r\n");
//! assert_eq!(framer.next_line().unwrap(), "BUSY");
//! assert_eq!(framer.next_line().unwrap(), "LOCKED");
//! ```
//!
//! # Line length
//!
//! No limit applies by default. A device that never terminates a line grows
//! the accumulator without bound, so deployments talking to untrusted
//! firmware can cap it with [`LineFramer::with_max_line`]. An over-long line
//! is dropped in its entirety, including the bytes that arrive after the cap
//! was hit, up to and including its terminator.

use bytes::BytesMut;
use latchkey_core::StatusLine;
use latchkey_core::constants::{CARRIAGE_RETURN, LINE_TERMINATOR};
use std::collections::VecDeque;

/// Initial accumulator capacity. Status words are short.
const INITIAL_BUFFER_CAPACITY: usize = 64;

/// Initial capacity of the completed-line queue.
const INITIAL_LINE_QUEUE_CAPACITY: usize = 4;

/// Stateful framer turning a byte stream into [`StatusLine`]s.
///
/// A framer belongs to one connection. The driver creates a fresh one every
/// time the link comes up so that partial lines never survive a reconnect.
#[derive(Debug)]
pub struct LineFramer {
    /// Bytes of the line currently being received (no terminator yet).
    buffer: BytesMut,

    /// Completed lines waiting to be taken.
    lines: VecDeque<StatusLine>,

    /// Optional cap on the unterminated line length.
    max_line: Option<usize>,

    /// Set while skipping the remainder of an over-long line.
    discarding: bool,

    /// Length of the most recent over-long line, until taken.
    overflow: Option<usize>,
}

impl LineFramer {
    /// Create a framer without a line length limit.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            lines: VecDeque::with_capacity(INITIAL_LINE_QUEUE_CAPACITY),
            max_line: None,
            discarding: false,
            overflow: None,
        }
    }

    /// Create a framer that drops lines longer than `max_line` bytes.
    ///
    /// The limit counts the bytes before the `\n`, so a trailing `\r` counts.
    ///
    /// ```
    /// use latchkey_protocol::LineFramer;
    ///
    /// let mut framer = LineFramer::with_max_line(8);
    /// framer.feed(b"GARBAGEGARBAGE\nLOCKED\n");
    ///
    /// assert_eq!(framer.next_line().unwrap(), "LOCKED");
    /// assert!(framer.next_line().is_none());
    /// assert_eq!(framer.take_overflow(), Some(14));
    /// ```
    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            max_line: Some(max_line),
            ..Self::new()
        }
    }

    /// Configured line length limit, if any.
    pub fn max_line(&self) -> Option<usize> {
        self.max_line
    }

    /// Feed a chunk of bytes read from the link.
    ///
    /// Every complete line found is queued; the unterminated tail stays in
    /// the accumulator for the next call.
    pub fn feed(&mut self, bytes: &[u8]) {
        let mut rest = bytes;

        while let Some(pos) = rest.iter().position(|&b| b == LINE_TERMINATOR) {
            let (segment, tail) = rest.split_at(pos);
            self.append(segment);
            self.complete_line();
            rest = &tail[1..];
        }

        self.append(rest);
    }

    /// Take the next completed line, if any.
    pub fn next_line(&mut self) -> Option<StatusLine> {
        self.lines.pop_front()
    }

    /// Number of completed lines waiting to be taken.
    pub fn lines_available(&self) -> usize {
        self.lines.len()
    }

    /// Number of bytes of the current unterminated line.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Take the length of the last line dropped for exceeding the limit.
    ///
    /// Returns `None` if no line was dropped since the previous call.
    pub fn take_overflow(&mut self) -> Option<usize> {
        self.overflow.take()
    }

    /// Discard all buffered bytes and queued lines.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.lines.clear();
        self.discarding = false;
        self.overflow = None;
    }

    /// Drain all currently completed lines.
    ///
    /// The iterator does not read more input; call [`feed`] first.
    ///
    /// ```
    /// use latchkey_protocol::LineFramer;
    ///
    /// let mut framer = LineFramer::new();
    /// framer.feed(b"BUSY\r\nOPEN\r\nUNLOCKED\r\n");
    ///
    /// let words: Vec<String> = framer.drain_lines().map(|l| l.into_string()).collect();
    /// assert_eq!(words, ["BUSY", "OPEN", "UNLOCKED"]);
    /// ```
    ///
    /// [`feed`]: LineFramer::feed
    pub fn drain_lines(&mut self) -> DrainLines<'_> {
        DrainLines { framer: self }
    }

    fn append(&mut self, segment: &[u8]) {
        if self.discarding {
            self.track_discarded(segment.len());
            return;
        }

        self.buffer.extend_from_slice(segment);

        if let Some(max) = self.max_line
            && self.buffer.len() > max
        {
            let len = self.buffer.len();
            self.buffer.clear();
            self.discarding = true;
            self.overflow = Some(len);
            tracing::warn!(len, max, "status line exceeds limit, discarding");
        }
    }

    fn track_discarded(&mut self, len: usize) {
        let dropped = self.overflow.unwrap_or(0);
        self.overflow = Some(dropped + len);
    }

    fn complete_line(&mut self) {
        if self.discarding {
            self.discarding = false;
            return;
        }

        let raw = self.buffer.split();
        let text = String::from_utf8_lossy(&raw);
        let trimmed = text.trim_matches(|c: char| {
            c == char::from(CARRIAGE_RETURN) || c == char::from(LINE_TERMINATOR)
        });

        tracing::trace!(line = %trimmed, "framed status line");
        self.lines.push_back(StatusLine::new(trimmed));
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`LineFramer::drain_lines`].
pub struct DrainLines<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for DrainLines<'_> {
    type Item = StatusLine;

    fn next(&mut self) -> Option<Self::Item> {
        self.framer.next_line()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.framer.lines_available();
        (len, Some(len))
    }
}

impl ExactSizeIterator for DrainLines<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn collect(framer: &mut LineFramer) -> Vec<String> {
        framer.drain_lines().map(StatusLine::into_string).collect()
    }

    #[test]
    fn test_no_terminator_emits_nothing() {
        let mut framer = LineFramer::new();
        framer.feed(b"LOCKED");
        assert_eq!(framer.lines_available(), 0);
        assert_eq!(framer.buffered_len(), 6);
    }

    #[test]
    fn test_split_word_across_chunks() {
        let mut framer = LineFramer::new();
        framer.feed(b"LOC");
        framer.feed(b"KED\r");
        assert!(framer.next_line().is_none());
        framer.feed(b"\n");
        assert_eq!(framer.next_line().unwrap(), "LOCKED");
        assert_eq!(framer.buffered_len(), 0);
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut framer = LineFramer::new();
        framer.feed(b"BUSY\r\nOPEN\r\nUNLO");
        assert_eq!(collect(&mut framer), ["BUSY", "OPEN"]);

        framer.feed(b"CKED\r\n");
        assert_eq!(collect(&mut framer), ["UNLOCKED"]);
    }

    #[rstest]
    #[case(b"LOCKED\n", "LOCKED")]
    #[case(b"LOCKED\r\n", "LOCKED")]
    #[case(b"\rLOCKED\r\r\n", "LOCKED")]
    #[case(b"OPEN \r\n", "OPEN ")]
    fn test_strips_carriage_returns(#[case] input: &[u8], #[case] expected: &str) {
        let mut framer = LineFramer::new();
        framer.feed(input);
        assert_eq!(framer.next_line().unwrap(), expected);
    }

    #[test]
    fn test_empty_lines_are_emitted() {
        let mut framer = LineFramer::new();
        framer.feed(b"\r\n\r\nLOCKED\r\n");
        let lines: Vec<_> = framer.drain_lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].is_empty());
        assert!(lines[1].is_empty());
        assert_eq!(lines[2], "LOCKED");
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let mut framer = LineFramer::new();
        framer.feed(&[b'O', 0xFF, b'N', b'\n']);
        let line = framer.next_line().unwrap();
        assert_eq!(line.as_str(), "O\u{FFFD}N");
        assert!(!line.is_recognized());
    }

    #[test]
    fn test_clear_drops_partial_line() {
        let mut framer = LineFramer::new();
        framer.feed(b"BUSY\r\nLOC");
        framer.clear();
        assert_eq!(framer.lines_available(), 0);
        assert_eq!(framer.buffered_len(), 0);

        framer.feed(b"OPEN\r\n");
        assert_eq!(collect(&mut framer), ["OPEN"]);
    }

    #[test]
    fn test_max_line_drops_whole_line_across_chunks() {
        let mut framer = LineFramer::with_max_line(4);
        framer.feed(b"ABC");
        framer.feed(b"DEFG");
        assert_eq!(framer.buffered_len(), 0);
        framer.feed(b"HIJ\nOPEN\n");

        assert_eq!(collect(&mut framer), ["OPEN"]);
        assert_eq!(framer.take_overflow(), Some(10));
        assert_eq!(framer.take_overflow(), None);
    }

    #[test]
    fn test_max_line_allows_line_at_limit() {
        let mut framer = LineFramer::with_max_line(6);
        framer.feed(b"LOCKED\n");
        assert_eq!(collect(&mut framer), ["LOCKED"]);
        assert_eq!(framer.take_overflow(), None);
    }

    #[test]
    fn test_drain_lines_size_hint() {
        let mut framer = LineFramer::new();
        framer.feed(b"A\nB\nC\n");
        let drain = framer.drain_lines();
        assert_eq!(drain.len(), 3);
    }
}
