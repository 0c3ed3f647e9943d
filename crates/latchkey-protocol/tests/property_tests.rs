//! Property-based tests for line framing.
//!
//! The serial driver may hand the framer any split of the byte stream, so
//! the emitted lines must depend on the bytes alone.

use latchkey_protocol::LineFramer;
use proptest::prelude::*;

/// Strategy for status words, known and unknown, without terminators.
fn status_word() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("OPEN".to_string()),
        Just("UNLOCKED".to_string()),
        Just("LOCKED".to_string()),
        Just("UNKNOWN".to_string()),
        Just("BUSY".to_string()),
        Just(String::new()),
        prop::string::string_regex("[A-Z ]{1,12}").expect("Failed to create word regex strategy"),
    ]
}

/// Strategy for an arbitrary byte stream, terminators included.
fn raw_stream() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        prop_oneof![
            3 => any::<u8>(),
            1 => Just(b'\n'),
            1 => Just(b'\r'),
        ],
        0..200,
    )
}

/// Feed `bytes` split at the given cut points and collect all lines.
fn frame_chunked(bytes: &[u8], cuts: &[usize]) -> Vec<String> {
    let mut framer = LineFramer::new();
    let mut points: Vec<usize> = cuts.iter().map(|c| c % (bytes.len() + 1)).collect();
    points.sort_unstable();

    let mut start = 0;
    for point in points {
        framer.feed(&bytes[start..point]);
        start = point;
    }
    framer.feed(&bytes[start..]);

    framer.drain_lines().map(|l| l.into_string()).collect()
}

fn frame_whole(bytes: &[u8]) -> Vec<String> {
    let mut framer = LineFramer::new();
    framer.feed(bytes);
    framer.drain_lines().map(|l| l.into_string()).collect()
}

proptest! {
    /// Property: any split of a byte stream yields the same lines.
    #[test]
    fn prop_framing_is_chunking_invariant(
        bytes in raw_stream(),
        cuts in prop::collection::vec(any::<usize>(), 0..16),
    ) {
        prop_assert_eq!(frame_chunked(&bytes, &cuts), frame_whole(&bytes));
    }

    /// Property: CRLF-terminated words come back exactly, one line each.
    #[test]
    fn prop_crlf_words_recovered(
        words in prop::collection::vec(status_word(), 0..20),
        cuts in prop::collection::vec(any::<usize>(), 0..16),
    ) {
        let stream: Vec<u8> = words
            .iter()
            .flat_map(|w| w.bytes().chain(*b"\r\n"))
            .collect();

        prop_assert_eq!(frame_chunked(&stream, &cuts), words);
    }

    /// Property: without a terminator nothing is emitted.
    #[test]
    fn prop_no_terminator_no_lines(
        bytes in prop::collection::vec(any::<u8>().prop_filter("no LF", |b| *b != b'\n'), 0..200),
    ) {
        let mut framer = LineFramer::new();
        framer.feed(&bytes);
        prop_assert_eq!(framer.lines_available(), 0);
        prop_assert_eq!(framer.buffered_len(), bytes.len());
    }

    /// Property: the number of lines equals the number of `\n` bytes.
    #[test]
    fn prop_one_line_per_terminator(bytes in raw_stream()) {
        let expected = bytes.iter().filter(|b| **b == b'\n').count();
        prop_assert_eq!(frame_whole(&bytes).len(), expected);
    }
}
