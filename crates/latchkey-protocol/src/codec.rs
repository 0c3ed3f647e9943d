//! Tokio codecs for both directions of the serial link.
//!
//! ```text
//! host   --CommandCodec-->  device     single command byte, no terminator
//! device --StatusCodec-->   host       status word + "\r\n"
//! ```
//!
//! Each codec implements both [`Decoder`] and [`Encoder`], so the same type
//! serves the host side and the device side (the emulator and test doubles).
//!
//! # Usage with Tokio Framed
//!
//! ```rust,no_run
//! use futures::{SinkExt, StreamExt};
//! use latchkey_protocol::{Command, CommandCodec, StatusCodec};
//! use tokio_util::codec::{FramedRead, FramedWrite};
//!
//! # async fn example() -> latchkey_core::Result<()> {
//! let (host, device) = tokio::io::duplex(64);
//! let (host_rx, host_tx) = tokio::io::split(host);
//!
//! let mut commands = FramedWrite::new(host_tx, CommandCodec::new());
//! let mut status = FramedRead::new(host_rx, StatusCodec::new());
//!
//! commands.send(Command::State).await?;
//! if let Some(line) = status.next().await {
//!     println!("device says {}", line?);
//! }
//! # drop(device);
//! # Ok(())
//! # }
//! ```

use bytes::{Buf, BufMut, BytesMut};
use latchkey_core::constants::LINE_ENDING;
use latchkey_core::{DeviceState, Error, Result, StatusLine};
use tokio_util::codec::{Decoder, Encoder};

use crate::{Command, LineFramer};

/// Codec for the host-to-device command byte stream.
///
/// Decoding skips ASCII whitespace, which terminals and test scripts tend
/// to send after a command. Any other byte outside the alphabet is consumed
/// and reported as [`Error::InvalidCommand`].
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandCodec;

impl CommandCodec {
    /// Create a command codec.
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for CommandCodec {
    type Item = Command;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Command>> {
        while src.has_remaining() {
            let byte = src.get_u8();
            if byte.is_ascii_whitespace() {
                continue;
            }
            return Command::from_byte(byte).map(Some);
        }
        Ok(None)
    }
}

impl Encoder<Command> for CommandCodec {
    type Error = Error;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<()> {
        dst.put_u8(item.as_byte());
        Ok(())
    }
}

/// Codec for the device-to-host status line stream.
///
/// The decoder wraps a [`LineFramer`]. When the framer was built with a
/// line limit, an over-long line surfaces once as [`Error::LineTooLong`]
/// after it has been dropped.
#[derive(Debug, Default)]
pub struct StatusCodec {
    framer: LineFramer,
}

impl StatusCodec {
    /// Create a codec without a line length limit.
    pub fn new() -> Self {
        Self {
            framer: LineFramer::new(),
        }
    }

    /// Create a codec whose decoder drops lines longer than `max_line`.
    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            framer: LineFramer::with_max_line(max_line),
        }
    }

    fn write_line(word: &str, dst: &mut BytesMut) {
        dst.reserve(word.len() + LINE_ENDING.len());
        dst.put_slice(word.as_bytes());
        dst.put_slice(LINE_ENDING.as_bytes());
    }
}

impl Decoder for StatusCodec {
    type Item = StatusLine;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<StatusLine>> {
        if !src.is_empty() {
            // All bytes move into the framer's accumulator.
            self.framer.feed(src);
            src.clear();
        }

        if let Some(len) = self.framer.take_overflow() {
            let max = self.framer.max_line().unwrap_or(len);
            return Err(Error::LineTooLong { len, max });
        }

        Ok(self.framer.next_line())
    }
}

impl Encoder<DeviceState> for StatusCodec {
    type Error = Error;

    fn encode(&mut self, item: DeviceState, dst: &mut BytesMut) -> Result<()> {
        Self::write_line(item.as_str(), dst);
        Ok(())
    }
}

impl Encoder<StatusLine> for StatusCodec {
    type Error = Error;

    fn encode(&mut self, item: StatusLine, dst: &mut BytesMut) -> Result<()> {
        Self::write_line(item.as_str(), dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_encode_is_single_byte() {
        let mut codec = CommandCodec::new();
        let mut buffer = BytesMut::new();

        codec.encode(Command::Open, &mut buffer).unwrap();
        codec.encode(Command::Close, &mut buffer).unwrap();

        assert_eq!(&buffer[..], b"oc");
    }

    #[test]
    fn test_command_decode_skips_whitespace() {
        let mut codec = CommandCodec::new();
        let mut buffer = BytesMut::from(&b"o\r\n s"[..]);

        assert_eq!(codec.decode(&mut buffer).unwrap(), Some(Command::Open));
        assert_eq!(codec.decode(&mut buffer).unwrap(), Some(Command::State));
        assert_eq!(codec.decode(&mut buffer).unwrap(), None);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_command_decode_invalid_byte_is_consumed() {
        let mut codec = CommandCodec::new();
        let mut buffer = BytesMut::from(&b"xc"[..]);

        assert!(matches!(
            codec.decode(&mut buffer),
            Err(Error::InvalidCommand(b'x'))
        ));
        assert_eq!(codec.decode(&mut buffer).unwrap(), Some(Command::Close));
    }

    #[test]
    fn test_status_decode_partial_then_complete() {
        let mut codec = StatusCodec::new();

        let mut buffer = BytesMut::from(&b"UNLO"[..]);
        assert!(codec.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"CKED\r\nLOCKED\r\n");
        assert_eq!(codec.decode(&mut buffer).unwrap().unwrap(), "UNLOCKED");
        assert_eq!(codec.decode(&mut buffer).unwrap().unwrap(), "LOCKED");
        assert!(codec.decode(&mut buffer).unwrap().is_none());
    }

    #[test]
    fn test_status_decode_line_too_long() {
        let mut codec = StatusCodec::with_max_line(8);
        let mut buffer = BytesMut::from(&b"0123456789ABCDEF\r\nOPEN\r\n"[..]);

        match codec.decode(&mut buffer) {
            Err(Error::LineTooLong { len, max }) => {
                assert_eq!(max, 8);
                assert!(len > max);
            }
            other => panic!("expected LineTooLong, got {other:?}"),
        }

        assert_eq!(codec.decode(&mut buffer).unwrap().unwrap(), "OPEN");
    }

    #[test]
    fn test_status_encode_appends_crlf() {
        let mut codec = StatusCodec::new();
        let mut buffer = BytesMut::new();

        codec.encode(DeviceState::Busy, &mut buffer).unwrap();
        codec
            .encode(StatusLine::new("JAMMED"), &mut buffer)
            .unwrap();

        assert_eq!(&buffer[..], b"BUSY\r\nJAMMED\r\n");
    }
}
