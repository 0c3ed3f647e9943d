//! Device end of a mock link.

use bytes::BytesMut;
use latchkey_core::DeviceState;
use latchkey_core::constants::LINE_ENDING;
use latchkey_protocol::{Command, CommandCodec};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};
use tokio_util::codec::Decoder;

/// Host end of a mock link, with read fault injection.
pub(crate) struct MockLink {
    stream: DuplexStream,
    fault: Arc<AtomicBool>,
}

impl MockLink {
    /// Wrap both ends of an in-memory stream.
    pub(crate) fn pair(host: DuplexStream, device: DuplexStream) -> (Self, MockDevice) {
        let fault = Arc::new(AtomicBool::new(false));
        let link = Self {
            stream: host,
            fault: Arc::clone(&fault),
        };
        (link, MockDevice::new(device, fault))
    }

    fn faulted(&self) -> bool {
        self.fault.load(Ordering::SeqCst)
    }
}

fn injected_fault() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "injected read failure")
}

impl AsyncRead for MockLink {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.faulted() {
            return Poll::Ready(Err(injected_fault()));
        }

        let polled = Pin::new(&mut self.stream).poll_read(cx, buf);
        if polled.is_ready() && self.faulted() {
            return Poll::Ready(Err(injected_fault()));
        }
        polled
    }
}

impl AsyncWrite for MockLink {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

/// Simulated device on the far end of a [`MockConnector`](super::MockConnector) link.
///
/// Tests write status lines with [`send_line`](Self::send_line) and observe
/// the driver's commands with [`read_command`](Self::read_command).
#[derive(Debug)]
pub struct MockDevice {
    stream: Option<DuplexStream>,
    fault: Arc<AtomicBool>,
    codec: CommandCodec,
    inbox: BytesMut,
}

impl MockDevice {
    fn new(stream: DuplexStream, fault: Arc<AtomicBool>) -> Self {
        Self {
            stream: Some(stream),
            fault,
            codec: CommandCodec::new(),
            inbox: BytesMut::new(),
        }
    }

    /// Write raw bytes to the driver.
    pub async fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let stream = self.stream.as_mut().ok_or_else(closed)?;
        stream.write_all(bytes).await?;
        stream.flush().await
    }

    /// Write one status line, terminated the way the firmware does.
    pub async fn send_line(&mut self, word: &str) -> io::Result<()> {
        let mut line = String::with_capacity(word.len() + LINE_ENDING.len());
        line.push_str(word);
        line.push_str(LINE_ENDING);
        self.write(line.as_bytes()).await
    }

    /// Write the status word of `state`.
    pub async fn send_state(&mut self, state: DeviceState) -> io::Result<()> {
        self.send_line(state.as_str()).await
    }

    /// Wait for the next command byte from the driver.
    ///
    /// Returns `None` once the driver side is gone. Bytes outside the
    /// command alphabet are skipped.
    pub async fn read_command(&mut self) -> Option<Command> {
        loop {
            match self.codec.decode(&mut self.inbox) {
                Ok(Some(command)) => return Some(command),
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "mock device skipped byte");
                    continue;
                }
            }

            let stream = self.stream.as_mut()?;
            match stream.read_buf(&mut self.inbox).await {
                Ok(0) | Err(_) => return None,
                Ok(_) => {}
            }
        }
    }

    /// Make the driver's next read fail, then drop this end of the link.
    pub fn fail_read(&mut self) {
        self.fault.store(true, Ordering::SeqCst);
        self.stream = None;
    }

    /// Drop this end of the link. The driver only sees end-of-stream.
    pub fn disconnect(&mut self) {
        self.stream = None;
    }

    /// Returns `true` until [`fail_read`](Self::fail_read) or
    /// [`disconnect`](Self::disconnect) is called.
    pub fn is_attached(&self) -> bool {
        self.stream.is_some()
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "mock device detached")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fail_read_surfaces_error_on_host() {
        let (host, device) = tokio::io::duplex(64);
        let (mut link, mut device) = MockLink::pair(host, device);

        device.fail_read();
        assert!(!device.is_attached());

        let mut buf = [0u8; 4];
        let err = link.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_disconnect_is_plain_eof() {
        let (host, device) = tokio::io::duplex(64);
        let (mut link, mut device) = MockLink::pair(host, device);

        device.disconnect();

        let mut buf = [0u8; 4];
        assert_eq!(link.read(&mut buf).await.unwrap(), 0);
        assert!(device.send_line("OPEN").await.is_err());
    }

    #[tokio::test]
    async fn test_read_command_skips_noise() {
        let (host, device) = tokio::io::duplex(64);
        let (mut link, mut device) = MockLink::pair(host, device);

        link.write_all(b"\r\nxc").await.unwrap();
        assert_eq!(device.read_command().await, Some(Command::Close));

        drop(link);
        assert_eq!(device.read_command().await, None);
    }
}
