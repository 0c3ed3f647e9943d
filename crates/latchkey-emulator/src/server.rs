//! Serve the emulated firmware over a byte stream.

use futures::SinkExt;
use latchkey_core::Result;
use latchkey_core::constants::READ_BUFFER_SIZE;
use latchkey_protocol::StatusCodec;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio_util::codec::FramedWrite;

use crate::mechanism::{LockMechanism, Step};

/// Run the firmware loop on `stream` until the peer closes it.
///
/// Every received byte is handled in order; bytes arriving while the
/// mechanism is moving wait in the stream buffer, just like on the serial
/// line of the real device.
///
/// # Errors
///
/// Returns the first read or write error.
///
/// # Examples
///
/// ```
/// use futures::StreamExt;
/// use latchkey_emulator::{LockMechanism, LockTimings, serve};
/// use latchkey_protocol::StatusCodec;
/// use tokio::io::AsyncWriteExt;
/// use tokio_util::codec::FramedRead;
///
/// #[tokio::main]
/// async fn main() {
///     let (mut host, device) = tokio::io::duplex(64);
///     tokio::spawn(async move {
///         let mut lock = LockMechanism::new(LockTimings::instant());
///         serve(device, &mut lock).await
///     });
///
///     host.write_all(b"s").await.unwrap();
///     let mut lines = FramedRead::new(host, StatusCodec::new());
///     assert_eq!(lines.next().await.unwrap().unwrap(), "BUSY");
///     assert_eq!(lines.next().await.unwrap().unwrap(), "LOCKED");
/// }
/// ```
pub async fn serve<S>(stream: S, mechanism: &mut LockMechanism) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut reader, writer) = tokio::io::split(stream);
    let mut lines = FramedWrite::new(writer, StatusCodec::new());
    let mut buf = [0u8; READ_BUFFER_SIZE];

    tracing::info!(latch = %mechanism.latch(), "emulator ready");

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            tracing::info!("host closed the link");
            return Ok(());
        }

        for &byte in &buf[..n] {
            let script = mechanism.react(byte);
            if script.is_empty() {
                continue;
            }

            tracing::debug!(byte = %char::from(byte).escape_default(), "command received");

            for step in script {
                match step {
                    Step::Report(state) => {
                        tracing::trace!(state = %state, "report");
                        lines.send(state).await?;
                    }
                    Step::Wait(duration) if !duration.is_zero() => {
                        tokio::time::sleep(duration).await;
                    }
                    Step::Wait(_) => {}
                }
            }
        }
    }
}
