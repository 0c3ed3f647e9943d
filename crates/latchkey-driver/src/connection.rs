//! Connection manager: the driver's background task.
//!
//! One task per driver owns the link for its whole lifetime:
//!
//! ```text
//! Disconnected --(first attempt: now, later: reconnect_delay)--> Connecting
//! Connecting   --connect ok-->  Connected
//! Connecting   --connect err--> Disconnected
//! Connected    --read err-->    Disconnected
//! ```
//!
//! There is no retry limit and no growth in the delay. While connected the
//! read half feeds a [`LineFramer`] created for that connection only, and
//! every framed line goes to the [`Correlator`](crate::Correlator). The write
//! half is parked in a shared slot for command writes.

use latchkey_protocol::{CommandCodec, LineFramer};
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, WriteHalf};
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;

use crate::driver::Shared;
use crate::link::{Connector, Link};

/// Write side of a live link, encoding commands.
pub(crate) type CommandSink = FramedWrite<WriteHalf<Link>, CommandCodec>;

/// Lifecycle of the device link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LinkState {
    /// No link. Waiting before the next attempt, or shut down.
    #[default]
    Disconnected,
    /// Connection attempt in progress.
    Connecting,
    /// Link open; lines are being read.
    Connected,
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
        }
    }
}

/// Why a connected session ended.
enum SessionEnd {
    Cancelled,
    Failed(io::Error),
}

/// Run the connect/read/reconnect cycle until `cancel` fires.
pub(crate) async fn run<C: Connector>(connector: C, shared: Arc<Shared>, cancel: CancellationToken) {
    let endpoint = connector.endpoint();
    let mut first_attempt = true;

    loop {
        if !first_attempt {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(shared.config.reconnect_delay) => {}
            }
            tracing::info!(endpoint = %endpoint, "reconnecting");
        }
        first_attempt = false;

        shared.set_link_state(LinkState::Connecting);

        let link = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = connector.connect() => result,
        };

        let link = match link {
            Ok(link) => link,
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, error = %e, "connect failed");
                shared.set_link_state(LinkState::Disconnected);
                continue;
            }
        };

        let (reader, writer) = tokio::io::split(link);
        *shared.writer.lock().await = Some(FramedWrite::new(writer, CommandCodec::new()));
        shared.set_link_state(LinkState::Connected);
        tracing::info!(endpoint = %endpoint, "connected to device");

        let end = read_session(reader, &shared, &cancel).await;

        // Dropping both halves closes the link.
        shared.writer.lock().await.take();
        shared.set_link_state(LinkState::Disconnected);

        match end {
            SessionEnd::Cancelled => break,
            SessionEnd::Failed(e) => {
                tracing::warn!(endpoint = %endpoint, error = %e, "link lost");
                if shared.config.abandon_on_disconnect {
                    shared.correlator.abandon();
                }
            }
        }
    }

    shared.writer.lock().await.take();
    shared.set_link_state(LinkState::Disconnected);
    tracing::info!(endpoint = %endpoint, "connection manager stopped");
}

/// Read and dispatch lines until the link fails or the driver shuts down.
async fn read_session<R>(mut reader: R, shared: &Shared, cancel: &CancellationToken) -> SessionEnd
where
    R: AsyncRead + Unpin,
{
    let config = &shared.config;
    let mut framer = config
        .max_line
        .map_or_else(LineFramer::new, LineFramer::with_max_line);
    let mut buf = vec![0u8; config.read_buffer_size.max(1)];

    loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return SessionEnd::Cancelled,
            read = reader.read(&mut buf) => read,
        };

        match read {
            Ok(0) => {
                // End-of-stream means "nothing yet" on some serial drivers.
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return SessionEnd::Cancelled,
                    _ = tokio::time::sleep(config.idle_poll) => {}
                }
            }
            Ok(n) => {
                tracing::trace!(bytes = n, data = ?String::from_utf8_lossy(&buf[..n]), "read from device");
                framer.feed(&buf[..n]);
                for line in framer.drain_lines() {
                    shared.correlator.dispatch(line);
                }
            }
            Err(e) => return SessionEnd::Failed(e),
        }
    }
}
