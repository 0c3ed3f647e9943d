//! Driver facade.
//!
//! [`Driver`] is the only type collaborators need. It is `Send + Sync` and is
//! usually shared behind an `Arc`:
//!
//! ```no_run
//! use latchkey_driver::{Driver, DriverConfig, SerialConnector};
//! use std::sync::Arc;
//!
//! # async fn example() -> latchkey_driver::Result<()> {
//! let driver = Arc::new(Driver::start(
//!     SerialConnector::new("/dev/ttyACM0"),
//!     DriverConfig::default(),
//! ));
//!
//! let reply = driver.open().await?;
//! println!("device answered {reply}, cached state is {}", driver.query());
//! # Ok(())
//! # }
//! ```

use futures::SinkExt;
use latchkey_core::{DeviceState, StatusEvent, StatusLine};
use latchkey_protocol::Command;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::DriverConfig;
use crate::connection::{self, CommandSink, LinkState};
use crate::correlator::Correlator;
use crate::error::{DriverError, Result};
use crate::link::Connector;

/// State shared between the facade and the background task.
pub(crate) struct Shared {
    pub(crate) config: DriverConfig,
    pub(crate) endpoint: String,
    pub(crate) correlator: Correlator,
    pub(crate) writer: tokio::sync::Mutex<Option<CommandSink>>,
    link: watch::Sender<LinkState>,
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("endpoint", &self.endpoint)
            .field("state", &self.correlator.state())
            .field("link", &*self.link.borrow())
            .finish_non_exhaustive()
    }
}

impl Shared {
    pub(crate) fn set_link_state(&self, state: LinkState) {
        self.link.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                tracing::debug!(from = %current, to = %state, "link state");
                *current = state;
                true
            }
        });
    }
}

/// Handle to a running device driver.
///
/// Dropping the driver stops its background task.
#[derive(Debug)]
pub struct Driver {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Driver {
    /// Start the driver's background connection task.
    ///
    /// The first connection attempt happens immediately. Must be called
    /// from within a Tokio runtime.
    pub fn start<C: Connector>(connector: C, config: DriverConfig) -> Self {
        let (link, _) = watch::channel(LinkState::Disconnected);
        let shared = Arc::new(Shared {
            endpoint: connector.endpoint(),
            correlator: Correlator::new(config.event_capacity),
            writer: tokio::sync::Mutex::new(None),
            link,
            config,
        });

        tracing::info!(endpoint = %shared.endpoint, "starting device driver");

        let cancel = CancellationToken::new();
        let task = tokio::spawn(connection::run(connector, Arc::clone(&shared), cancel.clone()));

        Self {
            shared,
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    /// Open the latch.
    ///
    /// Returns the first non-`BUSY` line the device sends after the command,
    /// usually `OPEN`. Callers should not assume the word.
    ///
    /// # Errors
    ///
    /// [`DriverError::Busy`] if a command is outstanding,
    /// [`DriverError::Disconnected`] if the command could not be written.
    pub async fn open(&self) -> Result<StatusLine> {
        self.submit(Command::Open).await
    }

    /// Close the latch.
    ///
    /// When the cache already reads `LOCKED` this returns `LOCKED` without
    /// talking to the device.
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open).
    pub async fn close(&self) -> Result<StatusLine> {
        if self.query().is_locked() {
            tracing::debug!("already locked, close skipped");
            return Ok(StatusLine::from(DeviceState::Locked));
        }
        self.submit(Command::Close).await
    }

    /// Run the reference cycle. The device ends up locked.
    ///
    /// # Errors
    ///
    /// [`DriverError::Unsupported`] when the configured command set
    /// disables it, otherwise the same as [`open`](Self::open).
    pub async fn reset(&self) -> Result<StatusLine> {
        self.submit(Command::Reference).await
    }

    /// Ask the device for its state instead of reading the cache.
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open).
    pub async fn refresh(&self) -> Result<StatusLine> {
        self.submit(Command::State).await
    }

    /// Cached device state. Never blocks and never touches the device.
    pub fn query(&self) -> DeviceState {
        self.shared.correlator.state()
    }

    /// Subscribe to every non-`BUSY` status line the device sends.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.shared.correlator.subscribe()
    }

    /// Current link state.
    pub fn link_state(&self) -> LinkState {
        *self.shared.link.borrow()
    }

    /// Watch link state changes.
    pub fn watch_link(&self) -> watch::Receiver<LinkState> {
        self.shared.link.subscribe()
    }

    /// Wait until the link is up.
    pub async fn wait_connected(&self) {
        let mut rx = self.watch_link();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|state| *state == LinkState::Connected).await;
    }

    /// Endpoint name reported by the connector.
    pub fn endpoint(&self) -> &str {
        &self.shared.endpoint
    }

    /// Stop the background task and close the link.
    ///
    /// Later commands fail with [`DriverError::Disconnected`]. Calling this
    /// more than once is harmless.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(task) = task
            && let Err(e) = task.await
        {
            tracing::warn!(error = %e, "connection task ended abnormally");
        }

        tracing::info!(endpoint = %self.shared.endpoint, "device driver stopped");
    }

    async fn submit(&self, command: Command) -> Result<StatusLine> {
        let command = self.shared.config.commands.check(command).map_err(|e| {
            tracing::debug!(error = %e, "command rejected");
            DriverError::unsupported(command.name())
        })?;

        let correlator = &self.shared.correlator;
        let ticket = correlator.begin(command)?;
        let mut unsent = UnsentGuard {
            correlator,
            id: ticket.id(),
            armed: true,
        };

        {
            let mut writer = self.shared.writer.lock().await;
            let Some(sink) = writer.as_mut() else {
                tracing::debug!(command = ?command, "no link, command rejected");
                return Err(DriverError::disconnected(&self.shared.endpoint));
            };

            if let Err(e) = sink.send(command).await {
                tracing::warn!(command = ?command, error = %e, "command write failed");
                return Err(DriverError::disconnected(&self.shared.endpoint));
            }
        }

        unsent.armed = false;
        tracing::info!(id = ticket.id(), command = %ticket.command(), "command sent");

        ticket
            .wait(correlator, self.shared.config.response_timeout)
            .await
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Releases the pending slot if the command never made it onto the wire,
/// including when the caller drops the future mid-write.
struct UnsentGuard<'a> {
    correlator: &'a Correlator,
    id: u64,
    armed: bool,
}

impl Drop for UnsentGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.correlator.fail(self.id);
        }
    }
}
