//! Response correlation and the state cache.
//!
//! The device answers every command with an unsolicited stream of status
//! lines: first `BUSY`, then one or more terminal words. Nothing on the wire
//! ties a line to the command that caused it, so the driver enforces a
//! single outstanding command and hands that command the first non-`BUSY`
//! line that arrives after it was sent.
//!
//! ```text
//!  caller                 Correlator                    reader task
//!    | begin(cmd) ----------> state := BUSY
//!    |                        pending := slot
//!    | write byte ....................................> device
//!    |                                                  "BUSY"   -> state only
//!    | <----------- slot <--- take pending <----------- "LOCKED" -> state, slot, broadcast
//! ```
//!
//! The cached state and the pending slot live under one short, non-async
//! lock. The `BUSY` check and the `BUSY` store happen under the same guard,
//! so two callers can never both pass the check.

use latchkey_core::{DeviceState, StatusEvent, StatusLine};
use latchkey_protocol::Command;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};

use crate::error::{DriverError, Result};

/// Outcome delivered through a pending slot.
pub(crate) type Reply = Result<StatusLine>;

/// Receipt for a registered command.
#[derive(Debug)]
pub struct Ticket {
    id: u64,
    command: Command,
    reply: oneshot::Receiver<Reply>,
}

impl Ticket {
    /// Identifier of the request inside the correlator.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Command the ticket was issued for.
    pub fn command(&self) -> Command {
        self.command
    }

    /// Wait for the terminal status line, at most `window` when given.
    ///
    /// Resolves to [`DriverError::Abandoned`] if the slot was discarded
    /// without an answer, and to [`DriverError::Timeout`] if the window
    /// elapsed first. The expired request is removed from `correlator`.
    pub async fn wait(mut self, correlator: &Correlator, window: Option<Duration>) -> Reply {
        let Some(window) = window else {
            return self.reply.await.unwrap_or(Err(DriverError::Abandoned));
        };

        match tokio::time::timeout(window, &mut self.reply).await {
            Ok(reply) => reply.unwrap_or(Err(DriverError::Abandoned)),
            Err(_) => self.deadline_passed(correlator, window),
        }
    }

    /// Settle the request once its window is over.
    ///
    /// The reader may fill the slot between the deadline and the expiry;
    /// that answer wins over the timeout.
    fn deadline_passed(&mut self, correlator: &Correlator, window: Duration) -> Reply {
        if correlator.expire(self.id) {
            tracing::warn!(id = self.id, command = %self.command, "no response from device");
            return Err(DriverError::timeout(window.as_millis() as u64));
        }

        self.reply.try_recv().unwrap_or(Err(DriverError::Abandoned))
    }
}

#[derive(Debug)]
struct Pending {
    id: u64,
    command: Command,
    reply: oneshot::Sender<Reply>,
}

#[derive(Debug, Default)]
struct Cell {
    state: DeviceState,
    pending: Option<Pending>,
    next_id: u64,
}

/// Single-flight request correlator holding the device state cache.
#[derive(Debug)]
pub struct Correlator {
    cell: Mutex<Cell>,
    events: broadcast::Sender<StatusEvent>,
}

impl Correlator {
    /// Create a correlator publishing status events on a channel of
    /// `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            cell: Mutex::new(Cell::default()),
            events,
        }
    }

    /// Current cached state. Never blocks on the device.
    pub fn state(&self) -> DeviceState {
        self.cell().state
    }

    /// Returns `true` if a command is registered and unanswered.
    pub fn has_pending(&self) -> bool {
        self.cell().pending.is_some()
    }

    /// Subscribe to every non-`BUSY` status line.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.events.subscribe()
    }

    /// Register `command` as the outstanding request.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Busy`] if the cache reads `BUSY`, without
    /// touching the pending slot.
    pub fn begin(&self, command: Command) -> Result<Ticket> {
        let mut cell = self.cell();

        if cell.state.is_busy() {
            return Err(DriverError::Busy);
        }

        cell.next_id = cell.next_id.wrapping_add(1);
        let id = cell.next_id;
        let (tx, rx) = oneshot::channel();

        cell.state = DeviceState::Busy;
        cell.pending = Some(Pending {
            id,
            command,
            reply: tx,
        });

        tracing::debug!(id, command = ?command, "command registered");

        Ok(Ticket {
            id,
            command,
            reply: rx,
        })
    }

    /// Drop request `id` because its command never reached the device.
    ///
    /// The cache falls back to `UNKNOWN`.
    pub fn fail(&self, id: u64) {
        let mut cell = self.cell();
        if Self::take_if(&mut cell, id).is_some() {
            cell.state = DeviceState::Unknown;
            tracing::debug!(id, "command not sent, slot discarded");
        }
    }

    /// Drop request `id` after its response window elapsed.
    ///
    /// Returns `true` if the request was still pending. The cache leaves
    /// `BUSY` for `UNKNOWN` so the next command is accepted.
    pub fn expire(&self, id: u64) -> bool {
        let mut cell = self.cell();
        match Self::take_if(&mut cell, id) {
            Some(pending) => {
                if cell.state.is_busy() {
                    cell.state = DeviceState::Unknown;
                }
                tracing::debug!(id, command = ?pending.command, "command timed out");
                true
            }
            None => false,
        }
    }

    /// Fail the outstanding request, if any, with [`DriverError::Abandoned`].
    ///
    /// The cache is reset to `UNKNOWN`.
    pub fn abandon(&self) {
        let mut cell = self.cell();
        cell.state = DeviceState::Unknown;

        if let Some(pending) = cell.pending.take() {
            tracing::debug!(id = pending.id, command = ?pending.command, "command abandoned");
            // Receiver may be gone already.
            let _ = pending.reply.send(Err(DriverError::Abandoned));
        }
    }

    /// Process one framed line from the device.
    ///
    /// Empty lines are ignored. Every other line updates the cache; a
    /// non-`BUSY` line also completes the pending request and is published
    /// to subscribers.
    pub fn dispatch(&self, line: StatusLine) {
        if line.is_empty() {
            tracing::trace!("ignoring empty status line");
            return;
        }

        let pending = {
            let mut cell = self.cell();
            cell.state = line.state();

            if line.is_busy() {
                tracing::debug!("device busy");
                return;
            }

            cell.pending.take()
        };

        if !line.is_recognized() {
            tracing::warn!(line = %line, "unrecognized status word");
        }

        if let Some(pending) = pending {
            match pending.reply.send(Ok(line.clone())) {
                Ok(()) => {
                    tracing::debug!(id = pending.id, command = ?pending.command, line = %line, "response delivered");
                }
                Err(_) => {
                    tracing::debug!(id = pending.id, line = %line, "caller gone, response discarded");
                }
            }
        } else {
            tracing::debug!(line = %line, "status update");
        }

        // No subscribers is fine.
        let _ = self.events.send(StatusEvent::now(line));
    }

    fn take_if(cell: &mut Cell, id: u64) -> Option<Pending> {
        match &cell.pending {
            Some(pending) if pending.id == id => cell.pending.take(),
            _ => None,
        }
    }

    fn cell(&self) -> MutexGuard<'_, Cell> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
