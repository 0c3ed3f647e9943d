//! Driver configuration.

use latchkey_core::constants::{IDLE_POLL_INTERVAL, READ_BUFFER_SIZE, RECONNECT_DELAY};
use latchkey_protocol::CommandSet;
use std::time::Duration;

/// Default capacity of the status broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 32;

/// Tunables for a [`Driver`](crate::Driver).
///
/// The defaults reproduce the behaviour of the reference daemon: a fixed
/// five second reconnect delay, no line length limit, and outstanding
/// commands that wait for the device indefinitely, even across a reconnect.
///
/// # Examples
///
/// ```
/// use latchkey_driver::DriverConfig;
/// use latchkey_protocol::{Command, CommandSet};
/// use std::time::Duration;
///
/// let config = DriverConfig::default()
///     .with_response_timeout(Duration::from_secs(10))
///     .with_abandon_on_disconnect(true)
///     .with_commands(CommandSet::default().without(Command::Reference));
///
/// assert_eq!(config.response_timeout, Some(Duration::from_secs(10)));
/// ```
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Wait between reconnection attempts (never before the first).
    pub reconnect_delay: Duration,

    /// Pause after a zero-byte read before reading again.
    pub idle_poll: Duration,

    /// Size of the read buffer handed to the link.
    pub read_buffer_size: usize,

    /// Optional cap on status line length.
    pub max_line: Option<usize>,

    /// Fail an outstanding command with `Timeout` after this long.
    pub response_timeout: Option<Duration>,

    /// Fail an outstanding command with `Abandoned` when the link drops.
    pub abandon_on_disconnect: bool,

    /// Commands the device firmware accepts.
    pub commands: CommandSet,

    /// Capacity of the status broadcast channel.
    pub event_capacity: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: RECONNECT_DELAY,
            idle_poll: IDLE_POLL_INTERVAL,
            read_buffer_size: READ_BUFFER_SIZE,
            max_line: None,
            response_timeout: None,
            abandon_on_disconnect: false,
            commands: CommandSet::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl DriverConfig {
    /// Set the reconnect delay.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the idle poll interval.
    pub fn with_idle_poll(mut self, interval: Duration) -> Self {
        self.idle_poll = interval;
        self
    }

    /// Cap status lines at `max_line` bytes.
    pub fn with_max_line(mut self, max_line: usize) -> Self {
        self.max_line = Some(max_line);
        self
    }

    /// Fail outstanding commands after `timeout`.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }

    /// Fail outstanding commands when the link drops.
    pub fn with_abandon_on_disconnect(mut self, abandon: bool) -> Self {
        self.abandon_on_disconnect = abandon;
        self
    }

    /// Restrict the commands sent to the device.
    pub fn with_commands(mut self, commands: CommandSet) -> Self {
        self.commands = commands;
        self
    }

    /// Set the status broadcast capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}
