//! Command alphabet for the latch device.
//!
//! The host drives the device with single ASCII bytes. No terminator is
//! sent; the firmware acts on every byte it reads.
//!
//! | Command     | Byte | Typical reply sequence           |
//! |-------------|------|----------------------------------|
//! | `Open`      | `o`  | `BUSY`, `OPEN`, `UNLOCKED`       |
//! | `Close`     | `c`  | `BUSY`, `LOCKED`                 |
//! | `State`     | `s`  | `BUSY`, current state            |
//! | `Reference` | `r`  | `BUSY`, `LOCKED`                 |
//!
//! Not every firmware revision implements the reference run. A deployment
//! describes what its firmware accepts with a [`CommandSet`].
//!
//! # Examples
//!
//! ```
//! use latchkey_protocol::{Command, CommandSet};
//!
//! let cmd = Command::from_byte(b'o').unwrap();
//! assert_eq!(cmd, Command::Open);
//! assert_eq!(cmd.as_byte(), b'o');
//!
//! let legacy = CommandSet::default().without(Command::Reference);
//! assert!(!legacy.supports(Command::Reference));
//! ```

use latchkey_core::constants::{CMD_CLOSE, CMD_OPEN, CMD_REFERENCE, CMD_STATE};
use latchkey_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single-byte device command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Retract the latch and open the door.
    Open,
    /// Engage the latch.
    Close,
    /// Report the current state.
    State,
    /// Run the reference (homing) cycle; ends locked.
    Reference,
}

impl Command {
    /// All commands, in wire-byte order of the reference firmware.
    pub const ALL: [Command; 4] = [
        Command::Open,
        Command::Close,
        Command::State,
        Command::Reference,
    ];

    /// Wire byte for this command.
    #[inline]
    #[must_use]
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Open => CMD_OPEN,
            Self::Close => CMD_CLOSE,
            Self::State => CMD_STATE,
            Self::Reference => CMD_REFERENCE,
        }
    }

    /// Decode a wire byte.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCommand`] for bytes outside the alphabet.
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            CMD_OPEN => Ok(Self::Open),
            CMD_CLOSE => Ok(Self::Close),
            CMD_STATE => Ok(Self::State),
            CMD_REFERENCE => Ok(Self::Reference),
            other => Err(Error::InvalidCommand(other)),
        }
    }

    /// Human-readable name used in logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::State => "state",
            Self::Reference => "reference",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Self::Open => 1 << 0,
            Self::Close => 1 << 1,
            Self::State => 1 << 2,
            Self::Reference => 1 << 3,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ('{}')", self.name(), self.as_byte() as char)
    }
}

impl TryFrom<u8> for Command {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        Self::from_byte(byte)
    }
}

/// The subset of [`Command`]s a firmware revision accepts.
///
/// The default set enables every command. Older firmware without a
/// reference run is described with `CommandSet::default().without(Command::Reference)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandSet(u8);

impl CommandSet {
    /// Every command enabled.
    #[must_use]
    pub fn all() -> Self {
        Command::ALL.into_iter().collect()
    }

    /// No command enabled.
    #[must_use]
    pub fn empty() -> Self {
        Self(0)
    }

    /// Enable a command.
    #[must_use]
    pub fn with(self, command: Command) -> Self {
        Self(self.0 | command.bit())
    }

    /// Disable a command.
    #[must_use]
    pub fn without(self, command: Command) -> Self {
        Self(self.0 & !command.bit())
    }

    /// Returns `true` if the firmware accepts `command`.
    #[must_use]
    pub fn supports(self, command: Command) -> bool {
        self.0 & command.bit() != 0
    }

    /// Check a command against this set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCommand`] if the command is disabled.
    pub fn check(self, command: Command) -> Result<Command> {
        if self.supports(command) {
            Ok(command)
        } else {
            Err(Error::UnsupportedCommand(command.name().to_string()))
        }
    }

    /// Iterate over the enabled commands.
    pub fn iter(self) -> impl Iterator<Item = Command> {
        Command::ALL.into_iter().filter(move |c| self.supports(*c))
    }
}

impl Default for CommandSet {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<Command> for CommandSet {
    fn from_iter<I: IntoIterator<Item = Command>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl Serialize for CommandSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for CommandSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let commands = Vec::<Command>::deserialize(deserializer)?;
        Ok(commands.into_iter().collect())
    }
}
