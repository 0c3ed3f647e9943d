use crate::constants::{STATUS_BUSY, STATUS_LOCKED, STATUS_OPEN, STATUS_UNKNOWN, STATUS_UNLOCKED};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Last authoritative status reported by the device.
///
/// The driver starts every process in [`DeviceState::Unknown`] and only the
/// device (through its status lines) moves it anywhere else. `Busy` is also
/// set locally while a command is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceState {
    /// Door is physically open.
    Open,
    /// Latch retracted.
    Unlocked,
    /// Latch engaged.
    Locked,
    /// Nothing recognized received yet, or the device reported something
    /// the driver does not understand.
    #[default]
    Unknown,
    /// A command is in flight.
    Busy,
}

impl DeviceState {
    /// Parse a wire status word.
    ///
    /// Returns `None` for anything outside the five known words. Matching is
    /// exact; the framer already stripped the line terminator.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            STATUS_OPEN => Some(Self::Open),
            STATUS_UNLOCKED => Some(Self::Unlocked),
            STATUS_LOCKED => Some(Self::Locked),
            STATUS_UNKNOWN => Some(Self::Unknown),
            STATUS_BUSY => Some(Self::Busy),
            _ => None,
        }
    }

    /// Parse a wire status word, mapping unrecognized words to `Unknown`.
    #[must_use]
    pub fn from_word_lossy(word: &str) -> Self {
        Self::from_word(word).unwrap_or(Self::Unknown)
    }

    /// The wire word for this state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => STATUS_OPEN,
            Self::Unlocked => STATUS_UNLOCKED,
            Self::Locked => STATUS_LOCKED,
            Self::Unknown => STATUS_UNKNOWN,
            Self::Busy => STATUS_BUSY,
        }
    }

    /// Returns `true` if a command is in flight.
    #[inline]
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Busy)
    }

    /// Returns `true` if the latch is engaged.
    #[inline]
    #[must_use]
    pub fn is_locked(self) -> bool {
        matches!(self, Self::Locked)
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One framed status line as received from the device.
///
/// The raw text is preserved so that words the driver does not recognize
/// still reach the caller. Use [`StatusLine::state`] for the parsed view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusLine(String);

impl StatusLine {
    /// Wrap an already trimmed line.
    pub fn new(line: impl Into<String>) -> Self {
        Self(line.into())
    }

    /// Raw line text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parsed state; unrecognized words map to [`DeviceState::Unknown`].
    #[must_use]
    pub fn state(&self) -> DeviceState {
        DeviceState::from_word_lossy(&self.0)
    }

    /// Returns `true` if the line is the device's `BUSY` acknowledgment.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.0 == STATUS_BUSY
    }

    /// Returns `true` if the line carries a known status word.
    #[must_use]
    pub fn is_recognized(&self) -> bool {
        DeviceState::from_word(&self.0).is_some()
    }

    /// Returns `true` for an empty line (terminator right after terminator).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the line and return the raw text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<DeviceState> for StatusLine {
    fn from(state: DeviceState) -> Self {
        Self(state.as_str().to_string())
    }
}

impl PartialEq<str> for StatusLine {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for StatusLine {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A non-`BUSY` status line published to passive observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// The line as received.
    pub line: StatusLine,

    /// When the background reader framed the line.
    pub received_at: DateTime<Utc>,
}

impl StatusEvent {
    /// Stamp a line with the current time.
    pub fn now(line: StatusLine) -> Self {
        Self {
            line,
            received_at: Utc::now(),
        }
    }

    /// Parsed state of the carried line.
    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.line.state()
    }
}
