//! Error types for driver operations.
//!
//! Facade calls only ever return [`DriverError::Busy`],
//! [`DriverError::Disconnected`], [`DriverError::Unsupported`] and, when the
//! matching [`DriverConfig`](crate::DriverConfig) options are enabled,
//! [`DriverError::Timeout`] or [`DriverError::Abandoned`].
//! [`DriverError::Connection`] stays inside the connection manager, which
//! logs it and reconnects.

/// Result type alias for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;

/// Errors that can occur while driving the device.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Another command is still outstanding.
    #[error("Device busy: a command is already in flight")]
    Busy,

    /// No live connection, or the command could not be written.
    #[error("Device disconnected: {endpoint}")]
    Disconnected { endpoint: String },

    /// No terminal status line arrived within the configured window.
    #[error("No response after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The link dropped while the command was outstanding.
    #[error("Command abandoned: connection lost")]
    Abandoned,

    /// The command is disabled for this firmware.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// Transport failure while opening, reading or writing the link.
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),
}

impl DriverError {
    /// Create a new disconnected error.
    pub fn disconnected(endpoint: impl Into<String>) -> Self {
        Self::Disconnected {
            endpoint: endpoint.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Returns `true` if the device could not be reached for this call.
    ///
    /// Covers [`Disconnected`](Self::Disconnected),
    /// [`Timeout`](Self::Timeout) and [`Abandoned`](Self::Abandoned).
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Disconnected { .. } | Self::Timeout { .. } | Self::Abandoned
        )
    }
}
