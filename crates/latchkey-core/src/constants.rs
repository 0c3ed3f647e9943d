//! Core constants for the latch line protocol.
//!
//! This module defines the wire-level constants shared by the driver, the
//! device emulator and the gateway. The device speaks a minimal ASCII
//! protocol over a serial link:
//!
//! ```text
//! host  -> device:  o | c | s | r           (single byte, no terminator)
//! device -> host:   BUSY\r\n  OPEN\r\n  ...  (status word, CR/LF terminated)
//! ```
//!
//! # Usage
//!
//! ```
//! use latchkey_core::constants::*;
//!
//! assert_eq!(CMD_OPEN, b'o');
//! assert_eq!(STATUS_LOCKED, "LOCKED");
//! assert_eq!(DEFAULT_BAUD_RATE, 9600);
//! ```

use std::time::Duration;

// ============================================================================
// Command Bytes
// ============================================================================

/// Open the latch.
pub const CMD_OPEN: u8 = b'o';

/// Close (lock) the latch.
pub const CMD_CLOSE: u8 = b'c';

/// Ask the device to report its current state.
pub const CMD_STATE: u8 = b's';

/// Run the reference (homing) cycle. Not available on every firmware.
pub const CMD_REFERENCE: u8 = b'r';

// ============================================================================
// Status Words
// ============================================================================

/// Door is physically open.
pub const STATUS_OPEN: &str = "OPEN";

/// Latch retracted, door closed.
pub const STATUS_UNLOCKED: &str = "UNLOCKED";

/// Latch engaged.
pub const STATUS_LOCKED: &str = "LOCKED";

/// State not known (also reported for unrecognized words).
pub const STATUS_UNKNOWN: &str = "UNKNOWN";

/// Command acknowledged, mechanical action in progress.
///
/// This is a transit word. It never completes a request.
pub const STATUS_BUSY: &str = "BUSY";

// ============================================================================
// Line Framing
// ============================================================================

/// Line terminator byte. Every status line ends with it.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Carriage return, stripped together with [`LINE_TERMINATOR`].
pub const CARRIAGE_RETURN: u8 = b'\r';

/// Line ending written by the device firmware (`Serial.println`).
pub const LINE_ENDING: &str = "\r\n";

// ============================================================================
// Serial Link
// ============================================================================

/// Default serial speed in baud.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Fixed delay between reconnection attempts.
///
/// The first attempt happens immediately. Every later attempt waits exactly
/// this long; there is no growth, jitter or retry limit.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Pause after a zero-byte read before reading again.
///
/// Some serial transports report end-of-stream when no data is waiting.
/// That is not a fault, so the reader idles briefly instead of spinning.
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Read buffer size for the serial reader task.
pub const READ_BUFFER_SIZE: usize = 128;
