//! Emulator of the door latch firmware.
//!
//! Speaks the device side of the serial protocol: single command bytes in,
//! CRLF-terminated status words out, with the motor delays of the real
//! mechanism. Useful for exercising the driver and the HTTP gateway without
//! hardware, either in-process over [`tokio::io::duplex`] or on a serial
//! port through the `latchkey simulate` command.
//!
//! - [`mechanism`]: the latch state machine and its command scripts.
//! - [`serve`]: plays those scripts on a byte stream.

pub mod mechanism;
pub mod server;

pub use mechanism::{Latch, LockMechanism, LockTimings, Movement, Step};
pub use server::serve;
