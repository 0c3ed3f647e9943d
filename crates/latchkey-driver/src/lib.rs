//! Serial driver for a door latch controller.
//!
//! The device sits behind a byte-oriented serial link. It accepts single
//! ASCII command bytes and reports its state as newline-terminated words
//! (`OPEN`, `UNLOCKED`, `LOCKED`, `UNKNOWN`, `BUSY`). This crate turns that
//! unsolicited line stream into awaitable, single-flight operations.
//!
//! # Architecture
//!
//! ```text
//!  callers ──open/close/reset/refresh──► Driver ──write byte──► link
//!                                          │                     │
//!                         query ◄── Correlator ◄── LineFramer ◄──┘
//!                                  (state cache,   (background task,
//!                                   pending slot)   reconnects forever)
//! ```
//!
//! - [`connection`]: background task that opens the link through a
//!   [`Connector`], reads and frames lines, and reconnects after a fixed
//!   delay when the link fails.
//! - [`Correlator`]: caches the device state and hands the first non-`BUSY`
//!   line after a command to that command's caller.
//! - [`Driver`]: the public facade.
//!
//! # Semantics worth knowing
//!
//! - At most one command is outstanding. A second `open`/`close` gets
//!   [`DriverError::Busy`] immediately instead of queuing.
//! - `close` is skipped when the cache already reads `LOCKED`.
//! - `query` reads the cache and never touches the device.
//! - By default an outstanding command waits for the device forever, even
//!   across a reconnect. [`DriverConfig::response_timeout`] and
//!   [`DriverConfig::abandon_on_disconnect`] change that.
//!
//! # Testing without hardware
//!
//! The [`mock`] module (feature `mock`, on by default) provides an
//! in-memory connector and a scriptable device end.

pub mod config;
pub mod connection;
pub mod correlator;
pub mod driver;
pub mod error;
pub mod link;
#[cfg(feature = "mock")]
pub mod mock;

pub use config::DriverConfig;
pub use connection::LinkState;
pub use correlator::{Correlator, Ticket};
pub use driver::Driver;
pub use error::{DriverError, Result};
pub use link::{Connector, Link, LinkStream, PortInfo, SerialConnector, available_ports};
