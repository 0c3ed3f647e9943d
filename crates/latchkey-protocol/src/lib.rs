//! Wire protocol for the latch device.
//!
//! - [`Command`] / [`CommandSet`]: the single-byte command alphabet and the
//!   per-firmware subset a deployment accepts.
//! - [`LineFramer`]: turns a raw byte stream into trimmed status lines.
//! - [`CommandCodec`] / [`StatusCodec`]: tokio-util codecs for both
//!   directions of the link.

pub mod codec;
pub mod commands;
pub mod framer;

pub use codec::{CommandCodec, StatusCodec};
pub use commands::{Command, CommandSet};
pub use framer::{DrainLines, LineFramer};
