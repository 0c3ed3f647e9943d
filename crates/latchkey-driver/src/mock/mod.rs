//! In-memory link doubles for testing without a serial port.
//!
//! [`MockConnector`] plugs into [`Driver::start`](crate::Driver::start) like
//! any other connector. Every successful connect creates a fresh in-memory
//! stream and hands its device end to the test as a [`MockDevice`] through
//! the [`MockConnectorHandle`].

pub mod connector;
pub mod device;

pub use connector::{MockConnector, MockConnectorHandle};
pub use device::MockDevice;
