//! Mock connector.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;

use super::device::{MockDevice, MockLink};
use crate::link::{Connector, Link};

/// Buffer size of each in-memory link direction.
const LINK_CAPACITY: usize = 256;

#[derive(Debug)]
struct Inner {
    name: String,
    online: AtomicBool,
    attempts: AtomicUsize,
    devices: mpsc::UnboundedSender<MockDevice>,
}

/// Connector producing in-memory links.
///
/// # Examples
///
/// ```
/// use latchkey_driver::mock::MockConnector;
/// use latchkey_driver::{Driver, DriverConfig};
///
/// #[tokio::main]
/// async fn main() {
///     let (connector, mut handle) = MockConnector::new();
///     let driver = Driver::start(connector, DriverConfig::default());
///
///     let mut device = handle.next_device().await.unwrap();
///     driver.wait_connected().await;
///
///     let mut events = driver.subscribe();
///     device.send_line("LOCKED").await.unwrap();
///
///     let event = events.recv().await.unwrap();
///     assert_eq!(event.line, "LOCKED");
///     assert!(driver.query().is_locked());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockConnector {
    inner: Arc<Inner>,
}

impl MockConnector {
    /// Create an online mock connector and its control handle.
    pub fn new() -> (Self, MockConnectorHandle) {
        Self::with_name("mock")
    }

    /// Create a mock connector with a custom endpoint name.
    pub fn with_name(name: impl Into<String>) -> (Self, MockConnectorHandle) {
        let (devices_tx, devices_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(Inner {
            name: name.into(),
            online: AtomicBool::new(true),
            attempts: AtomicUsize::new(0),
            devices: devices_tx,
        });

        let handle = MockConnectorHandle {
            inner: Arc::clone(&inner),
            devices: devices_rx,
        };

        (Self { inner }, handle)
    }
}

impl Connector for MockConnector {
    async fn connect(&self) -> io::Result<Link> {
        self.inner.attempts.fetch_add(1, Ordering::SeqCst);

        if !self.inner.online.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: device offline", self.inner.name),
            ));
        }

        let (host, device) = tokio::io::duplex(LINK_CAPACITY);
        let (link, device) = MockLink::pair(host, device);

        // The test may not care about this device.
        let _ = self.inner.devices.send(device);

        Ok(Box::new(link))
    }

    fn endpoint(&self) -> String {
        self.inner.name.clone()
    }
}

/// Test-side control of a [`MockConnector`].
#[derive(Debug)]
pub struct MockConnectorHandle {
    inner: Arc<Inner>,
    devices: mpsc::UnboundedReceiver<MockDevice>,
}

impl MockConnectorHandle {
    /// Make later connection attempts succeed or fail.
    ///
    /// Links that are already open are not affected.
    pub fn set_online(&self, online: bool) {
        self.inner.online.store(online, Ordering::SeqCst);
    }

    /// Number of connection attempts so far, failed ones included.
    pub fn attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Wait for the device end of the next successful connection.
    pub async fn next_device(&mut self) -> Option<MockDevice> {
        self.devices.recv().await
    }
}
