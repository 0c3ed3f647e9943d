//! Physical link to the device.
//!
//! The driver never opens a port itself. It asks a [`Connector`] for a fresh
//! [`Link`] every time the connection comes up, so the same reconnect logic
//! runs against a real serial port ([`SerialConnector`]) or an in-memory
//! double ([`MockConnector`](crate::mock::MockConnector)).

use serialport::SerialPortType;
use std::future::Future;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, StopBits};

use latchkey_core::constants::DEFAULT_BAUD_RATE;

/// Byte stream usable as a device link.
pub trait LinkStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> LinkStream for T {}

/// An open, exclusive connection to the device.
pub type Link = Box<dyn LinkStream>;

/// Source of device links.
///
/// Implementations must be cheap to call repeatedly: the connection manager
/// calls [`connect`](Connector::connect) once on start-up and again after
/// every link failure, forever.
pub trait Connector: Send + Sync + 'static {
    /// Open a new link to the device.
    fn connect(&self) -> impl Future<Output = io::Result<Link>> + Send;

    /// Human-readable endpoint name for logs and errors.
    fn endpoint(&self) -> String;
}

/// Connector for a device on a serial port (8N1, no flow control).
#[derive(Debug, Clone)]
pub struct SerialConnector {
    path: String,
    baud_rate: u32,
}

impl SerialConnector {
    /// Connector for `path` at the default 9600 baud.
    ///
    /// ```
    /// use latchkey_driver::{Connector, SerialConnector};
    ///
    /// let connector = SerialConnector::new("/dev/ttyACM0").with_baud_rate(19200);
    /// assert_eq!(connector.endpoint(), "/dev/ttyACM0@19200");
    /// ```
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }

    /// Override the baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Serial port path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Configured baud rate.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

impl Connector for SerialConnector {
    async fn connect(&self) -> io::Result<Link> {
        tracing::debug!(port = %self.path, baud_rate = self.baud_rate, "opening serial port");

        let stream = tokio_serial::new(&self.path, self.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .open_native_async()?;

        Ok(Box::new(stream))
    }

    fn endpoint(&self) -> String {
        format!("{}@{}", self.path, self.baud_rate)
    }
}

/// A serial port visible to the operating system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Path or name used to open the port.
    pub name: String,

    /// Short description of the port type.
    pub kind: String,
}

/// List the serial ports present on this machine.
///
/// # Errors
///
/// Returns the underlying enumeration error as [`io::Error`].
pub fn available_ports() -> io::Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()?;

    Ok(ports
        .into_iter()
        .map(|port| PortInfo {
            kind: describe(&port.port_type),
            name: port.port_name,
        })
        .collect())
}

fn describe(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let product = usb.product.as_deref().unwrap_or("unknown device");
            format!("USB {:04x}:{:04x} {}", usb.vid, usb.pid, product)
        }
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::Unknown => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_connector_defaults() {
        let connector = SerialConnector::new("/dev/ttyUSB0");
        assert_eq!(connector.path(), "/dev/ttyUSB0");
        assert_eq!(connector.baud_rate(), 9600);
        assert_eq!(connector.endpoint(), "/dev/ttyUSB0@9600");
    }

    #[tokio::test]
    async fn test_serial_connector_missing_port_fails() {
        let connector = SerialConnector::new("/dev/latchkey-does-not-exist");
        assert!(connector.connect().await.is_err());
    }

    #[test]
    fn test_describe_port_types() {
        assert_eq!(describe(&SerialPortType::PciPort), "PCI");
        assert_eq!(describe(&SerialPortType::Unknown), "unknown");
    }
}
