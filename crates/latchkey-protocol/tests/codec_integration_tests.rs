//! Integration tests for the status and command codecs over Tokio streams.

use futures::{SinkExt, StreamExt};
use latchkey_core::{DeviceState, Error, StatusLine};
use latchkey_protocol::{Command, CommandCodec, StatusCodec};
use tokio::io::AsyncWriteExt;
use tokio_util::codec::{FramedRead, FramedWrite};

#[tokio::test]
async fn test_status_lines_over_duplex() {
    let (device, host) = tokio::io::duplex(64);
    let mut tx = FramedWrite::new(device, StatusCodec::new());
    let mut rx = FramedRead::new(host, StatusCodec::new());

    tx.send(DeviceState::Busy).await.unwrap();
    tx.send(DeviceState::Open).await.unwrap();
    tx.send(StatusLine::new("JAMMED")).await.unwrap();

    assert_eq!(rx.next().await.unwrap().unwrap(), "BUSY");
    assert_eq!(rx.next().await.unwrap().unwrap(), "OPEN");

    let unknown = rx.next().await.unwrap().unwrap();
    assert_eq!(unknown.as_str(), "JAMMED");
    assert_eq!(unknown.state(), DeviceState::Unknown);
}

#[tokio::test]
async fn test_status_line_split_across_writes() {
    let (mut device, host) = tokio::io::duplex(64);
    let mut rx = FramedRead::new(host, StatusCodec::new());

    let reader = tokio::spawn(async move { rx.next().await.unwrap().unwrap() });

    device.write_all(b"LOC").await.unwrap();
    device.flush().await.unwrap();
    tokio::task::yield_now().await;
    device.write_all(b"KED\r\n").await.unwrap();

    assert_eq!(reader.await.unwrap(), "LOCKED");
}

#[tokio::test]
async fn test_commands_over_duplex() {
    let (host, device) = tokio::io::duplex(64);
    let mut tx = FramedWrite::new(host, CommandCodec::new());
    let mut rx = FramedRead::new(device, CommandCodec::new());

    for cmd in Command::ALL {
        tx.send(cmd).await.unwrap();
    }

    for expected in Command::ALL {
        assert_eq!(rx.next().await.unwrap().unwrap(), expected);
    }
}

#[tokio::test]
async fn test_invalid_command_surfaces_error() {
    let (mut host, device) = tokio::io::duplex(64);
    let mut rx = FramedRead::new(device, CommandCodec::new());

    host.write_all(b"\nz").await.unwrap();

    let result = rx.next().await.unwrap();
    assert!(matches!(result, Err(Error::InvalidCommand(b'z'))));
}

#[tokio::test]
async fn test_status_stream_ends_on_eof() {
    let (mut device, host) = tokio::io::duplex(64);
    let mut rx = FramedRead::new(host, StatusCodec::new());

    device.write_all(b"OPEN\r\nUNLO").await.unwrap();
    drop(device);

    assert_eq!(rx.next().await.unwrap().unwrap(), "OPEN");
    // The unterminated tail is never emitted.
    assert!(rx.next().await.is_none());
}
