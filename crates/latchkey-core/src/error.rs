use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Protocol errors
    #[error("Invalid command byte: 0x{0:02X}")]
    InvalidCommand(u8),

    #[error("Command not supported by this firmware: {0}")]
    UnsupportedCommand(String),

    #[error("Line too long: {len} bytes (max {max})")]
    LineTooLong { len: usize, max: usize },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
