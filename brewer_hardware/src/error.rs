use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("serial port error: {0}")]
    Port(String),
    #[error("serial read timeout")]
    Timeout,
    #[error("undecodable bytes from device: {0:?}")]
    Undecodable(Vec<u8>),
    #[error("device link closed")]
    Closed,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
