use thiserror::Error;

/// Failures of the device link itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("timeout waiting for device status")]
    Timeout,
    #[error("undecodable bytes from device: {0}")]
    Undecodable(String),
    #[error("device link closed")]
    Closed,
    #[error("device link io error: {0}")]
    Io(String),
}

/// A status line that arrived intact but does not follow the protocol.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty status line")]
    Empty,
    #[error("unknown status code {code:?} in line {line:?}")]
    UnknownCode { code: String, line: String },
    #[error("heating status missing {field} in line {line:?}")]
    MissingField { field: &'static str, line: String },
    #[error("heating status has invalid {field} {value:?} in line {line:?}")]
    InvalidNumber {
        field: &'static str,
        value: String,
        line: String,
    },
}

/// A submitted brew order that cannot be executed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OrderError {
    #[error("order has no mash steps")]
    NoSteps,
    #[error("order name is empty")]
    EmptyName,
    #[error("mash step {index} is invalid: {reason}")]
    InvalidStep { index: usize, reason: &'static str },
    #[error("malformed order document: {0}")]
    Malformed(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BrewError {
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error("unknown status code {0:?}")]
    UnknownCode(String),
    #[error("order log error: {0}")]
    Storage(String),
    #[error("invalid state: {0}")]
    State(String),
}

impl BrewError {
    /// Failures that abort a monitor tick (and count towards the failure limit).
    pub fn is_read_failure(&self) -> bool {
        matches!(self, BrewError::Link(_) | BrewError::Decode(_))
    }
}

pub type Result<T> = eyre::Result<T>;
