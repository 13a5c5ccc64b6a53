//! Device link implementations for the brewing controller board.
//!
//! - `serial` (feature `hardware`): the real board over a serial port.
//! - `sim`: an in-process simulator speaking the same line protocol.
//! - `util`: line framing shared by both.
pub mod error;
#[cfg(feature = "hardware")]
pub mod serial;
pub mod sim;
pub mod util;

pub use error::HwError;
pub use sim::{SimCodes, SimParams, SimulatedBrewer};
