//! Runtime settings for the order controller and its monitor.
//!
//! Separate from the TOML schema in `brewer_config`; see `conversions` for
//! the mapping.
use std::time::Duration;

use crate::history::DEFAULT_HISTORY_LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Monitor polling period.
    pub tick: Duration,
    /// Pause after forcing the device idle before a replacement order starts.
    pub settle: Duration,
    /// Longest a single status read may block.
    pub read_timeout: Duration,
    /// History Ring capacity.
    pub history_len: usize,
    /// Consecutive read/decode failures before the monitor stops the order
    /// and exits. 1 = give up on the first failure.
    pub read_failure_limit: u32,
    /// Extra wait after a failed read.
    pub read_failure_backoff: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            settle: Duration::from_secs(2),
            read_timeout: Duration::from_secs(2),
            history_len: DEFAULT_HISTORY_LEN,
            read_failure_limit: 3,
            read_failure_backoff: Duration::from_millis(500),
        }
    }
}
