use std::io::ErrorKind;
use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Longest line accepted from the device before the pending bytes are
/// discarded as garbage.
pub const MAX_LINE_LEN: usize = 256;

/// Accumulates raw bytes from the link and splits them into `\n`-terminated
/// lines. Partial lines survive across reads, so a timeout in the middle of
/// a line does not lose the bytes already received.
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    max_len: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(MAX_LINE_LEN)
    }
}

impl LineBuffer {
    pub fn new(max_len: usize) -> Self {
        Self {
            pending: Vec::with_capacity(max_len.min(1024)),
            max_len: max_len.max(1),
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Bytes received but not yet terminated.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Pop the next complete line, stripping `\n` and an optional `\r`.
    /// Blank lines are skipped. Non-UTF-8 content is returned as an error
    /// and dropped from the buffer.
    pub fn take_line(&mut self) -> Option<Result<String>> {
        loop {
            let Some(pos) = self.pending.iter().position(|b| *b == b'\n') else {
                if self.pending.len() > self.max_len {
                    let junk = std::mem::take(&mut self.pending);
                    return Some(Err(HwError::Undecodable(junk)));
                }
                return None;
            };
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.is_empty() {
                continue;
            }
            return Some(String::from_utf8(line).map_err(|e| HwError::Undecodable(e.into_bytes())));
        }
    }
}

/// Read through `read` until `buf` yields a complete line or `timeout`
/// elapses. `read` is expected to block briefly and report "no data" as
/// `TimedOut`/`WouldBlock`, which is how serial ports behave.
pub fn read_line_with_timeout(
    mut read: impl FnMut(&mut [u8]) -> std::io::Result<usize>,
    buf: &mut LineBuffer,
    timeout: Duration,
) -> Result<String> {
    let deadline = Instant::now() + timeout;
    let mut chunk = [0u8; 64];
    loop {
        if let Some(line) = buf.take_line() {
            return line;
        }
        if Instant::now() >= deadline {
            return Err(HwError::Timeout);
        }
        match read(&mut chunk) {
            Ok(0) => return Err(HwError::Closed),
            Ok(n) => buf.extend(&chunk[..n]),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(HwError::Io(e)),
        }
    }
}
