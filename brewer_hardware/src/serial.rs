use std::io::{Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, trace};

use crate::error::{HwError, Result};
use crate::util::{LineBuffer, read_line_with_timeout};

/// Upper bound for a single blocking `read` on the port; the overall line
/// timeout is enforced by `read_line_with_timeout`.
const POLL_SLICE: Duration = Duration::from_millis(100);

/// Open `path` at `baud` and split it into independent reader and writer
/// halves so the monitor thread can block in a read while control calls
/// still write commands.
pub fn open(path: &str, baud: u32, read_timeout: Duration) -> Result<(SerialReader, SerialWriter)> {
    let port = serialport::new(path, baud)
        .timeout(read_timeout.min(POLL_SLICE))
        .open()
        .map_err(|e| HwError::Port(format!("open {path}: {e}")))?;
    let write_half = port
        .try_clone()
        .map_err(|e| HwError::Port(format!("clone {path}: {e}")))?;
    debug!(path, baud, "serial link open");
    Ok((
        SerialReader {
            port,
            buf: LineBuffer::default(),
        },
        SerialWriter { port: write_half },
    ))
}

pub struct SerialReader {
    port: Box<dyn SerialPort>,
    buf: LineBuffer,
}

impl SerialReader {
    pub fn read_line_timeout(&mut self, timeout: Duration) -> Result<String> {
        self.port
            .set_timeout(timeout.min(POLL_SLICE))
            .map_err(|e| HwError::Port(e.to_string()))?;
        let port = &mut self.port;
        let line = read_line_with_timeout(|chunk| port.read(chunk), &mut self.buf, timeout)?;
        trace!(line = %line, "serial rx");
        Ok(line)
    }
}

pub struct SerialWriter {
    port: Box<dyn SerialPort>,
}

impl SerialWriter {
    pub fn send(&mut self, line: &str) -> Result<()> {
        trace!(line, "serial tx");
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\n")?;
        self.port.flush()?;
        Ok(())
    }
}

impl brewer_traits::LineReader for SerialReader {
    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.read_line_timeout(timeout).map_err(Into::into)
    }
}

impl brewer_traits::LineWriter for SerialWriter {
    fn write_line(
        &mut self,
        line: &str,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.send(line).map_err(Into::into)
    }
}
