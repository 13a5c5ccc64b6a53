pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Receiving half of a line-oriented device link.
pub trait LineReader {
    /// Block for at most `timeout` and return one line with its terminator
    /// stripped.
    fn read_line(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// Sending half of a line-oriented device link.
pub trait LineWriter {
    /// Write `line` followed by a single `\n`.
    fn write_line(&mut self, line: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: LineReader + ?Sized> LineReader for Box<T> {
    fn read_line(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_line(timeout)
    }
}

impl<T: LineWriter + ?Sized> LineWriter for Box<T> {
    fn write_line(&mut self, line: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).write_line(line)
    }
}
