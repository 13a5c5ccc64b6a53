//! In-memory link halves for driving the controller without hardware.
//!
//! `ScriptedReader` hands out lines pushed through its `Script` handle and
//! times out like a serial port when nothing is queued. `RecordingWriter`
//! keeps every command line it was asked to send.
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use brewer_traits::{LineReader, LineWriter};
use crossbeam_channel as xch;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

enum Scripted {
    Line(String),
    Fail(io::ErrorKind),
}

/// Feeding side of a `ScriptedReader`.
#[derive(Clone)]
pub struct Script {
    tx: xch::Sender<Scripted>,
}

impl Script {
    /// Queue one status line.
    pub fn push(&self, line: impl Into<String>) {
        let _ = self.tx.send(Scripted::Line(line.into()));
    }

    /// Queue a read failure of the given kind (`TimedOut` maps to a link
    /// timeout).
    pub fn fail(&self, kind: io::ErrorKind) {
        let _ = self.tx.send(Scripted::Fail(kind));
    }
}

pub struct ScriptedReader {
    rx: xch::Receiver<Scripted>,
}

impl ScriptedReader {
    pub fn new() -> (Script, Self) {
        let (tx, rx) = xch::unbounded();
        (Script { tx }, Self { rx })
    }
}

impl LineReader for ScriptedReader {
    fn read_line(&mut self, timeout: Duration) -> Result<String, BoxError> {
        match self.rx.recv_timeout(timeout) {
            Ok(Scripted::Line(line)) => Ok(line),
            Ok(Scripted::Fail(kind)) => Err(Box::new(io::Error::new(kind, "scripted failure"))),
            Err(xch::RecvTimeoutError::Timeout) => Err(Box::new(io::Error::new(
                io::ErrorKind::TimedOut,
                "no scripted line",
            ))),
            Err(xch::RecvTimeoutError::Disconnected) => Err(Box::new(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "script dropped",
            ))),
        }
    }
}

/// Writer that records lines; clones share the record.
#[derive(Clone, Default)]
pub struct RecordingWriter {
    lines: Arc<Mutex<Vec<String>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingWriter {
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make subsequent writes fail with a broken pipe until reset.
    pub fn fail_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }
}

impl LineWriter for RecordingWriter {
    fn write_line(&mut self, line: &str) -> Result<(), BoxError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(Box::new(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "recording writer set to fail",
            )));
        }
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
        Ok(())
    }
}
