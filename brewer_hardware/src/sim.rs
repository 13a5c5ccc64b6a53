//! Simulated brewing device.
//!
//! Speaks the same line protocol as the real controller board so the whole
//! stack can run without hardware. A heat command ramps the simulated
//! temperature towards the target, then counts the hold time down; once it
//! reaches zero the device reports the done code until commanded otherwise.
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use brewer_traits::{LineReader, LineWriter};
use tracing::{debug, warn};

use crate::error::{HwError, Result};

/// Code tokens the simulator understands. Must match the host's vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimCodes {
    pub idle: String,
    pub heat: String,
    pub done: String,
}

impl SimCodes {
    pub fn named() -> Self {
        Self {
            idle: "idle".into(),
            heat: "heat".into(),
            done: "done".into(),
        }
    }

    pub fn numeric() -> Self {
        Self {
            idle: "0".into(),
            heat: "1".into(),
            done: "2".into(),
        }
    }
}

impl Default for SimCodes {
    fn default() -> Self {
        Self::named()
    }
}

#[derive(Debug, Clone)]
pub struct SimParams {
    pub codes: SimCodes,
    /// Temperature before the first heat command.
    pub ambient: f64,
    /// Degrees the simulated mash moves towards the target per read.
    pub ramp_per_read: f64,
    /// Hold minutes consumed per read once the target is reached.
    pub minutes_per_read: f64,
    /// How long each read blocks, emulating the board's report interval.
    pub read_delay: Duration,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            codes: SimCodes::default(),
            ambient: 20.0,
            ramp_per_read: 1.0,
            minutes_per_read: 1.0,
            read_delay: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    Idle,
    Heating { target: f64, remaining: f64 },
    Done,
    /// A forced code the simulator has no behavior for; echoed verbatim.
    Raw(String),
}

#[derive(Debug)]
struct SimState {
    params: SimParams,
    mode: Mode,
    temperature: f64,
    received: Vec<String>,
    fail_reads: u32,
}

/// Handle to a simulated device; cheap to clone. `split()` yields the link
/// halves handed to the controller, while the handle itself stays available
/// for inspection.
#[derive(Debug, Clone)]
pub struct SimulatedBrewer {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulatedBrewer {
    fn default() -> Self {
        Self::new(SimParams::default())
    }
}

impl SimulatedBrewer {
    pub fn new(params: SimParams) -> Self {
        let temperature = params.ambient;
        Self {
            state: Arc::new(Mutex::new(SimState {
                params,
                mode: Mode::Idle,
                temperature,
                received: Vec::new(),
                fail_reads: 0,
            })),
        }
    }

    pub fn split(&self) -> (SimReader, SimWriter) {
        (
            SimReader {
                state: self.state.clone(),
            },
            SimWriter {
                state: self.state.clone(),
            },
        )
    }

    /// Every command line received so far, without the terminator.
    pub fn received(&self) -> Vec<String> {
        self.lock().map(|s| s.received.clone()).unwrap_or_default()
    }

    /// Make the next `n` reads fail with a timeout.
    pub fn fail_next_reads(&self, n: u32) {
        if let Ok(mut s) = self.lock() {
            s.fail_reads = n;
        }
    }

    pub fn temperature(&self) -> f64 {
        self.lock().map(|s| s.temperature).unwrap_or(f64::NAN)
    }

    fn lock(&self) -> Result<MutexGuard<'_, SimState>> {
        lock_state(&self.state)
    }
}

fn lock_state(state: &Mutex<SimState>) -> Result<MutexGuard<'_, SimState>> {
    state
        .lock()
        .map_err(|_| HwError::Port("simulator state poisoned".into()))
}

impl SimState {
    fn apply(&mut self, line: &str) {
        self.received.push(line.to_string());
        let mut fields = line.split(';').map(str::trim);
        let code = fields.next().unwrap_or_default();
        let codes = &self.params.codes;
        if code == codes.idle {
            self.mode = Mode::Idle;
        } else if code == codes.done {
            self.mode = Mode::Done;
        } else if code == codes.heat {
            let target = fields.next().and_then(|f| f.parse::<f64>().ok());
            let duration = fields.next().and_then(|f| f.parse::<f64>().ok());
            match (target, duration) {
                (Some(target), Some(remaining)) => {
                    self.mode = Mode::Heating { target, remaining };
                }
                _ => warn!(line, "simulator ignoring malformed heat command"),
            }
        } else if !code.is_empty() {
            self.mode = Mode::Raw(code.to_string());
        }
        debug!(line, mode = ?self.mode, "simulator command");
    }

    fn report(&mut self) -> String {
        let codes = &self.params.codes;
        match self.mode.clone() {
            Mode::Idle => format!("{};", codes.idle),
            Mode::Done => format!("{};", codes.done),
            Mode::Raw(code) => format!("{code};"),
            Mode::Heating { target, remaining } => {
                let line = format!("{};{};{};", codes.heat, self.temperature, remaining);
                let gap = target - self.temperature;
                if gap.abs() > self.params.ramp_per_read {
                    self.temperature += self.params.ramp_per_read.copysign(gap);
                } else {
                    self.temperature = target;
                    let left = remaining - self.params.minutes_per_read;
                    self.mode = if left <= 0.0 {
                        Mode::Done
                    } else {
                        Mode::Heating {
                            target,
                            remaining: left,
                        }
                    };
                }
                line
            }
        }
    }
}

pub struct SimReader {
    state: Arc<Mutex<SimState>>,
}

pub struct SimWriter {
    state: Arc<Mutex<SimState>>,
}

impl SimReader {
    pub fn next_line(&mut self, timeout: Duration) -> Result<String> {
        let delay = lock_state(&self.state)?.params.read_delay;
        if !delay.is_zero() {
            std::thread::sleep(delay.min(timeout));
        }
        let mut s = lock_state(&self.state)?;
        if s.fail_reads > 0 {
            s.fail_reads -= 1;
            return Err(HwError::Timeout);
        }
        Ok(s.report())
    }
}

impl SimWriter {
    pub fn send(&mut self, line: &str) -> Result<()> {
        lock_state(&self.state)?.apply(line);
        Ok(())
    }
}

impl LineReader for SimReader {
    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.next_line(timeout).map_err(Into::into)
    }
}

impl LineWriter for SimWriter {
    fn write_line(
        &mut self,
        line: &str,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.send(line).map_err(Into::into)
    }
}
