//! Status model: the device's last reported state.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::protocol::{CodeVocabulary, StatusReport, decode_status_line};

/// Closed set of states the board reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusCode {
    Idle,
    Heating,
    Done,
}

impl StatusCode {
    pub fn name(self) -> &'static str {
        match self {
            StatusCode::Idle => "idle",
            StatusCode::Heating => "heating",
            StatusCode::Done => "done",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "idle" => Some(StatusCode::Idle),
            "heating" => Some(StatusCode::Heating),
            "done" => Some(StatusCode::Done),
            _ => None,
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Last known device state. `timestamp` is Unix epoch seconds of the
/// observation; `temperature` and `remaining_time` hold the most recent
/// heating report and are kept across non-heating reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub status: StatusCode,
    pub timestamp: f64,
    pub temperature: f64,
    pub remaining_time: f64,
}

impl DeviceStatus {
    pub fn initial(now: f64) -> Self {
        Self {
            status: StatusCode::Idle,
            timestamp: now,
            temperature: 0.0,
            remaining_time: 0.0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == StatusCode::Idle
    }

    /// The state after observing `report` at `now`. Pure, so the caller can
    /// swap the whole value in at once.
    pub fn observe(&self, report: &StatusReport, now: f64) -> Self {
        let (temperature, remaining_time) = match report.reading {
            Some(r) => (r.temperature, r.remaining_time),
            None => (self.temperature, self.remaining_time),
        };
        Self {
            status: report.code,
            timestamp: now,
            temperature,
            remaining_time,
        }
    }

    /// Decode `line` and apply it. On error `self` is left untouched.
    pub fn update(
        &mut self,
        line: &str,
        vocab: &CodeVocabulary,
        now: f64,
    ) -> Result<StatusReport, DecodeError> {
        let report = decode_status_line(line, vocab)?;
        *self = self.observe(&report, now);
        Ok(report)
    }

    /// Structured snapshot for transmission or storage.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
