//! Wire protocol spoken with the controller board.
//!
//! Host to device: `<code>;` for idle/forced states and
//! `<heat>;<temperature>;<duration>;` for a heat command, each sent as one
//! `\n`-terminated line. Device to host: `<code>;[temperature;remaining;]`
//! where the two numbers are only present (and mandatory) for the heating
//! code.
use crate::error::DecodeError;
use crate::status::StatusCode;

/// Spelling of the three status codes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeVocabulary {
    idle: String,
    heat: String,
    done: String,
}

impl Default for CodeVocabulary {
    fn default() -> Self {
        Self::named()
    }
}

impl CodeVocabulary {
    /// `idle` / `heat` / `done`
    pub fn named() -> Self {
        Self::custom("idle", "heat", "done")
    }

    /// `0` / `1` / `2`, the first firmware revision's spelling.
    pub fn numeric() -> Self {
        Self::custom("0", "1", "2")
    }

    pub fn custom(idle: &str, heat: &str, done: &str) -> Self {
        Self {
            idle: idle.to_string(),
            heat: heat.to_string(),
            done: done.to_string(),
        }
    }

    pub fn token(&self, code: StatusCode) -> &str {
        match code {
            StatusCode::Idle => &self.idle,
            StatusCode::Heating => &self.heat,
            StatusCode::Done => &self.done,
        }
    }

    /// Exact wire token lookup.
    pub fn code_of(&self, token: &str) -> Option<StatusCode> {
        [StatusCode::Idle, StatusCode::Heating, StatusCode::Done]
            .into_iter()
            .find(|c| self.token(*c) == token)
    }

    /// Lookup for operator input: the wire token or the code's name
    /// (`idle`, `heating`, `done`, case-insensitive).
    pub fn parse_code(&self, input: &str) -> Option<StatusCode> {
        let input = input.trim();
        self.code_of(input)
            .or_else(|| StatusCode::from_name(&input.to_ascii_lowercase()))
    }
}

/// Commands the host sends to the board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Idle,
    /// Put the board into `code` without parameters.
    Force(StatusCode),
    Heat { temperature: f64, duration: f64 },
}

impl Command {
    /// Render the command line without its `\n` terminator.
    pub fn encode(&self, vocab: &CodeVocabulary) -> String {
        match self {
            Command::Idle => format!("{};", vocab.token(StatusCode::Idle)),
            Command::Force(code) => format!("{};", vocab.token(*code)),
            Command::Heat {
                temperature,
                duration,
            } => format!(
                "{};{};{};",
                vocab.token(StatusCode::Heating),
                temperature,
                duration
            ),
        }
    }
}

/// Temperature and remaining hold time carried by a heating report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatReading {
    pub temperature: f64,
    pub remaining_time: f64,
}

/// One decoded device status line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    pub code: StatusCode,
    pub reading: Option<HeatReading>,
}

/// Decode one status line (terminator already stripped).
pub fn decode_status_line(line: &str, vocab: &CodeVocabulary) -> Result<StatusReport, DecodeError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }
    let mut fields = trimmed.split(';').map(str::trim);
    let token = fields.next().unwrap_or_default();
    let code = vocab
        .code_of(token)
        .ok_or_else(|| DecodeError::UnknownCode {
            code: token.to_string(),
            line: line.to_string(),
        })?;

    if code != StatusCode::Heating {
        return Ok(StatusReport {
            code,
            reading: None,
        });
    }

    let temperature = number_field(fields.next(), "temperature", line)?;
    let remaining_time = number_field(fields.next(), "remaining time", line)?;
    Ok(StatusReport {
        code,
        reading: Some(HeatReading {
            temperature,
            remaining_time,
        }),
    })
}

fn number_field(raw: Option<&str>, field: &'static str, line: &str) -> Result<f64, DecodeError> {
    let raw = match raw {
        Some(r) if !r.is_empty() => r,
        _ => {
            return Err(DecodeError::MissingField {
                field,
                line: line.to_string(),
            });
        }
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(DecodeError::InvalidNumber {
            field,
            value: raw.to_string(),
            line: line.to_string(),
        }),
    }
}
