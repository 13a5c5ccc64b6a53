#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the brewing controller.
//!
//! `Config` and its sections are deserialized from TOML and checked by
//! `Config::validate`. Only `[serial]` is mandatory; every other section
//! falls back to the values the controller board was built around.
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Status snapshots the controller keeps for history queries, at most.
pub const MAX_HISTORY_LEN: usize = 20;

#[derive(Debug, Deserialize)]
pub struct Serial {
    /// Device path of the controller board, e.g. /dev/ttyACM0
    pub port: String,
    #[serde(default = "default_baud")]
    pub baud: u32,
    /// Longest a single status read may block (ms).
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

fn default_baud() -> u32 {
    9600
}

fn default_read_timeout_ms() -> u64 {
    2000
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Storage {
    /// Directory that receives one order log per order activation.
    pub dir: PathBuf,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/home/pi/BeerBrewerFiles"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControllerCfg {
    /// Polling tick of the monitor thread (ms)
    pub tick_ms: u64,
    /// Pause after forcing the device idle before a new order starts (ms)
    pub settle_ms: u64,
    /// Number of status snapshots kept for history queries
    pub history_len: usize,
    /// Consecutive read/decode failures tolerated before the monitor gives up
    pub read_failure_limit: u32,
    /// Extra wait after a failed read (ms)
    pub read_failure_backoff_ms: u64,
}

impl Default for ControllerCfg {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            settle_ms: 2000,
            history_len: 20,
            read_failure_limit: 3,
            read_failure_backoff_ms: 500,
        }
    }
}

/// Spelling of the status codes on the wire.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CodeStyle {
    /// idle / heat / done
    #[default]
    Named,
    /// 0 / 1 / 2, as spoken by the first firmware revision
    Numeric,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Protocol {
    pub codes: CodeStyle,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Server {
    /// Listen address of the HTTP control surface
    pub bind: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5550".into(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub serial: Serial,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub controller: ControllerCfg,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg =
        load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration {}: {}", path.display(), e))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Serial
        if self.serial.port.trim().is_empty() {
            eyre::bail!("serial.port must not be empty");
        }
        if self.serial.baud == 0 {
            eyre::bail!("serial.baud must be > 0");
        }
        if self.serial.read_timeout_ms == 0 {
            eyre::bail!("serial.read_timeout_ms must be >= 1");
        }
        if self.serial.read_timeout_ms > 60_000 {
            eyre::bail!("serial.read_timeout_ms is unreasonably large (>60s)");
        }

        // Storage
        if self.storage.dir.as_os_str().is_empty() {
            eyre::bail!("storage.dir must not be empty");
        }

        // Controller
        if self.controller.tick_ms == 0 {
            eyre::bail!("controller.tick_ms must be >= 1");
        }
        if self.controller.settle_ms > 60_000 {
            eyre::bail!("controller.settle_ms is unreasonably large (>60s)");
        }
        if self.controller.history_len == 0 || self.controller.history_len > MAX_HISTORY_LEN {
            eyre::bail!("controller.history_len must be in 1..={MAX_HISTORY_LEN}");
        }
        if self.controller.read_failure_limit == 0 {
            eyre::bail!("controller.read_failure_limit must be >= 1");
        }

        // Server
        if self.server.bind.trim().is_empty() {
            eyre::bail!("server.bind must not be empty");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
