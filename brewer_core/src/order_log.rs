//! Per-order append-only status log.
//!
//! One newline-delimited JSON file per order activation, named
//! `<name>_<epoch-secs>.json` under the storage directory. Every append opens
//! the file, writes a single record, flushes and syncs it, then closes the
//! handle again, so no descriptor outlives a write.
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::BrewError;
use crate::status::DeviceStatus;
use crate::util::sanitize_file_stem;

/// File used before the first order is submitted.
pub const DEFAULT_LOG_NAME: &str = "default.json";

#[derive(Debug)]
pub struct OrderLog {
    dir: PathBuf,
    current: Option<PathBuf>,
}

impl OrderLog {
    /// Log rooted at `dir`. The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let current = Some(dir.join(DEFAULT_LOG_NAME));
        Self { dir, current }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// Switch to a fresh file for order `name` activated at `epoch_secs`.
    /// Returns the new path.
    pub fn rotate(&mut self, name: &str, epoch_secs: u64) -> crate::Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            BrewError::Storage(format!("create {}: {e}", self.dir.display()))
        })?;
        let stem = format!("{}_{}", sanitize_file_stem(name), epoch_secs);
        let mut path = self.dir.join(format!("{stem}.json"));
        let mut n = 1u32;
        while path.exists() {
            path = self.dir.join(format!("{stem}-{n}.json"));
            n += 1;
        }
        tracing::info!(path = %path.display(), "order log rotated");
        self.current = Some(path.clone());
        Ok(path)
    }

    /// Detach from the current file. Later appends are dropped.
    pub fn close(&mut self) {
        if let Some(path) = self.current.take() {
            tracing::debug!(path = %path.display(), "order log closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Append one status record. Returns `Ok(false)` when the log is closed.
    pub fn append(&self, status: &DeviceStatus) -> crate::Result<bool> {
        let Some(path) = self.current.as_deref() else {
            tracing::debug!("order log closed; dropping status record");
            return Ok(false);
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| BrewError::Storage(format!("create {}: {e}", parent.display())))?;
        }
        let mut line = serde_json::to_string(status)
            .map_err(|e| BrewError::Storage(format!("encode status: {e}")))?;
        line.push('\n');
        let storage = |e: std::io::Error| BrewError::Storage(format!("{}: {e}", path.display()));
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(storage)?;
        file.write_all(line.as_bytes()).map_err(storage)?;
        file.flush().map_err(storage)?;
        file.sync_data().map_err(storage)?;
        Ok(true)
    }
}

/// Decode every record of an order log file, oldest first.
pub fn read_entries(path: &Path) -> crate::Result<Vec<DeviceStatus>> {
    let file = fs::File::open(path)
        .map_err(|e| BrewError::Storage(format!("open {}: {e}", path.display())))?;
    let mut out = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| BrewError::Storage(format!("read {}: {e}", path.display())))?;
        if line.trim().is_empty() {
            continue;
        }
        let status: DeviceStatus = serde_json::from_str(&line).map_err(|e| {
            BrewError::Storage(format!("{} line {}: {e}", path.display(), idx + 1))
        })?;
        out.push(status);
    }
    Ok(out)
}
