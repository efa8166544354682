//! Append-only record of every locator substitution
//!
//! Events are stored one JSON object per line in `healing-log.jsonl` inside
//! the configured directory. There is no read-modify-write: every append is a
//! single `O_APPEND` write of one complete line, and appends to the same file
//! from within one process are serialized through a per-path async mutex, so
//! concurrent test workers never overwrite each other's records.
//!
//! A record left half-written by a crashed writer never takes later records
//! down with it: the next append starts on a fresh line, and readers skip the
//! torn line with a warning.

use crate::error::{HealError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, PoisonError};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

/// File name of the ledger inside its directory
pub const LEDGER_FILE: &str = "healing-log.jsonl";

/// Write locks shared by every ledger handle in the process, keyed by file
static WRITE_LOCKS: LazyLock<std::sync::Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    LazyLock::new(Default::default);

fn write_lock_for(path: &Path) -> Arc<Mutex<()>> {
    let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    WRITE_LOCKS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key)
        .or_default()
        .clone()
}

/// Whether the file is empty or its last byte is a newline
async fn ends_with_newline(file: &mut fs::File) -> std::io::Result<bool> {
    if file.metadata().await?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1)).await?;
    Ok(file.read_u8().await? == b'\n')
}

/// One substitution of a failing locator by a working one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealingEvent {
    pub timestamp: DateTime<Utc>,
    pub original_selector: String,
    pub new_selector: String,
    pub reason: String,

    /// Name of the strategy or refinement that produced the substitution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

impl HealingEvent {
    /// Event stamped with the current time
    pub fn new(original_selector: impl Into<String>, new_selector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            original_selector: original_selector.into(),
            new_selector: new_selector.into(),
            reason: reason.into(),
            strategy: None,
        }
    }

    /// Builder method: record the producing strategy
    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }
}

/// Read-side summary of the ledger
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealingStats {
    pub total_healings: usize,
    /// The most recent events, oldest first
    pub recent_healings: Vec<HealingEvent>,
    /// Rough heuristic, not a success ratio; see [`success_rate_estimate`]
    pub success_rate_estimate: f64,
}

/// `total / (total + 1) * 100`.
///
/// Failed healing attempts are never recorded, so the ledger cannot compute a
/// real success ratio. This figure only grows towards 100 as successful
/// healings accumulate and must not be read as a pass rate.
pub fn success_rate_estimate(total_healings: usize) -> f64 {
    let total = total_healings as f64;
    total / (total + 1.0) * 100.0
}

/// Handle to the ledger stored in one directory. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HealingLedger {
    dir: PathBuf,
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl HealingLedger {
    /// Ledger stored in `dir`; nothing is created until the first append
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let path = dir.join(LEDGER_FILE);
        let write_lock = write_lock_for(&path);
        Self { dir, path, write_lock }
    }

    /// Directory holding the ledger
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the ledger file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durably append one event
    pub async fn append(&self, event: &HealingEvent) -> Result<()> {
        let mut line = serde_json::to_vec(event).map_err(|e| HealError::ledger_io(&self.path, e.into()))?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| HealError::ledger_io(&self.dir, e))?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| HealError::ledger_io(&self.path, e))?;

        if !ends_with_newline(&mut file).await.map_err(|e| HealError::ledger_io(&self.path, e))? {
            log::warn!("Ledger {} ends in a torn record; starting a new line", self.path.display());
            line.insert(0, b'\n');
        }

        file.write_all(&line).await.map_err(|e| HealError::ledger_io(&self.path, e))?;
        file.flush().await.map_err(|e| HealError::ledger_io(&self.path, e))?;
        file.sync_data().await.map_err(|e| HealError::ledger_io(&self.path, e))?;

        log::debug!("Appended healing event to {}", self.path.display());
        Ok(())
    }

    /// Every readable event in append order; an absent ledger is empty.
    /// Torn or interleaved records are skipped and logged.
    pub async fn read_all(&self) -> Result<Vec<HealingEvent>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HealError::ledger_io(&self.path, e)),
        };

        let mut events = Vec::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(event) => events.push(event),
                Err(_) => {
                    let conflict = HealError::LedgerWriteConflict { path: self.path.clone(), line: i + 1 };
                    log::warn!("Skipping ledger record: {}", conflict);
                }
            }
        }
        Ok(events)
    }

    /// Totals plus the last `recent_window` events
    pub async fn stats(&self, recent_window: usize) -> Result<HealingStats> {
        let events = self.read_all().await?;
        let total_healings = events.len();
        let recent_healings = events[total_healings.saturating_sub(recent_window)..].to_vec();
        Ok(HealingStats {
            total_healings,
            recent_healings,
            success_rate_estimate: success_rate_estimate(total_healings),
        })
    }
}
