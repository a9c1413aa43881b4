use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::CheckpointWriteError;
use crate::fetch::{ContractSnapshot, LookupOutcome};
use crate::source::ContractId;

pub const RUN_STATE_SCHEMA: &str = "deadlineqc.run_state.v1";
pub const CHECKPOINT_FILE: &str = "run_state.json";

/// Progress of one run: the ordered identifier list and the processed prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub schema: String,
    pub reference_date: NaiveDate,
    pub ids: Vec<ContractId>,
    pub snapshots: Vec<ContractSnapshot>,
}

impl RunState {
    pub fn new(reference_date: NaiveDate, ids: Vec<ContractId>) -> Self {
        Self {
            schema: RUN_STATE_SCHEMA.to_string(),
            reference_date,
            ids,
            snapshots: Vec::new(),
        }
    }

    /// Index of the next identifier to fetch.
    pub fn cursor(&self) -> usize {
        self.snapshots.len()
    }

    pub fn remaining(&self) -> &[ContractId] {
        &self.ids[self.cursor().min(self.ids.len())..]
    }

    pub fn is_complete(&self) -> bool {
        self.cursor() >= self.ids.len()
    }

    pub fn record(&mut self, snapshot: ContractSnapshot) {
        self.snapshots.push(snapshot);
    }

    pub fn outcome_count(&self, outcome: LookupOutcome) -> usize {
        self.snapshots
            .iter()
            .filter(|s| s.outcome == outcome)
            .count()
    }

    /// Snapshots must be the exact prefix of `ids`, in order.
    pub fn check_consistent(&self) -> Result<()> {
        if self.schema != RUN_STATE_SCHEMA {
            bail!(
                "unsupported run state schema '{}' (expected '{}')",
                self.schema,
                RUN_STATE_SCHEMA
            );
        }
        if self.snapshots.len() > self.ids.len() {
            bail!(
                "run state has {} snapshots for {} identifiers",
                self.snapshots.len(),
                self.ids.len()
            );
        }
        for (i, (snap, id)) in self.snapshots.iter().zip(&self.ids).enumerate() {
            if &snap.id != id {
                bail!(
                    "run state snapshot {} is for {} but identifier {} was expected",
                    i + 1,
                    snap.id,
                    id
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RunCheckpointer {
    path: PathBuf,
    interval: usize,
}

impl RunCheckpointer {
    pub fn new(path: PathBuf, interval: usize) -> Self {
        Self {
            path,
            interval: interval.max(1),
        }
    }

    pub fn in_dir(dir: &Path, interval: usize) -> Self {
        Self::new(dir.join(CHECKPOINT_FILE), interval)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn should_checkpoint(&self, processed: usize) -> bool {
        processed > 0 && processed % self.interval == 0
    }

    /// Temp file in the target directory, fsync, then rename over the
    /// previous checkpoint. Readers see either the old or the new state.
    pub fn write(&self, state: &RunState) -> Result<(), CheckpointWriteError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(|source| CheckpointWriteError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let json = serde_json::to_vec_pretty(state)?;
        let io_err = |source: std::io::Error| CheckpointWriteError::Io {
            path: self.path.clone(),
            source,
        };

        let temp = NamedTempFile::new_in(dir).map_err(io_err)?;
        {
            let mut file = temp.as_file();
            file.write_all(&json).map_err(io_err)?;
            file.sync_all().map_err(io_err)?;
        }
        temp.persist(&self.path).map_err(|e| io_err(e.error))?;

        debug!(
            path = %self.path.display(),
            processed = state.cursor(),
            total = state.ids.len(),
            "checkpoint_written"
        );
        Ok(())
    }

    pub fn load(&self) -> Result<Option<RunState>> {
        load_run_state(&self.path)
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "checkpoint_cleared");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to remove {}", self.path.display()))
            }
        }
    }
}

pub fn load_run_state(path: &Path) -> Result<Option<RunState>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let state: RunState = serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse checkpoint {}", path.display()))?;
    state.check_consistent()?;
    Ok(Some(state))
}
