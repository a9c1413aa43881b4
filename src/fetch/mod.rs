mod phase;

use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FetchError, SessionError};
use crate::session::{ContractSystem, PageState};
use crate::source::ContractId;

pub use phase::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupOutcome {
    Found,
    NotFound,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSnapshot {
    pub id: ContractId,
    pub phase: Phase,
    pub raw_phase: Option<String>,
    pub deadline_start: Option<NaiveDate>,
    pub elapsed_days: Option<i64>,
    pub outcome: LookupOutcome,
    pub error: Option<String>,
}

impl ContractSnapshot {
    /// Snapshot standing in for a lookup that exhausted its retries.
    pub fn failed(err: &FetchError) -> Self {
        Self {
            id: err.id.clone(),
            phase: Phase::Unidentified,
            raw_phase: None,
            deadline_start: None,
            elapsed_days: None,
            outcome: LookupOutcome::Failed,
            error: Some(err.to_string()),
        }
    }

    fn not_found(id: &ContractId) -> Self {
        Self {
            id: id.clone(),
            phase: Phase::Unidentified,
            raw_phase: None,
            deadline_start: None,
            elapsed_days: None,
            outcome: LookupOutcome::NotFound,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_backoff_ms: 2_000,
        }
    }
}

/// Calendar days from `start` to `reference`, never negative.
pub fn elapsed_days(start: NaiveDate, reference: NaiveDate) -> i64 {
    (reference - start).num_days().max(0)
}

#[derive(Debug, Clone)]
pub struct ContractStateFetcher {
    reference_date: NaiveDate,
    retry: RetryPolicy,
}

impl ContractStateFetcher {
    pub fn new(reference_date: NaiveDate, retry: RetryPolicy) -> Self {
        Self {
            reference_date,
            retry,
        }
    }

    pub fn fetch(
        &self,
        system: &mut dyn ContractSystem,
        id: &ContractId,
    ) -> Result<ContractSnapshot, FetchError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            match self.lookup(system, id) {
                Ok(snapshot) => return Ok(snapshot),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let backoff = self.retry.base_backoff_ms.saturating_mul(attempt as u64);
                    warn!(
                        id = %id,
                        attempt = attempt,
                        backoff_ms = backoff,
                        error = %err,
                        "lookup failed; retrying"
                    );
                    thread::sleep(Duration::from_millis(backoff));
                }
                Err(err) => {
                    return Err(FetchError {
                        id: id.clone(),
                        attempts: attempt,
                        source: err,
                    });
                }
            }
        }
    }

    fn lookup(
        &self,
        system: &mut dyn ContractSystem,
        id: &ContractId,
    ) -> Result<ContractSnapshot, SessionError> {
        let page = system.search(id)?;
        if page == PageState::NotFound {
            debug!(id = %id, "contract not found");
            return Ok(ContractSnapshot::not_found(id));
        }

        let raw_phase = system.read_phase(&page)?;
        let phase = raw_phase
            .as_deref()
            .and_then(Phase::from_label)
            .unwrap_or(Phase::Unidentified);
        let deadline_start = match system.read_deadline_start(&page) {
            Ok(date) => date,
            Err(SessionError::InvalidDate { value }) => {
                warn!(id = %id, value = %value, "unparsable deadline start; keeping phase without a date");
                None
            }
            Err(err) => return Err(err),
        };

        let elapsed = deadline_start.map(|start| {
            if start > self.reference_date {
                warn!(id = %id, start = %start, "deadline start is after the reference date");
            }
            elapsed_days(start, self.reference_date)
        });

        Ok(ContractSnapshot {
            id: id.clone(),
            phase,
            raw_phase,
            deadline_start,
            elapsed_days: elapsed,
            outcome: LookupOutcome::Found,
            error: None,
        })
    }
}
