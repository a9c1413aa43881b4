use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{SessionAuthError, SessionError};
use crate::session::{Connector, ContractSystem, Credentials, PageState};
use crate::source::ContractId;

/// Scripted answer for one identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayEntry {
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub deadline_start: Option<NaiveDate>,
    #[serde(default)]
    pub not_found: bool,
    /// Number of leading search attempts that fail with a timeout.
    #[serde(default)]
    pub fail: usize,
}

impl ReplayEntry {
    pub fn found(phase: &str, deadline_start: Option<NaiveDate>) -> Self {
        Self {
            phase: Some(phase.to_string()),
            deadline_start,
            ..Self::default()
        }
    }

    pub fn not_found() -> Self {
        Self {
            not_found: true,
            ..Self::default()
        }
    }

    pub fn failing(times: usize) -> Self {
        Self {
            fail: times,
            ..Self::default()
        }
    }

    pub fn then_found(mut self, phase: &str, deadline_start: Option<NaiveDate>) -> Self {
        self.phase = Some(phase.to_string());
        self.deadline_start = deadline_start;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayFixture {
    #[serde(default)]
    pub reject_login: bool,
    #[serde(default)]
    pub contracts: BTreeMap<String, ReplayEntry>,
}

impl ReplayFixture {
    pub fn load(path: &Path) -> Result<Self, SessionAuthError> {
        let content = std::fs::read_to_string(path).map_err(|e| SessionAuthError::Replay {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| SessionAuthError::Replay {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Deterministic stand-in for the system of record.
#[derive(Debug, Default)]
pub struct ReplaySystem {
    entries: HashMap<String, ReplayEntry>,
    attempts: HashMap<String, usize>,
    searches: usize,
}

impl ReplaySystem {
    pub fn new(entries: impl IntoIterator<Item = (String, ReplayEntry)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            attempts: HashMap::new(),
            searches: 0,
        }
    }

    pub fn from_fixture(fixture: ReplayFixture) -> Self {
        Self::new(fixture.contracts)
    }

    pub fn searches(&self) -> usize {
        self.searches
    }

    pub fn attempts_for(&self, id: &str) -> usize {
        self.attempts.get(id).copied().unwrap_or(0)
    }

    fn entry(&self, page: &PageState) -> Option<&ReplayEntry> {
        match page {
            PageState::NotFound => None,
            PageState::Found { id, .. } => self.entries.get(id.as_str()),
        }
    }
}

impl ContractSystem for ReplaySystem {
    fn search(&mut self, id: &ContractId) -> Result<PageState, SessionError> {
        self.searches += 1;
        let attempt = self.attempts.entry(id.as_str().to_string()).or_insert(0);
        *attempt += 1;
        let attempt = *attempt;

        let Some(entry) = self.entries.get(id.as_str()) else {
            return Ok(PageState::NotFound);
        };
        if attempt <= entry.fail {
            return Err(SessionError::Timeout {
                what: format!("result table for {id}"),
                timeout_ms: 0,
            });
        }
        if entry.not_found || entry.phase.is_none() {
            return Ok(PageState::NotFound);
        }
        Ok(PageState::Found {
            id: id.clone(),
            row_text: entry.phase.clone().unwrap_or_default(),
        })
    }

    fn read_phase(&mut self, page: &PageState) -> Result<Option<String>, SessionError> {
        match page {
            PageState::NotFound => Ok(None),
            PageState::Found { row_text, .. } => Ok(Some(row_text.clone())),
        }
    }

    fn read_deadline_start(
        &mut self,
        page: &PageState,
    ) -> Result<Option<NaiveDate>, SessionError> {
        Ok(self.entry(page).and_then(|e| e.deadline_start))
    }
}

#[derive(Debug, Clone)]
pub struct ReplayConnector {
    pub path: PathBuf,
}

impl ReplayConnector {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Connector for ReplayConnector {
    fn login(
        &self,
        _credentials: Option<&Credentials>,
    ) -> Result<Box<dyn ContractSystem>, SessionAuthError> {
        let fixture = ReplayFixture::load(&self.path)?;
        if fixture.reject_login {
            return Err(SessionAuthError::Rejected(
                "replay fixture rejects login".to_string(),
            ));
        }
        Ok(Box::new(ReplaySystem::from_fixture(fixture)))
    }
}
