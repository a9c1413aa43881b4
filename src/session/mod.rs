//! Boundary to the internal system of record.
//!
//! The fetch loop only sees [`ContractSystem`]; the browser-driven client and
//! the fixture-driven replay both implement it.

pub mod replay;
pub mod webdriver;

use std::fmt;

use chrono::NaiveDate;
use secrecy::SecretString;

use crate::error::{SessionAuthError, SessionError};
use crate::fetch::Phase;
use crate::source::ContractId;

pub const USER_ENV: &str = "DEADLINEQC_USER";
pub const PASSWORD_ENV: &str = "DEADLINEQC_PASSWORD";

/// Result page of one search in the live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    NotFound,
    Found { id: ContractId, row_text: String },
}

pub trait ContractSystem: fmt::Debug {
    fn search(&mut self, id: &ContractId) -> Result<PageState, SessionError>;

    /// Raw phase label of the current result, if one can be picked out.
    fn read_phase(&mut self, page: &PageState) -> Result<Option<String>, SessionError>;

    /// Date of the event that starts the deadline clock, if reached.
    fn read_deadline_start(&mut self, page: &PageState)
    -> Result<Option<NaiveDate>, SessionError>;

    fn close(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}

pub trait Connector: fmt::Debug {
    fn login(
        &self,
        credentials: Option<&Credentials>,
    ) -> Result<Box<dyn ContractSystem>, SessionAuthError>;
}

pub struct Credentials {
    pub user: String,
    pub password: SecretString,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, SessionAuthError> {
        let user = std::env::var(USER_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(SessionAuthError::MissingCredentials(USER_ENV))?;
        let password = std::env::var(PASSWORD_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or(SessionAuthError::MissingCredentials(PASSWORD_ENV))?;
        Ok(Self {
            user,
            password: SecretString::from(password),
        })
    }
}

const GENERIC_STATUS_WORDS: [&str; 7] = [
    "em andamento",
    "cancelado",
    "aprovado",
    "reprovado",
    "pendente",
    "aguardando",
    "em análise",
];

/// Picks the phase label out of a multi-line result cell: the first line that
/// names a known phase, otherwise the first line that is not a generic status
/// word and is longer than three characters.
pub fn pick_phase_label(cell_text: &str) -> Option<String> {
    let lines: Vec<&str> = cell_text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if let Some(known) = lines.iter().find(|l| Phase::from_label(l).is_some()) {
        return Some((*known).to_string());
    }

    lines
        .iter()
        .find(|l| {
            let lower = l.to_lowercase();
            !GENERIC_STATUS_WORDS.contains(&lower.as_str()) && l.chars().count() > 3
        })
        .map(|l| (*l).to_string())
}

/// Parses the leading `dd/mm/yyyy` token of a history timestamp cell.
pub fn parse_history_date(cell_text: &str) -> Result<Option<NaiveDate>, SessionError> {
    let Some(token) = cell_text.split_whitespace().next() else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(token, "%d/%m/%Y")
        .map(Some)
        .map_err(|_| SessionError::InvalidDate {
            value: token.to_string(),
        })
}
