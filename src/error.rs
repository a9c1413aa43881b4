use std::path::PathBuf;

use thiserror::Error;

use crate::source::ContractId;

/// Archive could not be decompressed by either read strategy.
#[derive(Debug, Error)]
pub enum SourceFormatError {
    #[error("source file not found: {path}")]
    Missing { path: PathBuf },

    #[error("failed to decompress {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

/// A single dropped row. Never fatal; counted and logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowParseWarning {
    pub line: usize,
    pub token: String,
}

/// Failure reported by a live system for one operation.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("timed out after {timeout_ms} ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("driver transport error: {0}")]
    Transport(String),

    #[error("driver returned {status}: {message}")]
    Driver { status: u16, message: String },

    #[error("invalid date '{value}' in deadline history")]
    InvalidDate { value: String },
}

impl SessionError {
    /// Timing and transport failures may clear on a second attempt; bad data
    /// in the page will not.
    pub fn is_transient(&self) -> bool {
        !matches!(self, SessionError::InvalidDate { .. })
    }
}

#[derive(Debug, Error)]
#[error("lookup of {id} failed after {attempts} attempt(s): {source}")]
pub struct FetchError {
    pub id: ContractId,
    pub attempts: usize,
    #[source]
    pub source: SessionError,
}

#[derive(Debug, Error)]
pub enum SessionAuthError {
    #[error("missing credentials: set {0}")]
    MissingCredentials(&'static str),

    #[error("login rejected or post-login page not reached: {0}")]
    Rejected(String),

    #[error("could not open driver session: {0}")]
    Driver(String),

    #[error("replay fixture {path}: {reason}")]
    Replay { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum CheckpointWriteError {
    #[error("checkpoint io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checkpoint serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{source_name}: invalid config JSON: {reason}")]
    Parse { source_name: String, reason: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}
