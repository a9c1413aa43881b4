mod loader;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classify::ClassificationRules;
use crate::error::ConfigError;
use crate::fetch::{Phase, RetryPolicy};
use crate::session::webdriver::SessionSettings;
use crate::source::SourceOptions;

pub use loader::{load, load_builtin, merge_values};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSettings {
    pub delimiter: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            delimiter: ";".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadlineConfig {
    pub day_threshold: i64,
    pub fresh_days: i64,
    pub phase_area_map: BTreeMap<Phase, String>,
    pub terminal_phases: Vec<Phase>,
    pub data_quality_area: String,
    pub default_area: String,
    pub checkpoint_interval: usize,
    pub pause_between_ms: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub source: SourceSettings,
    #[serde(default)]
    pub session: SessionSettings,
}

impl DeadlineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.day_threshold < 0 {
            return Err(ConfigError::Invalid(format!(
                "day_threshold must be >= 0 (got {})",
                self.day_threshold
            )));
        }
        if self.fresh_days < 0 {
            return Err(ConfigError::Invalid(format!(
                "fresh_days must be >= 0 (got {})",
                self.fresh_days
            )));
        }
        if self.checkpoint_interval == 0 {
            return Err(ConfigError::Invalid(
                "checkpoint_interval must be >= 1".to_string(),
            ));
        }
        if !(1..=2).contains(&self.retry.max_attempts) {
            return Err(ConfigError::Invalid(format!(
                "retry.max_attempts must be 1 or 2 (got {})",
                self.retry.max_attempts
            )));
        }
        if self.source.delimiter.chars().count() != 1 {
            return Err(ConfigError::Invalid(format!(
                "source.delimiter must be a single character (got '{}')",
                self.source.delimiter
            )));
        }
        if self.terminal_phases.contains(&Phase::Unidentified) {
            return Err(ConfigError::Invalid(
                "terminal_phases cannot contain 'unidentified'".to_string(),
            ));
        }
        if let Some((phase, _)) = self
            .phase_area_map
            .iter()
            .find(|(_, area)| area.trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "phase_area_map entry for '{}' is empty",
                phase
            )));
        }
        if self.data_quality_area.trim().is_empty() || self.default_area.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "data_quality_area and default_area must be non-empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn rules(&self) -> ClassificationRules {
        ClassificationRules {
            day_threshold: self.day_threshold,
            phase_area_map: self.phase_area_map.clone(),
            terminal_phases: self.terminal_phases.clone(),
            data_quality_area: self.data_quality_area.clone(),
            default_area: self.default_area.clone(),
        }
    }

    pub fn source_options(&self) -> SourceOptions {
        SourceOptions {
            delimiter: self.source.delimiter.chars().next().unwrap_or(';'),
        }
    }
}
