use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::report::{DetailRow, PendencyRow, SummaryView};
use crate::source::ReadStrategy;

pub const TOOL_NAME: &str = "kira-deadlineqc";
pub const SCHEMA_VERSION: &str = "v1";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMeta {
    pub source: Option<String>,
    pub rows: Option<u64>,
    pub ids: Option<u64>,
    pub malformed: Option<u64>,
    pub duplicates: Option<u64>,
    pub strategy: Option<ReadStrategy>,
    pub processed: u64,
    pub resumed_from: u64,
    pub not_found: u64,
    pub fetch_failures: u64,
    pub checkpoint_failures: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineQcV1 {
    pub tool: String,
    pub version: String,
    pub schema_version: String,
    pub reference_date: NaiveDate,
    pub day_threshold: i64,
    /// False when built from a checkpoint that did not cover every identifier.
    pub complete: bool,
    pub input_meta: InputMeta,
    pub detail: Vec<DetailRow>,
    pub summary: SummaryView,
    pub pendency: Vec<PendencyRow>,
    pub warnings: Vec<String>,
}

impl DeadlineQcV1 {
    pub fn empty(tool_version: &str, reference_date: NaiveDate, day_threshold: i64) -> Self {
        Self {
            tool: TOOL_NAME.to_string(),
            version: tool_version.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            reference_date,
            day_threshold,
            complete: false,
            input_meta: InputMeta::default(),
            detail: Vec::new(),
            summary: SummaryView {
                rows: Vec::new(),
                total: 0,
                total_percent_tenths: 0,
            },
            pendency: Vec::new(),
            warnings: Vec::new(),
        }
    }
}
