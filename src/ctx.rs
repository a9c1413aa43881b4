use std::path::PathBuf;

use chrono::NaiveDate;

use crate::checkpoint::{RunCheckpointer, RunState};
use crate::classify::ClassifiedRecord;
use crate::config::DeadlineConfig;
use crate::report::ReportModel;
use crate::schema::v1::DeadlineQcV1;
use crate::session::{Connector, ContractSystem, Credentials};
use crate::source::SourceExtract;

#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub out_dir: PathBuf,
    pub json_path: PathBuf,
    pub detail_tsv_path: PathBuf,
    pub summary_tsv_path: PathBuf,
    pub pendency_tsv_path: PathBuf,
    pub checkpoint_dir: PathBuf,
}

impl OutputPaths {
    /// Partial reports get their own file names so a later full run never
    /// collides with a recovered one.
    pub fn new(out_dir: PathBuf, partial: bool) -> Self {
        let suffix = if partial { "_partial" } else { "" };
        Self {
            json_path: out_dir.join(format!("deadlineqc{suffix}.json")),
            detail_tsv_path: out_dir.join(format!("detail{suffix}.tsv")),
            summary_tsv_path: out_dir.join(format!("summary{suffix}.tsv")),
            pendency_tsv_path: out_dir.join(format!("pendency{suffix}.tsv")),
            checkpoint_dir: out_dir.join("checkpoint"),
            out_dir,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunCounters {
    pub resumed_from: usize,
    pub not_found: usize,
    pub fetch_failures: usize,
    pub checkpoint_failures: usize,
}

#[derive(Debug)]
pub struct Ctx {
    pub input: Option<PathBuf>,
    pub config: DeadlineConfig,
    /// Captured once per run; every elapsed-day value is relative to it.
    pub reference_date: NaiveDate,
    pub write_json: bool,
    pub write_tsv: bool,
    pub resume: bool,
    /// Reporting from a checkpoint only; the checkpoint is left in place.
    pub recover: bool,
    pub connector: Option<Box<dyn Connector>>,
    pub credentials: Option<Credentials>,
    pub system: Option<Box<dyn ContractSystem>>,
    pub source: Option<SourceExtract>,
    pub run_state: Option<RunState>,
    pub counters: RunCounters,
    pub records: Vec<ClassifiedRecord>,
    pub report_model: Option<ReportModel>,
    pub warnings: Vec<String>,
    pub output: OutputPaths,
    pub report: DeadlineQcV1,
}

impl Ctx {
    pub fn new(
        input: Option<PathBuf>,
        out_dir: PathBuf,
        config: DeadlineConfig,
        reference_date: NaiveDate,
        write_json: bool,
        write_tsv: bool,
        tool_version: &str,
    ) -> Self {
        let report = DeadlineQcV1::empty(tool_version, reference_date, config.day_threshold);
        Self {
            input,
            config,
            reference_date,
            write_json,
            write_tsv,
            resume: false,
            recover: false,
            connector: None,
            credentials: None,
            system: None,
            source: None,
            run_state: None,
            counters: RunCounters::default(),
            records: Vec::new(),
            report_model: None,
            warnings: Vec::new(),
            output: OutputPaths::new(out_dir, false),
            report,
        }
    }

    pub fn checkpointer(&self) -> RunCheckpointer {
        RunCheckpointer::in_dir(&self.output.checkpoint_dir, self.config.checkpoint_interval)
    }

    pub fn is_complete(&self) -> bool {
        self.run_state.as_ref().is_some_and(RunState::is_complete)
    }
}
