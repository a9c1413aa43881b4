use anyhow::Result;
use std::time::Instant;
use tracing::{info, warn};

use crate::ctx::Ctx;

pub mod stage0_scaffold;
pub mod stage1_source;
pub mod stage2_resume;
pub mod stage3_session;
pub mod stage4_fetch;
pub mod stage5_classify;
pub mod stage6_report;
pub mod stage7_output;

use stage0_scaffold::Stage0Scaffold;
use stage1_source::Stage1Source;
use stage2_resume::Stage2Resume;
use stage3_session::Stage3Session;
use stage4_fetch::Stage4Fetch;
use stage5_classify::Stage5Classify;
use stage6_report::Stage6Report;
use stage7_output::Stage7Output;

pub trait Stage {
    fn name(&self) -> &'static str;
    fn run(&self, ctx: &mut Ctx) -> Result<()>;
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Source file to written report, logging in and fetching every contract.
    pub fn full_run() -> Self {
        Self::new(vec![
            Box::new(Stage0Scaffold::new()),
            Box::new(Stage1Source::new()),
            Box::new(Stage2Resume::new()),
            Box::new(Stage3Session::new()),
            Box::new(Stage4Fetch::new()),
            Box::new(Stage5Classify::new()),
            Box::new(Stage6Report::new()),
            Box::new(Stage7Output::new()),
        ])
    }

    /// Report from a run state already placed in the context; no session.
    pub fn recover() -> Self {
        Self::new(vec![
            Box::new(Stage0Scaffold::new()),
            Box::new(Stage5Classify::new()),
            Box::new(Stage6Report::new()),
            Box::new(Stage7Output::new()),
        ])
    }

    pub fn validate() -> Self {
        Self::new(vec![Box::new(Stage1Source::new())])
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, ctx: &mut Ctx) -> Result<()> {
        info!(
            reference_date = %ctx.reference_date,
            day_threshold = ctx.config.day_threshold,
            stages = self.stages.len(),
            "pipeline started"
        );
        let run_start = Instant::now();
        for stage in &self.stages {
            let start = Instant::now();
            info!(stage = stage.name(), "stage started");
            if let Err(err) = stage.run(ctx) {
                let elapsed_ms = start.elapsed().as_millis();
                let processed = ctx.run_state.as_ref().map_or(0, |s| s.cursor());
                warn!(
                    stage = stage.name(),
                    elapsed_ms = elapsed_ms as u64,
                    processed = processed,
                    error = %format!("{err:#}"),
                    "stage failed"
                );
                return Err(err);
            }
            let elapsed_ms = start.elapsed().as_millis();
            info!(
                stage = stage.name(),
                elapsed_ms = elapsed_ms as u64,
                "stage finished"
            );
        }
        info!(
            elapsed_ms = run_start.elapsed().as_millis() as u64,
            complete = ctx.is_complete(),
            warnings = ctx.warnings.len(),
            "pipeline finished"
        );
        Ok(())
    }
}
