use anyhow::{Context, Result};
use tracing::info;

use crate::classify::classify_all;
use crate::ctx::Ctx;
use crate::pipeline::Stage;

pub struct Stage5Classify;

impl Stage5Classify {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage5Classify {
    fn name(&self) -> &'static str {
        "stage5_classify"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let state = ctx.run_state.as_ref().context("run state missing")?;
        let rules = ctx.config.rules();
        ctx.records = classify_all(&rules, &state.snapshots);
        info!(records = ctx.records.len(), "records_classified");
        Ok(())
    }
}
