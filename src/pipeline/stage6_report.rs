use anyhow::Result;
use tracing::info;

use crate::ctx::Ctx;
use crate::pipeline::Stage;
use crate::report::aggregate;

pub struct Stage6Report;

impl Stage6Report {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage6Report {
    fn name(&self) -> &'static str {
        "stage6_report"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let model = aggregate(
            &ctx.records,
            ctx.config.day_threshold,
            ctx.config.fresh_days,
        );
        info!(
            detail = model.detail.len(),
            phases = model.summary.rows.len(),
            pendency = model.pendency.len(),
            "report_ready"
        );
        ctx.report_model = Some(model);
        Ok(())
    }
}
