use anyhow::{Context, Result};
use std::fs;
use tracing::{info, warn};

use crate::ctx::Ctx;
use crate::pipeline::Stage;

pub struct Stage0Scaffold;

impl Stage0Scaffold {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage0Scaffold {
    fn name(&self) -> &'static str {
        "stage0_scaffold"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        fs::create_dir_all(&ctx.output.out_dir)
            .with_context(|| format!("failed to create {}", ctx.output.out_dir.display()))?;
        // Without a checkpoint directory the run still completes, unprotected.
        if let Err(err) = fs::create_dir_all(&ctx.output.checkpoint_dir) {
            warn!(
                checkpoint_dir = %ctx.output.checkpoint_dir.display(),
                error = %err,
                "checkpoint directory unavailable"
            );
            ctx.warnings.push(format!(
                "checkpoint directory {} unavailable: {}",
                ctx.output.checkpoint_dir.display(),
                err
            ));
        }
        info!(
            out_dir = %ctx.output.out_dir.display(),
            checkpoint_dir = %ctx.output.checkpoint_dir.display(),
            "output_dir_ready"
        );

        ctx.report.reference_date = ctx.reference_date;
        ctx.report.day_threshold = ctx.config.day_threshold;

        Ok(())
    }
}
