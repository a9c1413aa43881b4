use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::checkpoint::RunState;
use crate::ctx::Ctx;
use crate::fetch::LookupOutcome;
use crate::pipeline::Stage;

pub struct Stage2Resume;

impl Stage2Resume {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage2Resume {
    fn name(&self) -> &'static str {
        "stage2_resume"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let ids = ctx
            .source
            .as_ref()
            .context("source identifiers missing")?
            .ids
            .clone();
        let checkpointer = ctx.checkpointer();

        if !ctx.resume {
            if checkpointer.path().exists() {
                warn!(
                    path = %checkpointer.path().display(),
                    "existing checkpoint will be replaced (use --resume to continue it)"
                );
            }
            ctx.run_state = Some(RunState::new(ctx.reference_date, ids));
            return Ok(());
        }

        let Some(state) = checkpointer.load()? else {
            info!(path = %checkpointer.path().display(), "no checkpoint found; starting fresh");
            ctx.run_state = Some(RunState::new(ctx.reference_date, ids));
            return Ok(());
        };

        if state.ids != ids {
            warn!(
                checkpoint_ids = state.ids.len(),
                source_ids = ids.len(),
                "checkpoint belongs to a different source file; starting fresh"
            );
            ctx.warnings.push(format!(
                "checkpoint at {} ignored: identifier list differs from the source file",
                checkpointer.path().display()
            ));
            ctx.run_state = Some(RunState::new(ctx.reference_date, ids));
            return Ok(());
        }

        // Elapsed days must stay relative to the checkpoint reference date.
        if state.reference_date != ctx.reference_date {
            info!(
                checkpoint_reference = %state.reference_date,
                requested_reference = %ctx.reference_date,
                "using checkpoint reference date"
            );
            ctx.reference_date = state.reference_date;
            ctx.report.reference_date = state.reference_date;
        }

        ctx.counters.resumed_from = state.cursor();
        ctx.counters.not_found = state.outcome_count(LookupOutcome::NotFound);
        ctx.counters.fetch_failures = state.outcome_count(LookupOutcome::Failed);
        info!(
            processed = state.cursor(),
            total = state.ids.len(),
            "resuming from checkpoint"
        );
        ctx.run_state = Some(state);
        Ok(())
    }
}
