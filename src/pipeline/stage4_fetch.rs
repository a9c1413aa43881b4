use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::checkpoint::{RunCheckpointer, RunState};
use crate::ctx::Ctx;
use crate::fetch::{ContractSnapshot, ContractStateFetcher, LookupOutcome};
use crate::pipeline::Stage;

pub struct Stage4Fetch;

impl Stage4Fetch {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage4Fetch {
    fn name(&self) -> &'static str {
        "stage4_fetch"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let mut state = ctx.run_state.take().context("run state missing")?;
        if state.is_complete() {
            ctx.run_state = Some(state);
            return Ok(());
        }
        let mut system = ctx.system.take().context("session not established")?;

        let fetcher = ContractStateFetcher::new(ctx.reference_date, ctx.config.retry);
        let checkpointer = ctx.checkpointer();
        let pause = Duration::from_millis(ctx.config.pause_between_ms);
        let total = state.ids.len();
        let mut written_at = state.cursor();

        while let Some(id) = state.remaining().first().cloned() {
            let seq = state.cursor() + 1;
            info!(seq = seq, total = total, id = %id, "fetching contract");

            let snapshot = match fetcher.fetch(system.as_mut(), &id) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    warn!(id = %id, error = %err, "lookup failed; recording as unidentified");
                    ctx.counters.fetch_failures += 1;
                    ContractSnapshot::failed(&err)
                }
            };
            if snapshot.outcome == LookupOutcome::NotFound {
                ctx.counters.not_found += 1;
            }
            info!(
                seq = seq,
                id = %id,
                phase = %snapshot.phase,
                elapsed_days = ?snapshot.elapsed_days,
                "contract fetched"
            );
            state.record(snapshot);

            if checkpointer.should_checkpoint(state.cursor())
                && write_checkpoint(ctx, &checkpointer, &state)
            {
                written_at = state.cursor();
            }

            if !state.is_complete() && !pause.is_zero() {
                thread::sleep(pause);
            }
        }

        // Covers the tail between the last interval and the end of the loop.
        if written_at != state.cursor() {
            write_checkpoint(ctx, &checkpointer, &state);
        }

        if let Err(err) = system.close() {
            warn!(error = %err, "failed to close session cleanly");
        }

        ctx.run_state = Some(state);
        Ok(())
    }
}

fn write_checkpoint(
    ctx: &mut Ctx,
    checkpointer: &RunCheckpointer,
    state: &RunState,
) -> bool {
    match checkpointer.write(state) {
        Ok(()) => {
            info!(
                processed = state.cursor(),
                total = state.ids.len(),
                "checkpoint saved"
            );
            true
        }
        Err(err) => {
            warn!(error = %err, "checkpoint write failed; continuing without it");
            ctx.counters.checkpoint_failures += 1;
            ctx.warnings.push(format!(
                "checkpoint after {} contracts not saved: {}",
                state.cursor(),
                err
            ));
            false
        }
    }
}
