use anyhow::Result;
use tracing::{info, warn};

use crate::ctx::Ctx;
use crate::io::{json_writer, tsv_writer};
use crate::pipeline::Stage;

pub struct Stage7Output;

impl Stage7Output {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for Stage7Output {
    fn name(&self) -> &'static str {
        "stage7_output"
    }

    fn run(&self, ctx: &mut Ctx) -> Result<()> {
        let report = json_writer::build_report(ctx)?;
        ctx.report = report;

        // Neither flag means both formats.
        let (json, tsv) = if !ctx.write_json && !ctx.write_tsv {
            (true, true)
        } else {
            (ctx.write_json, ctx.write_tsv)
        };

        if json {
            json_writer::write_json(&ctx.output.json_path, &ctx.report)?;
        }
        if tsv {
            tsv_writer::write_detail_tsv(&ctx.output.detail_tsv_path, &ctx.report.detail)?;
            tsv_writer::write_summary_tsv(&ctx.output.summary_tsv_path, &ctx.report.summary)?;
            tsv_writer::write_pendency_tsv(&ctx.output.pendency_tsv_path, &ctx.report.pendency)?;
        }

        if ctx.report.complete && !ctx.recover {
            if let Err(err) = ctx.checkpointer().clear() {
                warn!(error = %err, "could not remove checkpoint after a complete run");
            }
        }

        info!(
            out_dir = %ctx.output.out_dir.display(),
            complete = ctx.report.complete,
            "stage7_output_ready"
        );
        Ok(())
    }
}
