use std::path::Path;

use anyhow::{Context, Result};

use crate::ctx::Ctx;
use crate::io::write_json_pretty;
use crate::schema::v1::{DeadlineQcV1, InputMeta, SCHEMA_VERSION, TOOL_NAME};

pub fn build_report(ctx: &Ctx) -> Result<DeadlineQcV1> {
    let model = ctx.report_model.as_ref().context("report model missing")?;
    let state = ctx.run_state.as_ref().context("run state missing")?;

    let source = ctx.source.as_ref();
    let input_meta = InputMeta {
        source: ctx.input.as_ref().map(|p| p.display().to_string()),
        rows: source.map(|s| s.rows as u64),
        ids: Some(state.ids.len() as u64),
        malformed: source.map(|s| s.malformed as u64),
        duplicates: source.map(|s| s.duplicates as u64),
        strategy: source.map(|s| s.strategy),
        processed: state.cursor() as u64,
        resumed_from: ctx.counters.resumed_from as u64,
        not_found: ctx.counters.not_found as u64,
        fetch_failures: ctx.counters.fetch_failures as u64,
        checkpoint_failures: ctx.counters.checkpoint_failures as u64,
    };

    Ok(DeadlineQcV1 {
        tool: TOOL_NAME.to_string(),
        version: ctx.report.version.clone(),
        schema_version: SCHEMA_VERSION.to_string(),
        reference_date: ctx.reference_date,
        day_threshold: ctx.config.day_threshold,
        complete: state.is_complete(),
        input_meta,
        detail: model.detail.clone(),
        summary: model.summary.clone(),
        pendency: model.pendency.clone(),
        warnings: ctx.warnings.clone(),
    })
}

pub fn write_json(path: &Path, report: &DeadlineQcV1) -> Result<()> {
    write_json_pretty(path, report)
}
