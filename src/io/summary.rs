use anyhow::{Context, Result};

use crate::ctx::Ctx;
use crate::io::tsv_writer::format_tenths;

pub fn format_summary(ctx: &Ctx) -> Result<String> {
    let version = env!("CARGO_PKG_VERSION");
    let model = ctx.report_model.as_ref().context("report model missing")?;
    let (on_track, attention, overdue) = model.risk_counts();

    let mut out = String::new();
    out.push_str(&format!("kira-deadlineqc v{}\n", version));
    out.push_str(&format!(
        "Reference date: {} (threshold {} days)\n",
        ctx.reference_date, ctx.config.day_threshold
    ));
    if let Some(source) = &ctx.source {
        out.push_str(&format!(
            "Input: {} rows, {} contracts, {} malformed, {} duplicates\n",
            source.rows,
            source.ids.len(),
            source.malformed,
            source.duplicates
        ));
    }
    out.push_str(&format!(
        "Processed: {} (not found {}, failed {})\n",
        model.detail.len(),
        ctx.counters.not_found,
        ctx.counters.fetch_failures
    ));
    out.push_str(&format!(
        "Risk: on_track={} attention={} overdue={}\n",
        on_track, attention, overdue
    ));
    for row in &model.summary.rows {
        out.push_str(&format!(
            "  {}: {} ({}%)\n",
            row.phase_label,
            row.count,
            format_tenths(row.percent_tenths)
        ));
    }
    out.push_str(&format!("Pendencies: {}\n", model.pendency.len()));
    if !ctx.is_complete() {
        out.push_str("Report: partial\n");
    }

    Ok(out)
}
