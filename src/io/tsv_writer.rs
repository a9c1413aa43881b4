use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::report::{DetailRow, PendencyRow, SummaryView};

pub fn write_detail_tsv(path: &Path, rows: &[DetailRow]) -> Result<()> {
    let mut w = create(path)?;
    writeln!(
        w,
        "seq\tcontract_id\tphase\tstatus\tdeadline_start\telapsed_days\taging\trisk\tarea"
    )?;
    for row in rows {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.seq,
            row.id,
            clean(&row.phase_label),
            row.status,
            opt(row.deadline_start.map(|d| d.format("%Y-%m-%d").to_string())),
            opt(row.elapsed_days),
            opt(row.aging.map(|a| a.as_str())),
            row.risk,
            opt(row.area.as_deref()),
        )?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_summary_tsv(path: &Path, summary: &SummaryView) -> Result<()> {
    let mut w = create(path)?;
    writeln!(w, "phase\tcount\tpercent")?;
    for row in &summary.rows {
        writeln!(
            w,
            "{}\t{}\t{}",
            row.phase_label,
            row.count,
            format_tenths(row.percent_tenths)
        )?;
    }
    writeln!(
        w,
        "TOTAL\t{}\t{}",
        summary.total,
        format_tenths(summary.total_percent_tenths)
    )?;
    w.flush()?;
    Ok(())
}

pub fn write_pendency_tsv(path: &Path, rows: &[PendencyRow]) -> Result<()> {
    let mut w = create(path)?;
    writeln!(
        w,
        "seq\tcontract_id\tphase\tstatus\tdeadline_start\telapsed_days\trisk\tarea\treason"
    )?;
    for row in rows {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.seq,
            row.id,
            clean(&row.phase_label),
            row.status,
            opt(row.deadline_start.map(|d| d.format("%Y-%m-%d").to_string())),
            opt(row.elapsed_days),
            row.risk,
            opt(row.area.as_deref()),
            clean(&row.reason),
        )?;
    }
    w.flush()?;
    Ok(())
}

pub fn format_tenths(tenths: u32) -> String {
    format!("{}.{}", tenths / 10, tenths % 10)
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

// Labels read from the live system may carry tabs or line breaks.
fn clean(text: &str) -> String {
    text.replace(['\t', '\n', '\r'], " ")
}
