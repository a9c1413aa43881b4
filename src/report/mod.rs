mod reason;

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::classify::{ClassifiedRecord, RiskCategory};
use crate::fetch::{LookupOutcome, Phase};

pub use reason::pendency_reason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgingBand {
    Fresh,
    Aging,
    Expired,
}

impl AgingBand {
    pub fn for_days(days: i64, fresh_days: i64, day_threshold: i64) -> Self {
        if days <= fresh_days {
            AgingBand::Fresh
        } else if days <= day_threshold {
            AgingBand::Aging
        } else {
            AgingBand::Expired
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgingBand::Fresh => "fresh",
            AgingBand::Aging => "aging",
            AgingBand::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRow {
    pub seq: usize,
    pub id: String,
    pub phase: Phase,
    pub phase_label: String,
    pub status: String,
    pub deadline_start: Option<NaiveDate>,
    pub elapsed_days: Option<i64>,
    pub aging: Option<AgingBand>,
    pub risk: RiskCategory,
    pub area: Option<String>,
    pub outcome: LookupOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub phase: Phase,
    pub phase_label: String,
    pub count: usize,
    /// Share of the total in tenths of a percent, rounded half up.
    pub percent_tenths: u32,
}

impl SummaryRow {
    pub fn percent(&self) -> f64 {
        self.percent_tenths as f64 / 10.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryView {
    pub rows: Vec<SummaryRow>,
    pub total: usize,
    /// Recomputed from counts, not from the rounded rows.
    pub total_percent_tenths: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendencyRow {
    pub seq: usize,
    pub id: String,
    pub phase: Phase,
    pub phase_label: String,
    pub status: String,
    pub deadline_start: Option<NaiveDate>,
    pub elapsed_days: Option<i64>,
    pub risk: RiskCategory,
    pub area: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportModel {
    pub detail: Vec<DetailRow>,
    pub summary: SummaryView,
    pub pendency: Vec<PendencyRow>,
}

impl ReportModel {
    pub fn risk_counts(&self) -> (usize, usize, usize) {
        self.detail.iter().fold((0, 0, 0), |(on, att, over), row| match row.risk {
            RiskCategory::OnTrack => (on + 1, att, over),
            RiskCategory::Attention => (on, att + 1, over),
            RiskCategory::Overdue => (on, att, over + 1),
        })
    }
}

/// Rounds `count / total` to tenths of a percent, half up.
pub fn percent_tenths(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let count = count as u64;
    let total = total as u64;
    ((count * 2000 + total) / (2 * total)) as u32
}

pub fn aggregate(records: &[ClassifiedRecord], day_threshold: i64, fresh_days: i64) -> ReportModel {
    let detail = records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let s = &rec.snapshot;
            DetailRow {
                seq: i + 1,
                id: s.id.to_string(),
                phase: s.phase,
                phase_label: phase_label(rec),
                status: s.phase.status().to_string(),
                deadline_start: s.deadline_start,
                elapsed_days: s.elapsed_days,
                aging: s
                    .elapsed_days
                    .map(|d| AgingBand::for_days(d, fresh_days, day_threshold)),
                risk: rec.risk,
                area: rec.area.clone(),
                outcome: s.outcome,
            }
        })
        .collect();

    let pendency = records
        .iter()
        .enumerate()
        .filter(|(_, rec)| rec.risk.needs_action())
        .map(|(i, rec)| {
            let s = &rec.snapshot;
            PendencyRow {
                seq: i + 1,
                id: s.id.to_string(),
                phase: s.phase,
                phase_label: phase_label(rec),
                status: s.phase.status().to_string(),
                deadline_start: s.deadline_start,
                elapsed_days: s.elapsed_days,
                risk: rec.risk,
                area: rec.area.clone(),
                reason: pendency_reason(rec, day_threshold),
            }
        })
        .collect();

    ReportModel {
        detail,
        summary: summarize(records),
        pendency,
    }
}

fn summarize(records: &[ClassifiedRecord]) -> SummaryView {
    let total = records.len();
    let mut counts: HashMap<Phase, usize> = HashMap::new();
    for rec in records {
        *counts.entry(rec.snapshot.phase).or_insert(0) += 1;
    }

    let mut buckets: Vec<(Phase, usize)> = counts.into_iter().collect();
    buckets.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.ordinal().cmp(&b.0.ordinal())));

    let rows = buckets
        .into_iter()
        .map(|(phase, count)| SummaryRow {
            phase,
            phase_label: phase.label().to_string(),
            count,
            percent_tenths: percent_tenths(count, total),
        })
        .collect();

    SummaryView {
        rows,
        total,
        total_percent_tenths: percent_tenths(total, total),
    }
}

/// Unrecognised labels are reported as read, so the operator sees what the
/// system actually showed.
fn phase_label(rec: &ClassifiedRecord) -> String {
    match (&rec.snapshot.phase, &rec.snapshot.raw_phase) {
        (Phase::Unidentified, Some(raw)) if !raw.trim().is_empty() => raw.clone(),
        (Phase::Unidentified, _) if rec.snapshot.outcome == LookupOutcome::NotFound => {
            "Não Encontrado".to_string()
        }
        (phase, _) => phase.label().to_string(),
    }
}
