use crate::classify::{ClassifiedRecord, Rule};
use crate::fetch::LookupOutcome;

pub fn pendency_reason(rec: &ClassifiedRecord, day_threshold: i64) -> String {
    let s = &rec.snapshot;
    match rec.rule {
        Rule::Unidentified => match s.outcome {
            LookupOutcome::NotFound => "not located in the system of record".to_string(),
            LookupOutcome::Failed => "lookup failed after retry".to_string(),
            LookupOutcome::Found => match s.raw_phase.as_deref() {
                Some(raw) if !raw.trim().is_empty() => {
                    format!("unrecognised phase label '{}'", raw.trim())
                }
                _ => "phase could not be read".to_string(),
            },
        },
        Rule::OverThreshold => {
            let days = s.elapsed_days.unwrap_or_default();
            format!(
                "{} for {} days, exceeds {}-day limit by {}",
                s.phase.label(),
                days,
                day_threshold,
                days - day_threshold
            )
        }
        Rule::WithinThreshold => {
            let days = s.elapsed_days.unwrap_or_default();
            format!(
                "{} for {} days, {} days left of {}-day limit",
                s.phase.label(),
                days,
                day_threshold - days,
                day_threshold
            )
        }
        Rule::Terminal => format!("{} (concluded)", s.phase.label()),
        Rule::ClockNotStarted => format!("{} (deadline clock not started)", s.phase.label()),
    }
}
