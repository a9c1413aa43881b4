use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fetch::{ContractSnapshot, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    OnTrack,
    Attention,
    Overdue,
}

impl RiskCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskCategory::OnTrack => "on_track",
            RiskCategory::Attention => "attention",
            RiskCategory::Overdue => "overdue",
        }
    }

    pub fn needs_action(self) -> bool {
        matches!(self, RiskCategory::Attention | RiskCategory::Overdue)
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which classification rule decided a record, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Unidentified,
    Terminal,
    ClockNotStarted,
    OverThreshold,
    WithinThreshold,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRules {
    pub day_threshold: i64,
    pub phase_area_map: BTreeMap<Phase, String>,
    pub terminal_phases: Vec<Phase>,
    pub data_quality_area: String,
    pub default_area: String,
}

impl ClassificationRules {
    pub fn area_for(&self, phase: Phase) -> String {
        self.phase_area_map
            .get(&phase)
            .cloned()
            .unwrap_or_else(|| self.default_area.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    pub snapshot: ContractSnapshot,
    pub risk: RiskCategory,
    pub area: Option<String>,
    pub rule: Rule,
}

pub fn classify(rules: &ClassificationRules, snapshot: &ContractSnapshot) -> ClassifiedRecord {
    let (risk, area, rule) = if snapshot.phase == Phase::Unidentified {
        (
            RiskCategory::Attention,
            Some(rules.data_quality_area.clone()),
            Rule::Unidentified,
        )
    } else if rules.terminal_phases.contains(&snapshot.phase) {
        (RiskCategory::OnTrack, None, Rule::Terminal)
    } else {
        let area = Some(rules.area_for(snapshot.phase));
        match (snapshot.deadline_start, snapshot.elapsed_days) {
            (None, _) | (Some(_), None) => (RiskCategory::OnTrack, area, Rule::ClockNotStarted),
            (Some(_), Some(days)) if days > rules.day_threshold => {
                (RiskCategory::Overdue, area, Rule::OverThreshold)
            }
            (Some(_), Some(_)) => (RiskCategory::Attention, area, Rule::WithinThreshold),
        }
    };

    ClassifiedRecord {
        snapshot: snapshot.clone(),
        risk,
        area,
        rule,
    }
}

pub fn classify_all(rules: &ClassificationRules, snapshots: &[ContractSnapshot]) -> Vec<ClassifiedRecord> {
    snapshots.iter().map(|s| classify(rules, s)).collect()
}
