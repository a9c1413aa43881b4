use chrono::NaiveDate;
use kira_deadlineqc::classify::{RiskCategory, classify_all};
use kira_deadlineqc::config;
use kira_deadlineqc::fetch::{ContractSnapshot, LookupOutcome, Phase};
use kira_deadlineqc::report::{AgingBand, aggregate, percent_tenths};
use kira_deadlineqc::source::ContractId;

fn found(id: &str, phase: Phase, elapsed: Option<i64>) -> ContractSnapshot {
    ContractSnapshot {
        id: ContractId::parse(id).unwrap(),
        phase,
        raw_phase: Some(phase.label().to_string()),
        deadline_start: elapsed.map(|_| NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
        elapsed_days: elapsed,
        outcome: LookupOutcome::Found,
        error: None,
    }
}

fn not_found(id: &str) -> ContractSnapshot {
    ContractSnapshot {
        id: ContractId::parse(id).unwrap(),
        phase: Phase::Unidentified,
        raw_phase: None,
        deadline_start: None,
        elapsed_days: None,
        outcome: LookupOutcome::NotFound,
        error: None,
    }
}

#[test]
fn percent_rounds_half_up_to_tenths() {
    assert_eq!(percent_tenths(1, 3), 333);
    assert_eq!(percent_tenths(2, 3), 667);
    assert_eq!(percent_tenths(1, 8), 125);
    assert_eq!(percent_tenths(3, 3), 1000);
    assert_eq!(percent_tenths(0, 0), 0);
}

#[test]
fn scenario_summary_and_pendency() {
    let snapshots = vec![
        found("101", Phase::IntegracaoDocumental, Some(45)),
        found("202", Phase::Integrado, Some(10)),
        not_found("303"),
    ];
    let cfg = config::load_builtin().unwrap();
    let records = classify_all(&cfg.rules(), &snapshots);
    let model = aggregate(&records, cfg.day_threshold, cfg.fresh_days);

    assert_eq!(model.detail.len(), 3);
    assert_eq!(model.detail[0].risk, RiskCategory::Overdue);
    assert_eq!(model.detail[0].aging, Some(AgingBand::Expired));
    assert_eq!(model.detail[1].aging, Some(AgingBand::Aging));
    assert_eq!(model.detail[2].phase_label, "Não Encontrado");
    assert_eq!(model.detail[2].aging, None);

    // All counts tie at one; ordinal order breaks the tie.
    let phases: Vec<Phase> = model.summary.rows.iter().map(|r| r.phase).collect();
    assert_eq!(
        phases,
        vec![Phase::IntegracaoDocumental, Phase::Integrado, Phase::Unidentified]
    );
    assert!(model.summary.rows.iter().all(|r| r.percent_tenths == 333));
    assert_eq!(model.summary.total, 3);
    assert_eq!(model.summary.total_percent_tenths, 1000);

    let pend_ids: Vec<&str> = model.pendency.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(pend_ids, vec!["101", "303"]);
    assert_eq!(model.pendency[0].seq, 1);
    assert_eq!(model.pendency[1].seq, 3);
    assert_eq!(
        model.pendency[0].reason,
        "Integração Documental for 45 days, exceeds 30-day limit by 15"
    );
    assert_eq!(model.pendency[1].reason, "not located in the system of record");
    assert_eq!(model.risk_counts(), (1, 1, 1));
}

#[test]
fn summary_orders_by_count_descending() {
    let snapshots = vec![
        found("1", Phase::Pago, None),
        found("2", Phase::Averbacao, Some(3)),
        found("3", Phase::Averbacao, Some(12)),
        found("4", Phase::Averbacao, None),
    ];
    let cfg = config::load_builtin().unwrap();
    let model = aggregate(
        &classify_all(&cfg.rules(), &snapshots),
        cfg.day_threshold,
        cfg.fresh_days,
    );
    assert_eq!(model.summary.rows[0].phase, Phase::Averbacao);
    assert_eq!(model.summary.rows[0].count, 3);
    assert_eq!(model.summary.rows[0].percent_tenths, 750);
    assert!((model.summary.rows[0].percent() - 75.0).abs() < 1e-9);
    assert_eq!(model.summary.rows[1].percent_tenths, 250);

    let within = model.pendency.iter().find(|p| p.id == "2").unwrap();
    assert_eq!(within.reason, "Averbação for 3 days, 27 days left of 30-day limit");
    assert_eq!(model.detail[1].aging, Some(AgingBand::Fresh));
}

#[test]
fn unrecognised_label_is_shown_as_read() {
    let mut snap = found("9", Phase::Unidentified, None);
    snap.raw_phase = Some("Em Revisão".to_string());
    let cfg = config::load_builtin().unwrap();
    let model = aggregate(
        &classify_all(&cfg.rules(), &[snap]),
        cfg.day_threshold,
        cfg.fresh_days,
    );
    assert_eq!(model.detail[0].phase_label, "Em Revisão");
    assert_eq!(model.pendency[0].reason, "unrecognised phase label 'Em Revisão'");
    assert_eq!(model.pendency[0].area.as_deref(), Some("data-quality"));
}

#[test]
fn empty_input_yields_empty_report() {
    let model = aggregate(&[], 30, 7);
    assert!(model.detail.is_empty());
    assert!(model.summary.rows.is_empty());
    assert_eq!(model.summary.total, 0);
    assert_eq!(model.summary.total_percent_tenths, 0);
}
