use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use flate2::Compression;
use flate2::write::GzEncoder;
use kira_deadlineqc::checkpoint::{RunCheckpointer, RunState};
use kira_deadlineqc::classify::RiskCategory;
use kira_deadlineqc::config::{self, DeadlineConfig};
use kira_deadlineqc::ctx::Ctx;
use kira_deadlineqc::fetch::{ContractSnapshot, LookupOutcome, Phase};
use kira_deadlineqc::pipeline::Pipeline;
use kira_deadlineqc::session::replay::{ReplayEntry, ReplaySystem};
use kira_deadlineqc::source::ContractId;
use tempfile::TempDir;

fn ref_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn write_source(path: &Path) {
    let file = File::create(path).unwrap();
    let mut enc = GzEncoder::new(file, Compression::default());
    enc.write_all(b"A;101\nB;101\nC;202\nD;abc\nE;303\n").unwrap();
    enc.finish().unwrap();
}

fn fast_config() -> DeadlineConfig {
    let mut cfg = config::load_builtin().unwrap();
    cfg.pause_between_ms = 0;
    cfg.retry.base_backoff_ms = 0;
    cfg.checkpoint_interval = 2;
    cfg
}

fn replay() -> ReplaySystem {
    ReplaySystem::new([
        (
            "101".to_string(),
            ReplayEntry::found(
                "Integração Documental",
                NaiveDate::from_ymd_opt(2024, 5, 1),
            ),
        ),
        (
            "202".to_string(),
            ReplayEntry::found("Integrado", NaiveDate::from_ymd_opt(2024, 6, 5)),
        ),
    ])
}

fn full_pipeline() -> Pipeline {
    Pipeline::full_run()
}

fn new_ctx(tmp: &TempDir) -> Ctx {
    let input = tmp.path().join("export.csv.gz");
    write_source(&input);
    Ctx::new(
        Some(input),
        tmp.path().join("out"),
        fast_config(),
        ref_date(),
        false,
        false,
        "test",
    )
}

#[test]
fn full_run_writes_reports_and_clears_checkpoint() {
    let tmp = TempDir::new().unwrap();
    let mut ctx = new_ctx(&tmp);
    ctx.system = Some(Box::new(replay()));

    full_pipeline().run(&mut ctx).unwrap();

    let out = tmp.path().join("out");
    for name in ["deadlineqc.json", "detail.tsv", "summary.tsv", "pendency.tsv"] {
        assert!(out.join(name).exists(), "{name} missing");
    }
    assert!(!out.join("checkpoint").join("run_state.json").exists());

    let report = &ctx.report;
    assert!(report.complete);
    assert_eq!(report.input_meta.ids, Some(3));
    assert_eq!(report.input_meta.malformed, Some(1));
    assert_eq!(report.input_meta.duplicates, Some(1));
    assert_eq!(report.input_meta.not_found, 1);
    assert_eq!(report.detail.len(), 3);
    assert_eq!(report.detail[0].risk, RiskCategory::Overdue);
    assert_eq!(report.detail[0].elapsed_days, Some(45));
    assert_eq!(report.detail[1].risk, RiskCategory::OnTrack);
    assert_eq!(report.detail[2].outcome, LookupOutcome::NotFound);
    assert_eq!(report.pendency.len(), 2);
    assert_eq!(report.warnings.len(), 1);

    let summary = std::fs::read_to_string(out.join("summary.tsv")).unwrap();
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines[0], "phase\tcount\tpercent");
    assert_eq!(lines[1], "Integração Documental\t1\t33.3");
    assert_eq!(lines.last().copied(), Some("TOTAL\t3\t100.0"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("deadlineqc.json")).unwrap())
            .unwrap();
    assert_eq!(json["tool"], "kira-deadlineqc");
    assert_eq!(json["reference_date"], "2024-06-15");
    assert_eq!(json["detail"][0]["risk"], "overdue");
}

#[test]
fn json_flag_alone_skips_tsv() {
    let tmp = TempDir::new().unwrap();
    let mut ctx = new_ctx(&tmp);
    ctx.write_json = true;
    ctx.system = Some(Box::new(replay()));

    full_pipeline().run(&mut ctx).unwrap();

    let out = tmp.path().join("out");
    assert!(out.join("deadlineqc.json").exists());
    assert!(!out.join("detail.tsv").exists());
}

#[test]
fn resume_reuses_checkpointed_prefix() {
    let tmp = TempDir::new().unwrap();
    let mut ctx = new_ctx(&tmp);

    // First contract already processed with a phase the replay would not report.
    let ids: Vec<ContractId> = ["101", "202", "303"]
        .iter()
        .map(|v| ContractId::parse(v).unwrap())
        .collect();
    let mut state = RunState::new(ref_date(), ids.clone());
    state.record(ContractSnapshot {
        id: ids[0].clone(),
        phase: Phase::Pago,
        raw_phase: Some("Pago".to_string()),
        deadline_start: None,
        elapsed_days: None,
        outcome: LookupOutcome::Found,
        error: None,
    });
    RunCheckpointer::in_dir(&ctx.output.checkpoint_dir, 2)
        .write(&state)
        .unwrap();

    ctx.resume = true;
    ctx.system = Some(Box::new(replay()));
    full_pipeline().run(&mut ctx).unwrap();

    assert_eq!(ctx.report.input_meta.resumed_from, 1);
    assert_eq!(ctx.report.detail[0].phase, Phase::Pago);
    assert_eq!(ctx.report.detail[1].phase, Phase::Integrado);
    assert_eq!(ctx.report.detail.len(), 3);
    assert!(ctx.report.complete);
}

#[test]
fn resume_ignores_checkpoint_for_other_source() {
    let tmp = TempDir::new().unwrap();
    let mut ctx = new_ctx(&tmp);

    let other = vec![ContractId::parse("999").unwrap()];
    RunCheckpointer::in_dir(&ctx.output.checkpoint_dir, 2)
        .write(&RunState::new(ref_date(), other))
        .unwrap();

    ctx.resume = true;
    ctx.system = Some(Box::new(replay()));
    full_pipeline().run(&mut ctx).unwrap();

    assert_eq!(ctx.report.input_meta.resumed_from, 0);
    assert_eq!(ctx.report.detail.len(), 3);
    assert!(
        ctx.report
            .warnings
            .iter()
            .any(|w| w.contains("identifier list differs"))
    );
}

#[test]
fn failed_lookups_are_recorded_and_run_continues() {
    let tmp = TempDir::new().unwrap();
    let mut ctx = new_ctx(&tmp);
    ctx.system = Some(Box::new(ReplaySystem::new([
        ("101".to_string(), ReplayEntry::failing(5)),
        (
            "202".to_string(),
            ReplayEntry::found("Pago", None),
        ),
    ])));

    full_pipeline().run(&mut ctx).unwrap();

    assert_eq!(ctx.report.input_meta.fetch_failures, 1);
    assert_eq!(ctx.report.detail[0].outcome, LookupOutcome::Failed);
    assert_eq!(ctx.report.pendency[0].reason, "lookup failed after retry");
    assert_eq!(ctx.report.detail[1].phase, Phase::Pago);
}

#[test]
fn regulator_scenario() {
    let tmp = TempDir::new().unwrap();
    let mut ctx = new_ctx(&tmp);
    let start = ref_date().checked_sub_days(chrono::Days::new(78));
    ctx.system = Some(Box::new(ReplaySystem::new([
        ("101".to_string(), ReplayEntry::found("Integrado", None)),
        (
            "202".to_string(),
            ReplayEntry::found("Integração Documental", start),
        ),
        ("303".to_string(), ReplayEntry::failing(2)),
    ])));

    full_pipeline().run(&mut ctx).unwrap();

    let detail = &ctx.report.detail;
    assert_eq!(detail[0].risk, RiskCategory::OnTrack);
    assert_eq!(detail[0].area, None);
    assert_eq!(detail[1].risk, RiskCategory::Overdue);
    assert_eq!(detail[1].elapsed_days, Some(78));
    assert_eq!(detail[1].area.as_deref(), Some("document-integration"));
    assert_eq!(detail[2].risk, RiskCategory::Attention);
    assert_eq!(detail[2].area.as_deref(), Some("data-quality"));

    let pend: Vec<&str> = ctx.report.pendency.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(pend, vec!["202", "303"]);
}

#[test]
fn run_completes_when_checkpoints_cannot_be_written() {
    let tmp = TempDir::new().unwrap();
    let mut ctx = new_ctx(&tmp);
    let blocker = tmp.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    ctx.output.checkpoint_dir = blocker;
    ctx.system = Some(Box::new(replay()));

    full_pipeline().run(&mut ctx).unwrap();

    // Interval 2 over 3 contracts: one interval write plus the tail write.
    assert_eq!(ctx.report.input_meta.checkpoint_failures, 2);
    assert!(ctx.report.complete);
    assert_eq!(ctx.report.detail.len(), 3);
    assert!(tmp.path().join("out").join("deadlineqc.json").exists());
    assert!(
        ctx.report
            .warnings
            .iter()
            .any(|w| w.contains("checkpoint after 2 contracts not saved"))
    );
}

#[test]
fn stage_lists_per_command() {
    assert_eq!(
        Pipeline::full_run().stage_names(),
        vec![
            "stage0_scaffold",
            "stage1_source",
            "stage2_resume",
            "stage3_session",
            "stage4_fetch",
            "stage5_classify",
            "stage6_report",
            "stage7_output",
        ]
    );
    assert_eq!(
        Pipeline::recover().stage_names(),
        vec!["stage0_scaffold", "stage5_classify", "stage6_report", "stage7_output"]
    );
    assert_eq!(Pipeline::validate().stage_names(), vec!["stage1_source"]);
}
