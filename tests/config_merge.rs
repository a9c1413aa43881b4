use kira_deadlineqc::config::{self, merge_values};
use kira_deadlineqc::error::ConfigError;
use kira_deadlineqc::fetch::Phase;
use serde_json::json;
use tempfile::TempDir;

#[test]
fn builtin_defaults() {
    let cfg = config::load_builtin().unwrap();
    assert_eq!(cfg.day_threshold, 30);
    assert_eq!(cfg.checkpoint_interval, 10);
    assert_eq!(cfg.retry.max_attempts, 2);
    assert_eq!(cfg.terminal_phases, vec![Phase::Integrado, Phase::Pago]);
    assert_eq!(
        cfg.phase_area_map.get(&Phase::IntegracaoDocumental).map(String::as_str),
        Some("document-integration")
    );
    assert_eq!(cfg.session.webdriver_url, "http://127.0.0.1:9515");
    assert_eq!(cfg.source_options().delimiter, ';');
}

#[test]
fn merge_is_recursive() {
    let mut base = json!({"a": 1, "nested": {"x": 1, "y": 2}, "list": [1, 2]});
    merge_values(&mut base, json!({"nested": {"y": 5}, "list": [9], "b": true}));
    assert_eq!(
        base,
        json!({"a": 1, "nested": {"x": 1, "y": 5}, "list": [9], "b": true})
    );
}

#[test]
fn user_overlay_keeps_unlisted_defaults() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("cfg.json");
    std::fs::write(
        &path,
        r#"{"day_threshold": 45, "phase_area_map": {"credito": "risk-desk"}, "retry": {"base_backoff_ms": 0}}"#,
    )
    .unwrap();

    let cfg = config::load(Some(&path)).unwrap();
    assert_eq!(cfg.day_threshold, 45);
    assert_eq!(cfg.phase_area_map.get(&Phase::Credito).unwrap(), "risk-desk");
    assert_eq!(cfg.phase_area_map.get(&Phase::Pago), None);
    assert_eq!(cfg.phase_area_map.get(&Phase::Averbacao).unwrap(), "payroll-registration");
    assert_eq!(cfg.retry.max_attempts, 2);
    assert_eq!(cfg.retry.base_backoff_ms, 0);
    assert_eq!(cfg.fresh_days, 7);
}

#[test]
fn invalid_values_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let cases = [
        r#"{"checkpoint_interval": 0}"#,
        r#"{"day_threshold": -1}"#,
        r#"{"retry": {"max_attempts": 3}}"#,
        r#"{"source": {"delimiter": ";;"}}"#,
        r#"{"terminal_phases": ["unidentified"]}"#,
    ];
    for (i, body) in cases.iter().enumerate() {
        let path = tmp.path().join(format!("bad{i}.json"));
        std::fs::write(&path, body).unwrap();
        let err = config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "case {body}: {err}");
    }
}

#[test]
fn unknown_phase_key_is_a_parse_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("cfg.json");
    std::fs::write(&path, r#"{"phase_area_map": {"limbo": "x"}}"#).unwrap();
    let err = config::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn non_object_overlay_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("cfg.json");
    std::fs::write(&path, "[1, 2]").unwrap();
    assert!(matches!(
        config::load(Some(&path)).unwrap_err(),
        ConfigError::Parse { .. }
    ));
}
