use session_warden::{config::GlobalConfig, AppError};

fn sample_toml(log_dir: &str) -> String {
    format!(
        r#"
max_concurrent_sessions = 2

[audit]
log_dir = '{log_dir}'

[simulation]
session_count = 4
iterations = 20
tick_millis = 0
"#
    )
}

#[test]
fn parses_valid_config() {
    let temp = tempfile::tempdir().expect("tempdir");
    let toml = sample_toml(temp.path().to_str().expect("utf8 path"));

    let config = GlobalConfig::from_toml_str(&toml).expect("config parses");

    assert_eq!(config.max_concurrent_sessions, 2);
    assert_eq!(
        config.audit.as_ref().map(|a| a.log_dir.clone()),
        Some(temp.path().to_path_buf())
    );
    assert_eq!(config.simulation.session_count, 4);
    assert_eq!(config.simulation.iterations, 20);
    assert_eq!(config.simulation.tick_millis, 0);
}

#[test]
fn empty_config_uses_defaults() {
    let config = GlobalConfig::from_toml_str("").expect("empty config parses");

    assert_eq!(config, GlobalConfig::default());
    assert_eq!(config.max_concurrent_sessions, 100);
    assert!(config.audit.is_none());
    assert_eq!(config.simulation.session_count, 10);
    assert_eq!(config.simulation.iterations, 100);
    assert_eq!(config.simulation.tick_millis, 10);
}

#[test]
fn zero_max_concurrent_is_rejected() {
    let result = GlobalConfig::from_toml_str("max_concurrent_sessions = 0");
    assert!(matches!(result, Err(AppError::Config(ref msg)) if msg.contains("greater than zero")));
}

#[test]
fn empty_audit_dir_is_rejected() {
    let result = GlobalConfig::from_toml_str("[audit]\nlog_dir = ''\n");
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn unknown_keys_are_rejected() {
    let result = GlobalConfig::from_toml_str("max_concurrent_sessions = 3\nmax_sessions = 4\n");
    assert!(matches!(result, Err(AppError::Config(ref msg)) if msg.starts_with("invalid config")));
}

#[test]
fn load_from_path_reads_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "max_concurrent_sessions = 7\n").expect("write config");

    let config = GlobalConfig::load_from_path(&path).expect("load");
    assert_eq!(config.max_concurrent_sessions, 7);
}

#[test]
fn load_from_missing_path_is_config_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let result = GlobalConfig::load_from_path(temp.path().join("absent.toml"));
    assert!(matches!(result, Err(AppError::Config(ref msg)) if msg.starts_with("failed to read config")));
}
