//! logrelay.toml 통합 설정 테스트
//!
//! - logrelay.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use logrelay_core::config::LogRelayConfig;
use logrelay_core::error::{ConfigError, LogRelayError};

const EXAMPLE: &str = include_str!("../../../logrelay.toml.example");

/// 환경변수를 설정하고 이전 값을 돌려줍니다.
fn set_env(key: &str, value: &str) -> Option<String> {
    let original = std::env::var(key).ok();
    // SAFETY: 환경변수를 조작하는 테스트는 모두 serial로 직렬화됩니다.
    unsafe { std::env::set_var(key, value) };
    original
}

fn restore_env(key: &str, original: Option<String>) {
    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var(key, val),
            None => std::env::remove_var(key),
        }
    }
}

// =============================================================================
// logrelay.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_and_validates() {
    let config = LogRelayConfig::parse(EXAMPLE).expect("example config should parse");
    config
        .validate()
        .expect("example config should pass validation");
    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
}

#[test]
fn example_config_matches_code_defaults() {
    let example = LogRelayConfig::parse(EXAMPLE).expect("should parse");
    let defaults = LogRelayConfig::default();

    assert_eq!(example.collector.listen_addr, defaults.collector.listen_addr);
    assert_eq!(example.collector.http_addr, defaults.collector.http_addr);
    assert_eq!(example.collector.relay_url, defaults.collector.relay_url);
    assert_eq!(example.collector.workers, defaults.collector.workers);
    assert_eq!(
        example.collector.queue_capacity,
        defaults.collector.queue_capacity
    );
    assert_eq!(
        example.collector.relay_timeout_secs,
        defaults.collector.relay_timeout_secs
    );
    assert_eq!(
        example.collector.max_message_size,
        defaults.collector.max_message_size
    );
    assert_eq!(
        example.collector.overflow_policy,
        defaults.collector.overflow_policy
    );
    assert_eq!(
        example.collector.relay_max_attempts,
        defaults.collector.relay_max_attempts
    );
    assert_eq!(
        example.collector.blacklist_users,
        defaults.collector.blacklist_users
    );
    assert_eq!(
        example.collector.blacklist_ips,
        defaults.collector.blacklist_ips
    );
    assert_eq!(example.server.listen_addr, defaults.server.listen_addr);
    assert_eq!(example.server.store, defaults.server.store);
    assert_eq!(example.server.store_path, defaults.server.store_path);
    assert_eq!(example.metrics.port, defaults.metrics.port);
}

// =============================================================================
// 부분 설정 테스트
// =============================================================================

#[test]
fn partial_config_server_only() {
    let toml = r#"
[server]
store = "file"
store_path = "/var/lib/logrelay/logs.jsonl"
"#;
    let config = LogRelayConfig::parse(toml).expect("should parse");
    assert_eq!(config.server.store, "file");
    assert_eq!(config.server.listen_addr, "0.0.0.0:8000");
    assert_eq!(config.collector.workers, 4);
    config.validate().expect("should validate");
}

#[test]
fn partial_config_collector_only() {
    let toml = r#"
[collector]
relay_url = "http://10.1.0.5:8000/ingest"
overflow_policy = "drop_newest"
relay_max_attempts = 3
"#;
    let config = LogRelayConfig::parse(toml).expect("should parse");
    assert_eq!(config.collector.relay_url, "http://10.1.0.5:8000/ingest");
    assert_eq!(config.collector.overflow_policy, "drop_newest");
    assert_eq!(config.collector.relay_max_attempts, 3);
    assert_eq!(config.collector.queue_capacity, 1024);
    assert_eq!(config.server.store, "memory");
    config.validate().expect("should validate");
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[collector]
workers = 2
"#;
    let original = set_env("LOGRELAY_COLLECTOR_WORKERS", "12");

    let mut config = LogRelayConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();
    let result = config.collector.workers;

    restore_env("LOGRELAY_COLLECTOR_WORKERS", original);
    assert_eq!(result, 12);
}

#[test]
#[serial_test::serial]
fn env_override_csv_for_blacklists() {
    let original = set_env("LOGRELAY_COLLECTOR_BLACKLIST_USERS", "oracle, guest");

    let mut config = LogRelayConfig::default();
    config.apply_env_overrides();
    let result = config.collector.blacklist_users.clone();

    restore_env("LOGRELAY_COLLECTOR_BLACKLIST_USERS", original);
    assert_eq!(result, vec!["oracle", "guest"]);
}

#[test]
#[serial_test::serial]
fn env_override_bool_field() {
    let original = set_env("LOGRELAY_METRICS_ENABLED", "true");

    let mut config = LogRelayConfig::default();
    config.apply_env_overrides();
    let result = config.metrics.enabled;

    restore_env("LOGRELAY_METRICS_ENABLED", original);
    assert!(result);
}

#[test]
#[serial_test::serial]
fn env_override_invalid_value_fails_validation() {
    let original = set_env("LOGRELAY_SERVER_STORE", "redis");
    let result = LogRelayConfig::load_or_default();
    restore_env("LOGRELAY_SERVER_STORE", original);

    let err = result.expect_err("unknown backend should be rejected");
    assert!(err.to_string().contains("server.store"));
}

// =============================================================================
// 에러 케이스
// =============================================================================

#[test]
fn whitespace_and_comments_parse_with_defaults() {
    let config = LogRelayConfig::parse("   \n# only a comment\n").expect("should parse");
    assert_eq!(config.collector.workers, 4);
}

#[test]
fn wrong_type_for_numeric_field() {
    let toml = r#"
[collector]
workers = "four"
"#;
    let err = LogRelayConfig::parse(toml).expect_err("should fail");
    assert!(matches!(
        err,
        LogRelayError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn unknown_section_is_ignored() {
    let toml = r#"
[future_feature]
enabled = true

[general]
log_level = "debug"
"#;
    let config = LogRelayConfig::parse(toml).expect("unknown sections should be ignored");
    assert_eq!(config.general.log_level, "debug");
}

#[tokio::test]
async fn from_file_nonexistent_returns_file_not_found() {
    let result = LogRelayConfig::from_file("/tmp/logrelay_test_nonexistent_12345.toml").await;
    assert!(matches!(
        result,
        Err(LogRelayError::Config(ConfigError::FileNotFound { .. }))
    ));
}

#[tokio::test]
#[serial_test::serial]
async fn load_from_disk_applies_overrides() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("logrelay.toml");
    tokio::fs::write(&path, "[server]\nlisten_addr = \"127.0.0.1:18000\"\n")
        .await
        .expect("write config");

    let original = set_env("LOGRELAY_GENERAL_LOG_LEVEL", "debug");
    let result = LogRelayConfig::load(&path).await;
    restore_env("LOGRELAY_GENERAL_LOG_LEVEL", original);

    let config = result.expect("should load");
    assert_eq!(config.server.listen_addr, "127.0.0.1:18000");
    assert_eq!(config.general.log_level, "debug");
}

// =============================================================================
// 직렬화 라운드트립 테스트
// =============================================================================

#[test]
fn example_config_serialize_roundtrip() {
    let config = LogRelayConfig::parse(EXAMPLE).expect("should parse");
    let serialized = toml::to_string_pretty(&config).expect("should serialize");
    let reparsed = LogRelayConfig::parse(&serialized).expect("should reparse");
    assert_eq!(config.collector.relay_url, reparsed.collector.relay_url);
    assert_eq!(
        config.collector.blacklist_ips,
        reparsed.collector.blacklist_ips
    );
    assert_eq!(config.server.store_path, reparsed.server.store_path);
}
