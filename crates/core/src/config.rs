//! 설정 관리: logrelay.toml 파싱 및 런타임 설정
//!
//! [`LogRelayConfig`]는 수집 노드와 중앙 노드 설정을 모두 담는 최상위 구조체입니다.
//! 각 역할은 자기 섹션만 읽어 사용합니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGRELAY_COLLECTOR_WORKERS=8` 형식)
//! 3. 설정 파일 (`logrelay.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logrelay_core::error::LogRelayError> {
//! use logrelay_core::config::LogRelayConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogRelayConfig::load("logrelay.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogRelayConfig::parse("[collector]\nworkers = 8")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogRelayError};

/// 수집기 기본 블랙리스트 사용자
pub const DEFAULT_BLACKLIST_USERS: [&str; 2] = ["root", "admin"];

/// 수집기 기본 블랙리스트 IP
pub const DEFAULT_BLACKLIST_IPS: [&str; 2] = ["10.0.0.13", "192.168.1.66"];

/// logrelay 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogRelayConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 수집 노드 설정
    #[serde(default)]
    pub collector: CollectorSection,
    /// 중앙 노드 설정
    #[serde(default)]
    pub server: ServerSection,
    /// Prometheus 익스포터 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl LogRelayConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogRelayError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 기본값에 환경변수 오버라이드만 적용합니다 (설정 파일 없음).
    pub fn load_or_default() -> Result<Self, LogRelayError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogRelayError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogRelayError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogRelayError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogRelayError> {
        toml::from_str(toml_str).map_err(|e| {
            LogRelayError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGRELAY_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGRELAY_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGRELAY_GENERAL_LOG_FORMAT");

        // Collector
        let c = &mut self.collector;
        override_string(&mut c.listen_addr, "LOGRELAY_COLLECTOR_LISTEN_ADDR");
        override_string(&mut c.http_addr, "LOGRELAY_COLLECTOR_HTTP_ADDR");
        override_string(&mut c.relay_url, "LOGRELAY_COLLECTOR_RELAY_URL");
        override_usize(&mut c.workers, "LOGRELAY_COLLECTOR_WORKERS");
        override_usize(&mut c.queue_capacity, "LOGRELAY_COLLECTOR_QUEUE_CAPACITY");
        override_u64(
            &mut c.relay_timeout_secs,
            "LOGRELAY_COLLECTOR_RELAY_TIMEOUT_SECS",
        );
        override_usize(
            &mut c.max_message_size,
            "LOGRELAY_COLLECTOR_MAX_MESSAGE_SIZE",
        );
        override_string(&mut c.overflow_policy, "LOGRELAY_COLLECTOR_OVERFLOW_POLICY");
        override_u32(
            &mut c.relay_max_attempts,
            "LOGRELAY_COLLECTOR_RELAY_MAX_ATTEMPTS",
        );
        override_u64(
            &mut c.shutdown_timeout_secs,
            "LOGRELAY_COLLECTOR_SHUTDOWN_TIMEOUT_SECS",
        );
        override_csv(&mut c.blacklist_users, "LOGRELAY_COLLECTOR_BLACKLIST_USERS");
        override_csv(&mut c.blacklist_ips, "LOGRELAY_COLLECTOR_BLACKLIST_IPS");

        // Server
        override_string(&mut self.server.listen_addr, "LOGRELAY_SERVER_LISTEN_ADDR");
        override_string(&mut self.server.store, "LOGRELAY_SERVER_STORE");
        override_string(&mut self.server.store_path, "LOGRELAY_SERVER_STORE_PATH");

        // Metrics
        override_bool(&mut self.metrics.enabled, "LOGRELAY_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "LOGRELAY_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "LOGRELAY_METRICS_PORT");
        override_string(&mut self.metrics.endpoint, "LOGRELAY_METRICS_ENDPOINT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogRelayError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        self.collector.validate()?;
        self.server.validate()?;

        if self.metrics.enabled && !self.metrics.endpoint.starts_with('/') {
            return Err(invalid("metrics.endpoint", "must start with '/'"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> LogRelayError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 수집 노드 설정 (`[collector]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorSection {
    /// emitter TCP 수신 주소
    pub listen_addr: String,
    /// 수집기 HTTP(/metrics, /healthz) 주소
    pub http_addr: String,
    /// 중앙 노드 ingest URL
    pub relay_url: String,
    /// 워커 수
    pub workers: usize,
    /// 작업 큐 용량
    pub queue_capacity: usize,
    /// 릴레이 요청 타임아웃 (초)
    pub relay_timeout_secs: u64,
    /// 한 줄 메시지 최대 크기 (바이트)
    pub max_message_size: usize,
    /// 큐가 가득 찼을 때 정책 (block, drop_newest)
    pub overflow_policy: String,
    /// 릴레이 최대 시도 횟수 (1 = 재시도 없음)
    pub relay_max_attempts: u32,
    /// 정지 시 워커 드레인 대기 시간 (초)
    pub shutdown_timeout_secs: u64,
    /// 블랙리스트 사용자명
    pub blacklist_users: Vec<String>,
    /// 블랙리스트 IP 리터럴
    pub blacklist_ips: Vec<String>,
}

impl Default for CollectorSection {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9000".to_owned(),
            http_addr: "0.0.0.0:8080".to_owned(),
            relay_url: "http://log-server:8000/ingest".to_owned(),
            workers: 4,
            queue_capacity: 1024,
            relay_timeout_secs: 5,
            max_message_size: 1024 * 1024, // 1MB
            overflow_policy: "block".to_owned(),
            relay_max_attempts: 1,
            shutdown_timeout_secs: 10,
            blacklist_users: DEFAULT_BLACKLIST_USERS.map(str::to_owned).to_vec(),
            blacklist_ips: DEFAULT_BLACKLIST_IPS.map(str::to_owned).to_vec(),
        }
    }
}

impl CollectorSection {
    fn validate(&self) -> Result<(), LogRelayError> {
        if self.listen_addr.is_empty() {
            return Err(invalid("collector.listen_addr", "must not be empty"));
        }
        if self.relay_url.is_empty() {
            return Err(invalid("collector.relay_url", "must not be empty"));
        }
        if self.workers == 0 {
            return Err(invalid("collector.workers", "must be greater than 0"));
        }
        if self.queue_capacity == 0 {
            return Err(invalid("collector.queue_capacity", "must be greater than 0"));
        }
        if self.relay_timeout_secs == 0 {
            return Err(invalid(
                "collector.relay_timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.max_message_size == 0 {
            return Err(invalid(
                "collector.max_message_size",
                "must be greater than 0",
            ));
        }
        if self.relay_max_attempts == 0 {
            return Err(invalid(
                "collector.relay_max_attempts",
                "must be greater than 0",
            ));
        }
        let valid_policies = ["block", "drop_newest"];
        if !valid_policies.contains(&self.overflow_policy.as_str()) {
            return Err(invalid(
                "collector.overflow_policy",
                format!("must be one of: {}", valid_policies.join(", ")),
            ));
        }
        Ok(())
    }
}

/// 중앙 노드 설정 (`[server]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// HTTP 수신 주소
    pub listen_addr: String,
    /// 스토어 백엔드 (memory, file)
    pub store: String,
    /// 파일 백엔드의 백킹 로그 경로
    pub store_path: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_owned(),
            store: "memory".to_owned(),
            store_path: "/data/logs.jsonl".to_owned(),
        }
    }
}

impl ServerSection {
    fn validate(&self) -> Result<(), LogRelayError> {
        if self.listen_addr.is_empty() {
            return Err(invalid("server.listen_addr", "must not be empty"));
        }
        let valid_stores = ["memory", "file"];
        if !valid_stores.contains(&self.store.as_str()) {
            return Err(invalid(
                "server.store",
                format!("must be one of: {}", valid_stores.join(", ")),
            ));
        }
        if self.store == "file" && self.store_path.is_empty() {
            return Err(invalid(
                "server.store_path",
                "must not be empty when store = \"file\"",
            ));
        }
        Ok(())
    }
}

/// Prometheus 익스포터 설정 (`[metrics]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_parsed<T: std::str::FromStr>(target: &mut T, env_key: &str, type_name: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                expected = type_name,
                "failed to parse env var, ignoring"
            ),
        }
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    override_parsed(target, env_key, "bool");
}

fn override_usize(target: &mut usize, env_key: &str) {
    override_parsed(target, env_key, "usize");
}

fn override_u16(target: &mut u16, env_key: &str) {
    override_parsed(target, env_key, "u16");
}

fn override_u32(target: &mut u32, env_key: &str) {
    override_parsed(target, env_key, "u32");
}

fn override_u64(target: &mut u64, env_key: &str) {
    override_parsed(target, env_key, "u64");
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
