//! 수집 노드 설정
//!
//! [`CollectorConfig`]는 core의 [`CollectorSection`](logrelay_core::config::CollectorSection)을
//! 기반으로 문자열 설정을 타입이 있는 정책 값으로 변환합니다.
//!
//! # 사용 예시
//! ```ignore
//! use logrelay_core::config::LogRelayConfig;
//! use logrelay_collector::config::CollectorConfig;
//!
//! let core_config = LogRelayConfig::default();
//! let config = CollectorConfig::from_core(&core_config.collector)?;
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use logrelay_core::config::{CollectorSection, DEFAULT_BLACKLIST_IPS, DEFAULT_BLACKLIST_USERS};

use crate::enrich::Blacklist;
use crate::error::CollectorError;

/// 작업 큐가 가득 찼을 때의 정책
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// 공간이 생길 때까지 프론트엔드가 대기 (기본값, 유일한 백프레셔)
    #[default]
    Block,
    /// 새 봉투를 버리고 `dropped` 카운터를 증가
    DropNewest,
}

impl FromStr for OverflowPolicy {
    type Err = CollectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "block" => Ok(Self::Block),
            "drop_newest" => Ok(Self::DropNewest),
            other => Err(CollectorError::Config {
                field: "overflow_policy".to_owned(),
                reason: format!("unknown policy '{other}' (expected block or drop_newest)"),
            }),
        }
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block => f.write_str("block"),
            Self::DropNewest => f.write_str("drop_newest"),
        }
    }
}

/// 릴레이 실패 시 정책
///
/// 재시도는 즉시 수행되며 백오프나 dead-letter 큐는 없습니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayPolicy {
    /// 한 번만 시도하고 실패하면 버림 (기본값)
    #[default]
    AtMostOnce,
    /// 최대 `max_attempts`회까지 즉시 재시도
    Retry {
        /// 총 시도 횟수 (첫 시도 포함)
        max_attempts: u32,
    },
}

impl RelayPolicy {
    /// 총 시도 횟수로부터 정책을 생성합니다. 1 이하는 `AtMostOnce`입니다.
    pub fn from_attempts(max_attempts: u32) -> Self {
        if max_attempts <= 1 {
            Self::AtMostOnce
        } else {
            Self::Retry { max_attempts }
        }
    }

    /// 총 시도 횟수
    pub fn max_attempts(&self) -> u32 {
        match self {
            Self::AtMostOnce => 1,
            Self::Retry { max_attempts } => *max_attempts,
        }
    }
}

/// 수집 노드 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// emitter TCP 수신 주소
    pub listen_addr: String,
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
    /// 큐 초과 정책
    pub overflow_policy: OverflowPolicy,
    /// 릴레이 실패 정책
    pub relay_policy: RelayPolicy,
    /// 정지 시 워커 드레인 대기 시간 (초)
    pub shutdown_timeout_secs: u64,
    /// 블랙리스트 사용자명
    pub blacklist_users: Vec<String>,
    /// 블랙리스트 IP 리터럴
    pub blacklist_ips: Vec<String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9000".to_owned(),
            relay_url: "http://log-server:8000/ingest".to_owned(),
            workers: 4,
            queue_capacity: 1024,
            relay_timeout_secs: 5,
            max_message_size: 1024 * 1024, // 1MB
            overflow_policy: OverflowPolicy::Block,
            relay_policy: RelayPolicy::AtMostOnce,
            shutdown_timeout_secs: 10,
            blacklist_users: DEFAULT_BLACKLIST_USERS.map(str::to_owned).to_vec(),
            blacklist_ips: DEFAULT_BLACKLIST_IPS.map(str::to_owned).to_vec(),
        }
    }
}

impl CollectorConfig {
    /// core의 `[collector]` 섹션에서 설정을 생성합니다.
    pub fn from_core(core: &CollectorSection) -> Result<Self, CollectorError> {
        let config = Self {
            listen_addr: core.listen_addr.clone(),
            relay_url: core.relay_url.clone(),
            workers: core.workers,
            queue_capacity: core.queue_capacity,
            relay_timeout_secs: core.relay_timeout_secs,
            max_message_size: core.max_message_size,
            overflow_policy: core.overflow_policy.parse()?,
            relay_policy: RelayPolicy::from_attempts(core.relay_max_attempts),
            shutdown_timeout_secs: core.shutdown_timeout_secs,
            blacklist_users: core.blacklist_users.clone(),
            blacklist_ips: core.blacklist_ips.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    /// 릴레이 타임아웃
    pub fn relay_timeout(&self) -> Duration {
        Duration::from_secs(self.relay_timeout_secs)
    }

    /// 정지 대기 시간
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// 설정된 목록으로 블랙리스트를 생성합니다.
    pub fn blacklist(&self) -> Blacklist {
        Blacklist::new(&self.blacklist_users, &self.blacklist_ips)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), CollectorError> {
        const MAX_WORKERS: usize = 1024;

        if self.listen_addr.is_empty() {
            return Err(config_error("listen_addr", "must not be empty"));
        }
        if self.relay_url.is_empty() {
            return Err(config_error("relay_url", "must not be empty"));
        }
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(config_error(
                "workers",
                &format!("must be 1-{MAX_WORKERS}"),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(config_error("queue_capacity", "must be greater than 0"));
        }
        if self.relay_timeout_secs == 0 {
            return Err(config_error("relay_timeout_secs", "must be greater than 0"));
        }
        if self.max_message_size == 0 {
            return Err(config_error("max_message_size", "must be greater than 0"));
        }
        if let RelayPolicy::Retry { max_attempts: 0 } = self.relay_policy {
            return Err(config_error("relay_max_attempts", "must be greater than 0"));
        }
        Ok(())
    }
}

fn config_error(field: &str, reason: &str) -> CollectorError {
    CollectorError::Config {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
}

/// 수집 노드 설정 빌더
#[derive(Default)]
pub struct CollectorConfigBuilder {
    config: CollectorConfig,
}

impl CollectorConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// TCP 수신 주소를 설정합니다.
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// 릴레이 URL을 설정합니다.
    pub fn relay_url(mut self, url: impl Into<String>) -> Self {
        self.config.relay_url = url.into();
        self
    }

    /// 워커 수를 설정합니다.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// 큐 용량을 설정합니다.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// 릴레이 타임아웃(초)을 설정합니다.
    pub fn relay_timeout_secs(mut self, secs: u64) -> Self {
        self.config.relay_timeout_secs = secs;
        self
    }

    /// 최대 메시지 크기를 설정합니다.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    /// 큐 초과 정책을 설정합니다.
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.config.overflow_policy = policy;
        self
    }

    /// 릴레이 정책을 설정합니다.
    pub fn relay_policy(mut self, policy: RelayPolicy) -> Self {
        self.config.relay_policy = policy;
        self
    }

    /// 정지 대기 시간(초)을 설정합니다.
    pub fn shutdown_timeout_secs(mut self, secs: u64) -> Self {
        self.config.shutdown_timeout_secs = secs;
        self
    }

    /// 블랙리스트 사용자명을 설정합니다.
    pub fn blacklist_users(mut self, users: Vec<String>) -> Self {
        self.config.blacklist_users = users;
        self
    }

    /// 블랙리스트 IP를 설정합니다.
    pub fn blacklist_ips(mut self, ips: Vec<String>) -> Self {
        self.config.blacklist_ips = ips;
        self
    }

    /// 설정을 검증하고 `CollectorConfig`를 생성합니다.
    pub fn build(self) -> Result<CollectorConfig, CollectorError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
