//! 도메인 타입: 시스템 전역에서 사용되는 공통 타입
//!
//! 수집 노드와 중앙 노드가 공유하는 데이터 구조를 정의합니다.
//! [`RawEnvelope`]는 수신 직후의 원시 이벤트이고, [`Record`]는 파싱과 보강을 마친
//! 불변 저장 단위입니다.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// 수신 봉투: emitter가 한 줄로 보내는 JSON 객체
///
/// `message` 외의 모든 필드는 선택 사항입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEnvelope {
    /// RFC 3339 타임스탬프 문자열
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// 송신 호스트명
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// 이벤트 소스 유형 (예: "linux")
    #[serde(
        rename = "event.source.type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_type: Option<String>,
    /// 이벤트 카테고리 (예: "login.audit")
    #[serde(
        rename = "event.category",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,
    /// 자유 형식 메시지
    pub message: String,
}

impl RawEnvelope {
    /// 메시지만 가진 봉투를 생성합니다.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            timestamp: None,
            hostname: None,
            source_type: None,
            category: None,
            message: message.into(),
        }
    }

    /// 소스 유형과 카테고리를 설정합니다.
    pub fn with_source(mut self, source_type: impl Into<String>, category: impl Into<String>) -> Self {
        self.source_type = Some(source_type.into());
        self.category = Some(category.into());
        self
    }

    /// 호스트명을 설정합니다.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// 타임스탬프 문자열을 설정합니다.
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

/// 심각도: 고정된 세 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// 코드 0~3
    Error,
    /// 코드 4~5
    Warn,
    /// 코드 6 이상 또는 해석 불가
    Info,
}

impl Severity {
    /// syslog 스타일 숫자 코드를 심각도로 매핑합니다.
    pub fn from_code(code: u64) -> Self {
        match code {
            0..=3 => Self::Error,
            4 | 5 => Self::Warn,
            _ => Self::Info,
        }
    }

    /// 숫자 코드 문자열을 심각도로 매핑합니다. 해석할 수 없으면 `Info`입니다.
    pub fn from_code_str(code: &str) -> Self {
        code.parse::<u64>().map_or(Self::Info, Self::from_code)
    }

    /// 대문자 레이블을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ERROR" => Ok(Self::Error),
            "WARN" => Ok(Self::Warn),
            "INFO" => Ok(Self::Info),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// 소스 유형과 카테고리로 서비스 슬러그를 계산합니다.
///
/// `"Linux"`, `"Login.Audit"` → `"linux_login_audit"`
pub fn service_slug(source_type: &str, category: &str) -> String {
    format!(
        "{}_{}",
        source_type.to_lowercase(),
        category.to_lowercase().replace('.', "_")
    )
}

/// 파싱·보강이 끝난 저장 단위
///
/// 생성 이후에는 변경되지 않습니다. 스토어는 레코드를 추가만 하며 수정하거나 삭제하지 않습니다.
/// JSON 필드 이름은 릴레이 본문, 조회 결과, 백킹 로그에서 동일합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// UTC 타임스탬프 (누락 시 수신 시각)
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// 이벤트 카테고리
    #[serde(rename = "event.category", default)]
    pub category: String,
    /// 이벤트 소스 유형
    #[serde(rename = "event.source.type", default)]
    pub source_type: String,
    /// 메시지에서 추출한 사용자명
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// 호스트명
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// 심각도
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// 서비스 슬러그 ([`service_slug`])
    #[serde(default)]
    pub service: String,
    /// 원본 메시지
    #[serde(rename = "raw.message", default)]
    pub raw_message: String,
    /// 블랙리스트 여부
    #[serde(rename = "is.blacklisted", default)]
    pub blacklisted: bool,
}

impl Record {
    /// 필수 필드로 레코드를 생성합니다. 서비스 슬러그는 자동 계산됩니다.
    pub fn new(
        timestamp: DateTime<Utc>,
        source_type: impl Into<String>,
        category: impl Into<String>,
        raw_message: impl Into<String>,
    ) -> Self {
        let source_type = source_type.into();
        let category = category.into();
        Self {
            timestamp,
            service: service_slug(&source_type, &category),
            category,
            source_type,
            username: None,
            hostname: None,
            severity: None,
            raw_message: raw_message.into(),
            blacklisted: false,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_blacklisted(mut self, blacklisted: bool) -> Self {
        self.blacklisted = blacklisted;
        self
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}: {}",
            self.severity.map_or("-", |s| s.as_str()),
            self.hostname.as_deref().unwrap_or("-"),
            self.service,
            self.raw_message,
        )
    }
}

/// 집계 카운터 (가변)
///
/// 전체 건수와 카테고리(소문자)·심각도(대문자)별 건수를 누적합니다.
/// 빈 카테고리와 심각도가 없는 레코드는 `total`에만 반영됩니다.
#[derive(Debug, Clone, Default)]
pub struct CounterTally {
    total: u64,
    by_category: HashMap<String, u64>,
    by_severity: HashMap<String, u64>,
}

impl CounterTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// 레코드 한 건을 집계에 반영합니다.
    pub fn record(&mut self, record: &Record) {
        self.total += 1;
        if !record.category.is_empty() {
            *self
                .by_category
                .entry(record.category.to_lowercase())
                .or_insert(0) += 1;
        }
        if let Some(severity) = record.severity {
            *self
                .by_severity
                .entry(severity.as_str().to_owned())
                .or_insert(0) += 1;
        }
    }

    /// 전체 건수를 반환합니다.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// 현재 값의 복사본을 반환합니다.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            total: self.total,
            by_category: self
                .by_category
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            by_severity: self
                .by_severity
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
        }
    }
}

/// 집계 카운터 스냅샷 (불변 복사본)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    /// 전체 건수
    pub total: u64,
    /// 소문자 카테고리별 건수
    pub by_category: BTreeMap<String, u64>,
    /// 대문자 심각도별 건수
    pub by_severity: BTreeMap<String, u64>,
}
