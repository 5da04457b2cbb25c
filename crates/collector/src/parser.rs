//! 봉투 파서: [`RawEnvelope`]를 보강된 [`Record`]로 변환합니다.
//!
//! # 메시지 형식
//! ```text
//! <code> host component: body
//! <4> host1 sshd: Failed password for invalid user root from 10.0.0.13 port 22 ssh2
//! ```
//!
//! 패턴이 일치하면 코드에서 심각도를, 호스트 토큰에서 호스트명(봉투에 없을 때만)을,
//! `user <name>` 토큰에서 사용자명을 얻습니다. 일치하지 않아도 에러가 아니며,
//! 심각도와 사용자명이 비어 있는 레코드가 됩니다.

use chrono::{DateTime, Utc};
use regex::Regex;

use logrelay_core::types::{RawEnvelope, Record, Severity};

use crate::enrich::Blacklist;
use crate::error::CollectorError;

/// syslog 스타일 메시지 패턴
const MESSAGE_PATTERN: &str = r"^<(\d+)>\s+(\S+)\s+([^:]+):\s+(.*)$";

/// 사용자명 토큰 패턴
const USER_PATTERN: &str = r"user\s+([A-Za-z0-9_-]+)";

/// 패턴 일치 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageParts<'a> {
    /// 숫자 코드 문자열
    pub code: &'a str,
    /// 호스트 토큰
    pub host: &'a str,
    /// 컴포넌트 (예: "sshd")
    pub component: &'a str,
    /// 본문
    pub body: &'a str,
}

/// 봉투 파서 + 블랙리스트 보강
#[derive(Debug, Clone)]
pub struct EventParser {
    message_re: Regex,
    user_re: Regex,
    blacklist: Blacklist,
}

impl EventParser {
    /// 주어진 블랙리스트로 파서를 생성합니다.
    pub fn new(blacklist: Blacklist) -> Result<Self, CollectorError> {
        Ok(Self {
            message_re: Regex::new(MESSAGE_PATTERN)?,
            user_re: Regex::new(USER_PATTERN)?,
            blacklist,
        })
    }

    /// 파서에 주입된 블랙리스트
    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    /// 메시지를 `<code> host component: body` 패턴으로 분해합니다.
    pub fn split_message<'a>(&self, message: &'a str) -> Option<MessageParts<'a>> {
        let caps = self.message_re.captures(message)?;
        Some(MessageParts {
            code: caps.get(1)?.as_str(),
            host: caps.get(2)?.as_str(),
            component: caps.get(3)?.as_str(),
            body: caps.get(4)?.as_str(),
        })
    }

    /// 텍스트에서 `user <name>` 토큰을 찾습니다.
    pub fn find_username<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.user_re
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// 봉투를 파싱·보강하여 레코드를 생성합니다. 실패하지 않습니다.
    pub fn parse(&self, envelope: RawEnvelope) -> Record {
        let RawEnvelope {
            timestamp,
            hostname,
            source_type,
            category,
            message,
        } = envelope;

        let mut record = Record::new(
            parse_timestamp(timestamp.as_deref()),
            source_type.unwrap_or_default(),
            category.unwrap_or_default(),
            String::new(),
        );
        record.hostname = hostname.filter(|h| !h.is_empty());

        if let Some(parts) = self.split_message(&message) {
            record.severity = Some(Severity::from_code_str(parts.code));
            if record.hostname.is_none() {
                record.hostname = Some(parts.host.to_owned());
            }
            record.username = self.find_username(parts.body).map(str::to_owned);
        }

        record.raw_message = message;
        record.blacklisted = self.blacklist.flags(&record);
        record
    }
}

/// RFC 3339 타임스탬프를 UTC로 파싱합니다. 없거나 잘못된 값이면 현재 시각입니다.
pub fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    raw.filter(|s| !s.is_empty())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map_or_else(Utc::now, |ts| ts.with_timezone(&Utc))
}
