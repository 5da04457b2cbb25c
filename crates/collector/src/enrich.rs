//! 블랙리스트 보강
//!
//! [`Blacklist`]는 생성 시점에 고정되는 불변 값으로, [`EventParser`](crate::parser::EventParser)에
//! 주입되어 레코드의 `blacklisted` 플래그를 결정합니다.
//!
//! IP 검사는 원본 메시지에 대한 부분 문자열 검색이며 항목 수에 비례합니다.
//! 목록이 커지면 토큰 단위 해시셋 검사로 바꿔야 합니다.

use std::collections::HashSet;

use logrelay_core::config::{DEFAULT_BLACKLIST_IPS, DEFAULT_BLACKLIST_USERS};
use logrelay_core::types::Record;

/// 사용자명·IP 블랙리스트
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blacklist {
    /// 소문자로 정규화된 사용자명
    users: HashSet<String>,
    /// IP 리터럴
    ips: Vec<String>,
}

impl Blacklist {
    /// 사용자명과 IP 목록으로 블랙리스트를 생성합니다. 빈 항목은 무시됩니다.
    pub fn new<U, I>(users: U, ips: I) -> Self
    where
        U: IntoIterator,
        U::Item: AsRef<str>,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self {
            users: users
                .into_iter()
                .map(|u| u.as_ref().trim().to_lowercase())
                .filter(|u| !u.is_empty())
                .collect(),
            ips: ips
                .into_iter()
                .map(|ip| ip.as_ref().trim().to_owned())
                .filter(|ip| !ip.is_empty())
                .collect(),
        }
    }

    /// 빈 블랙리스트 (아무것도 표시하지 않음)
    pub fn empty() -> Self {
        Self {
            users: HashSet::new(),
            ips: Vec::new(),
        }
    }

    /// 사용자명이 블랙리스트에 있는지 확인합니다 (대소문자 무시).
    pub fn contains_user(&self, username: &str) -> bool {
        self.users.contains(&username.to_lowercase())
    }

    /// 텍스트에 블랙리스트 IP가 부분 문자열로 포함되어 있는지 확인합니다.
    pub fn mentions_ip(&self, text: &str) -> bool {
        self.ips.iter().any(|ip| text.contains(ip.as_str()))
    }

    /// 레코드의 블랙리스트 여부를 판정합니다.
    ///
    /// 이미 표시된 레코드는 그대로 유지되며, 사용자명 검사가 IP 검사보다 먼저입니다.
    pub fn flags(&self, record: &Record) -> bool {
        if record.blacklisted {
            return true;
        }
        if let Some(username) = record.username.as_deref()
            && self.contains_user(username)
        {
            return true;
        }
        self.mentions_ip(&record.raw_message)
    }
}

impl Default for Blacklist {
    fn default() -> Self {
        Self::new(DEFAULT_BLACKLIST_USERS, DEFAULT_BLACKLIST_IPS)
    }
}
