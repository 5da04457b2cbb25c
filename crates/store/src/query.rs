//! 조회 엔진: 필터, 정렬, 개수 제한
//!
//! [`QueryFilter::apply`]는 레코드 시퀀스를 한 번 순회하며 필터링하고,
//! 요청된 경우 타임스탬프 오름차순 안정 정렬 후 개수를 제한합니다.

use logrelay_core::types::Record;

/// 정렬 키 중 의미가 있는 유일한 값
pub const SORT_BY_TIMESTAMP: &str = "timestamp";

/// 요청 단위 조회 필터
///
/// 모든 필드는 선택 사항이며, `None` 또는 빈 문자열은 제약이 없음을 뜻합니다.
/// 문자열 비교는 대소문자를 구분하지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    /// 서비스 슬러그
    pub service: Option<String>,
    /// 심각도 (ERROR, WARN, INFO)
    pub level: Option<String>,
    /// 사용자명
    pub username: Option<String>,
    /// 블랙리스트 여부
    pub is_blacklisted: Option<bool>,
    /// 최대 결과 수 (0 또는 `None`이면 무제한)
    pub limit: Option<usize>,
    /// 정렬 키 (`"timestamp"`만 의미 있음, 그 외 값은 무시)
    pub sort: Option<String>,
}

impl QueryFilter {
    /// 제약 없는 필터를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn blacklisted(mut self, blacklisted: bool) -> Self {
        self.is_blacklisted = Some(blacklisted);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort(mut self, key: impl Into<String>) -> Self {
        self.sort = Some(key.into());
        self
    }

    /// 레코드가 지정된 모든 조건을 만족하는지 확인합니다.
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(service) = constraint(&self.service)
            && !record.service.eq_ignore_ascii_case(service)
        {
            return false;
        }
        if let Some(level) = constraint(&self.level) {
            let severity = record.severity.map_or("", |s| s.as_str());
            if !severity.eq_ignore_ascii_case(level) {
                return false;
            }
        }
        if let Some(username) = constraint(&self.username) {
            let actual = record.username.as_deref().unwrap_or("");
            if !actual.eq_ignore_ascii_case(username) {
                return false;
            }
        }
        if let Some(flag) = self.is_blacklisted
            && record.blacklisted != flag
        {
            return false;
        }
        true
    }

    /// 타임스탬프 정렬이 요청되었는지 확인합니다.
    pub fn sorts_by_timestamp(&self) -> bool {
        self.sort
            .as_deref()
            .is_some_and(|key| key.eq_ignore_ascii_case(SORT_BY_TIMESTAMP))
    }

    /// 양수 limit만 유효합니다.
    fn effective_limit(&self) -> Option<usize> {
        self.limit.filter(|&n| n > 0)
    }

    /// 레코드 시퀀스에 필터를 적용한 결과를 반환합니다.
    ///
    /// 아무것도 일치하지 않으면 빈 벡터를 반환합니다.
    pub fn apply<'a, I>(&self, records: I) -> Vec<Record>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut results: Vec<Record> = records
            .into_iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect();

        if self.sorts_by_timestamp() {
            // sort_by는 안정 정렬
            results.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        }

        if let Some(limit) = self.effective_limit() {
            results.truncate(limit);
        }
        results
    }
}

fn constraint(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
