//! 수집 노드 자체 관측용 카운터
//!
//! 중앙 스토어의 집계와는 별개로, 워커가 릴레이 직전에 갱신합니다.
//! 집계 맵은 `RwLock` 아래에 두고, 단순 증가 카운터는 원자 변수로 유지합니다.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use logrelay_core::types::{CounterTally, Record};

/// 수집 노드 카운터
#[derive(Debug, Default)]
pub struct CollectorCounters {
    tally: RwLock<CounterTally>,
    relayed: AtomicU64,
    relay_failures: AtomicU64,
    decode_errors: AtomicU64,
    dropped: AtomicU64,
}

impl CollectorCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// 파싱된 레코드를 집계에 반영합니다.
    pub async fn record(&self, record: &Record) {
        self.tally.write().await.record(record);
    }

    pub fn record_relayed(&self) {
        self.relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_relay_failure(&self) {
        self.relay_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// 현재 값의 복사본을 반환합니다.
    pub async fn snapshot(&self) -> CollectorSnapshot {
        let tally = self.tally.read().await.snapshot();
        CollectorSnapshot {
            total: tally.total,
            by_category: tally.by_category,
            by_severity: tally.by_severity,
            relayed: self.relayed.load(Ordering::Relaxed),
            relay_failures: self.relay_failures.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// 수집 노드 `/metrics` 응답 형태
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorSnapshot {
    /// 파싱된 레코드 수
    pub total: u64,
    /// 소문자 카테고리별 건수
    pub by_category: BTreeMap<String, u64>,
    /// 대문자 심각도별 건수
    pub by_severity: BTreeMap<String, u64>,
    /// 릴레이 성공 수
    pub relayed: u64,
    /// 릴레이 최종 실패 수
    pub relay_failures: u64,
    /// 디코딩 실패 수
    pub decode_errors: u64,
    /// 큐 초과로 버려진 수
    pub dropped: u64,
}
