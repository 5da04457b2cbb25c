//! 인메모리 스토어
//!
//! 레코드 시퀀스와 집계 카운터를 하나의 `RwLock` 아래에 두어,
//! `metrics()`가 부분적으로 갱신된 상태를 관찰하지 않도록 합니다.

use tokio::sync::RwLock;

use logrelay_core::types::{CounterSnapshot, CounterTally, Record};

use crate::LogStore;
use crate::error::StoreError;
use crate::query::QueryFilter;

/// 초기 레코드 벡터 용량
const INITIAL_CAPACITY: usize = 1024;

#[derive(Debug)]
struct StoreState {
    records: Vec<Record>,
    tally: CounterTally,
}

/// 인메모리 레코드 스토어
#[derive(Debug)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState {
                records: Vec::with_capacity(INITIAL_CAPACITY),
                tally: CounterTally::new(),
            }),
        }
    }

    /// 레코드를 추가하고 카운터를 갱신합니다. 실패하지 않습니다.
    pub async fn append(&self, record: Record) {
        let mut state = self.state.write().await;
        state.tally.record(&record);
        state.records.push(record);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LogStore for InMemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ingest(&self, record: Record) -> Result<(), StoreError> {
        self.append(record).await;
        Ok(())
    }

    async fn query(&self, filter: &QueryFilter) -> Vec<Record> {
        let state = self.state.read().await;
        filter.apply(&state.records)
    }

    async fn metrics(&self) -> CounterSnapshot {
        self.state.read().await.tally.snapshot()
    }

    async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};
    use logrelay_core::types::Severity;

    use super::*;

    #[tokio::test]
    async fn ingest_updates_counters() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store
            .ingest(Record::new(now, "linux", "Login.Audit", "a").with_severity(Severity::Warn))
            .await
            .unwrap();
        store
            .ingest(Record::new(now, "linux", "", "b"))
            .await
            .unwrap();

        let metrics = store.metrics().await;
        assert_eq!(metrics.total, 2);
        assert_eq!(metrics.by_category.get("login.audit"), Some(&1));
        assert_eq!(metrics.by_category.len(), 1);
        assert_eq!(metrics.by_severity.get("WARN"), Some(&1));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn query_filters_by_service() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store
            .ingest(Record::new(now, "linux", "login.audit", "login"))
            .await
            .unwrap();
        store
            .ingest(Record::new(now, "linux", "logout.audit", "logout"))
            .await
            .unwrap();

        let results = store
            .query(&QueryFilter::new().service("linux_login_audit"))
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].raw_message, "login");
    }

    #[tokio::test]
    async fn sorted_limited_query() {
        let store = InMemoryStore::new();
        let base = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        for i in 0..5 {
            store
                .ingest(Record::new(
                    base + Duration::seconds(i),
                    "linux",
                    "login.audit",
                    format!("m{i}"),
                ))
                .await
                .unwrap();
        }

        let results = store
            .query(&QueryFilter::new().sort("timestamp").limit(3))
            .await;
        assert_eq!(results.len(), 3);
        assert!(results.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(results[0].raw_message, "m0");
    }

    #[tokio::test]
    async fn metrics_is_a_copy() {
        let store = InMemoryStore::new();
        store
            .ingest(Record::new(Utc::now(), "linux", "login.audit", "a"))
            .await
            .unwrap();
        let before = store.metrics().await;
        store
            .ingest(Record::new(Utc::now(), "linux", "login.audit", "b"))
            .await
            .unwrap();
        assert_eq!(before.total, 1);
        assert_eq!(store.metrics().await.total, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_ingest_loses_no_updates() {
        let store = Arc::new(InMemoryStore::new());
        let mut handles = Vec::new();
        for producer in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for i in 0..100 {
                    let severity = Severity::from_code(i % 8);
                    store
                        .ingest(
                            Record::new(Utc::now(), "linux", "login.audit", format!("{producer}-{i}"))
                                .with_severity(severity),
                        )
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let metrics = store.metrics().await;
        assert_eq!(metrics.total, 800);
        assert_eq!(store.len().await, 800);
        assert_eq!(metrics.by_category.get("login.audit"), Some(&800));
        assert_eq!(metrics.by_severity.values().sum::<u64>(), 800);
    }
}
