//! 스토어 통합 테스트
//!
//! - 재시작(재생) 후 조회·집계 결과 동일성
//! - 동시 ingest 시 카운터 정합성
//! - `DynLogStore`를 통한 백엔드 교체

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use logrelay_core::types::{Record, Severity};
use logrelay_store::{FileBackedStore, InMemoryStore, LogStore, QueryFilter};
use proptest::prelude::*;

fn record(i: i64, username: Option<&str>, code: u64) -> Record {
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let category = if i % 2 == 0 { "login.audit" } else { "logout.audit" };
    let mut record = Record::new(
        base + Duration::seconds(1000 - i),
        "linux",
        category,
        format!("<{code}> host{i} sshd: event {i}"),
    )
    .with_hostname(format!("host{i}"))
    .with_severity(Severity::from_code(code));
    if let Some(name) = username {
        record = record
            .with_username(name)
            .with_blacklisted(name == "root");
    }
    record
}

#[tokio::test]
async fn restart_reproduces_query_and_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs.jsonl");

    let filters = [
        QueryFilter::new(),
        QueryFilter::new().sort("timestamp"),
        QueryFilter::new().service("linux_login_audit").limit(3),
        QueryFilter::new().username("ROOT"),
        QueryFilter::new().blacklisted(false).level("warn"),
    ];

    let (before_results, before_metrics) = {
        let store = FileBackedStore::open(&path).await.unwrap();
        for i in 0..20 {
            let user = match i % 3 {
                0 => Some("root"),
                1 => Some("alice"),
                _ => None,
            };
            store.ingest(record(i, user, (i % 8) as u64)).await.unwrap();
        }
        let mut results = Vec::new();
        for filter in &filters {
            results.push(store.query(filter).await);
        }
        (results, store.metrics().await)
    };

    let reopened = FileBackedStore::open(&path).await.unwrap();
    for (filter, expected) in filters.iter().zip(&before_results) {
        assert_eq!(&reopened.query(filter).await, expected, "filter {filter:?}");
    }
    assert_eq!(reopened.metrics().await, before_metrics);
    assert_eq!(reopened.len().await, 20);
}

#[tokio::test]
async fn appends_after_restart_extend_the_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs.jsonl");

    {
        let store = FileBackedStore::open(&path).await.unwrap();
        store.ingest(record(1, None, 6)).await.unwrap();
    }
    {
        let store = FileBackedStore::open(&path).await.unwrap();
        store.ingest(record(2, None, 2)).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    let store = FileBackedStore::open(&path).await.unwrap();
    let metrics = store.metrics().await;
    assert_eq!(metrics.total, 2);
    assert_eq!(metrics.by_severity.get("INFO"), Some(&1));
    assert_eq!(metrics.by_severity.get("ERROR"), Some(&1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_durable_ingest_is_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs.jsonl");
    let store = Arc::new(FileBackedStore::open(&path).await.unwrap());

    let mut handles = Vec::new();
    for producer in 0..4 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            for i in 0..25 {
                store
                    .ingest(record(producer * 100 + i, None, 4))
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(store.metrics().await.total, 100);
    drop(store);

    let content = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(content.lines().count(), 100);
    let reopened = FileBackedStore::open(&path).await.unwrap();
    assert_eq!(reopened.metrics().await.by_severity.get("WARN"), Some(&100));
}

#[tokio::test]
async fn dyn_store_dispatches_to_backend() {
    use logrelay_store::DynLogStore;

    let dir = tempfile::tempdir().unwrap();
    let stores: Vec<Arc<dyn DynLogStore>> = vec![
        Arc::new(InMemoryStore::new()),
        Arc::new(
            FileBackedStore::open(dir.path().join("logs.jsonl"))
                .await
                .unwrap(),
        ),
    ];

    for store in stores {
        store.ingest(record(1, Some("root"), 4)).await.unwrap();
        let filter = QueryFilter::new().blacklisted(true);
        let results = store.query(&filter).await;
        assert_eq!(results.len(), 1, "backend {}", store.backend());
        assert_eq!(store.len().await, 1);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn limit_and_sort_properties(count in 0usize..40, limit in 0usize..50) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let store = InMemoryStore::new();
            for i in 0..count {
                store.ingest(record(i as i64, None, 6)).await.unwrap();
            }
            let all = store.query(&QueryFilter::new()).await;
            prop_assert_eq!(all.len(), count);

            let sorted = store.query(&QueryFilter::new().sort("timestamp").limit(limit)).await;
            let expected_len = if limit == 0 { count } else { limit.min(count) };
            prop_assert_eq!(sorted.len(), expected_len);
            prop_assert!(sorted.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
            Ok::<(), TestCaseError>(())
        })?;
    }
}
