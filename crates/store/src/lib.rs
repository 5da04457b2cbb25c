#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`memory`]: 인메모리 스토어 (`RwLock` 기반 단일 writer / 다중 reader)
//! - [`file`]: 백킹 로그를 가진 내구성 스토어 래퍼
//! - [`query`]: 조회 필터와 정렬·제한 로직
//! - [`error`]: 도메인 에러 타입

pub mod error;
pub mod file;
pub mod memory;
pub mod query;

use std::future::Future;

use logrelay_core::pipeline::BoxFuture;
use logrelay_core::types::{CounterSnapshot, Record};

// --- 주요 타입 re-export ---

pub use error::StoreError;
pub use file::FileBackedStore;
pub use memory::InMemoryStore;
pub use query::QueryFilter;

/// 레코드 저장소 trait
///
/// 구현체는 레코드를 추가만 하며, 수정하거나 삭제하지 않습니다.
/// `ingest`는 배타적으로, `query`와 `metrics`는 공유 모드로 상태에 접근합니다.
pub trait LogStore: Send + Sync {
    /// 백엔드 이름 (memory, file)
    fn backend(&self) -> &'static str;

    /// 레코드 한 건을 저장합니다.
    fn ingest(&self, record: Record) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// 필터에 일치하는 레코드를 반환합니다. 실패하지 않습니다.
    fn query(&self, filter: &QueryFilter) -> impl Future<Output = Vec<Record>> + Send;

    /// 집계 카운터의 복사본을 반환합니다.
    fn metrics(&self) -> impl Future<Output = CounterSnapshot> + Send;

    /// 저장된 레코드 수를 반환합니다.
    fn len(&self) -> impl Future<Output = usize> + Send;
}

/// dyn-compatible 스토어 trait
///
/// `LogStore`는 RPITIT를 사용하므로 `dyn LogStore`가 불가합니다.
/// HTTP 핸들러 상태처럼 백엔드를 런타임에 고르는 곳에서는
/// `Arc<dyn DynLogStore>`를 사용합니다.
pub trait DynLogStore: Send + Sync {
    fn backend(&self) -> &'static str;

    fn ingest(&self, record: Record) -> BoxFuture<'_, Result<(), StoreError>>;

    fn query<'a>(&'a self, filter: &'a QueryFilter) -> BoxFuture<'a, Vec<Record>>;

    fn metrics(&self) -> BoxFuture<'_, CounterSnapshot>;

    fn len(&self) -> BoxFuture<'_, usize>;
}

impl<T: LogStore> DynLogStore for T {
    fn backend(&self) -> &'static str {
        LogStore::backend(self)
    }

    fn ingest(&self, record: Record) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(LogStore::ingest(self, record))
    }

    fn query<'a>(&'a self, filter: &'a QueryFilter) -> BoxFuture<'a, Vec<Record>> {
        Box::pin(LogStore::query(self, filter))
    }

    fn metrics(&self) -> BoxFuture<'_, CounterSnapshot> {
        Box::pin(LogStore::metrics(self))
    }

    fn len(&self) -> BoxFuture<'_, usize> {
        Box::pin(LogStore::len(self))
    }
}
