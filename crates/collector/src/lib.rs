#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`frontend`]: TCP 수락 루프와 개행 구분 JSON 봉투 디코딩
//! - [`worker`]: 공유 작업 큐를 비우는 워커 풀
//! - [`parser`]: `<code> host component: body` 메시지 파싱과 레코드 생성
//! - [`enrich`]: 사용자명·IP 블랙리스트 판정
//! - [`relay`]: 중앙 노드로의 레코드 전달 (HTTP POST)
//! - [`counters`]: 수집 노드 자체 집계
//! - [`pipeline`]: 전체 생명주기 오케스트레이션 (Pipeline trait 구현)
//! - [`config`]: 수집 노드 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입

pub mod config;
pub mod counters;
pub mod enrich;
pub mod error;
pub mod frontend;
pub mod parser;
pub mod pipeline;
pub mod relay;
pub mod worker;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::{CollectorPipeline, CollectorPipelineBuilder};

// 설정
pub use config::{CollectorConfig, CollectorConfigBuilder, OverflowPolicy, RelayPolicy};

// 에러
pub use error::CollectorError;

// 파서 / 보강
pub use enrich::Blacklist;
pub use parser::EventParser;

// 릴레이
pub use relay::{HttpRelay, Relay};

// 카운터
pub use counters::{CollectorCounters, CollectorSnapshot};
