//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logrelay_`
//! - 역할명: `collector_`, `server_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(logrelay_core::metrics::COLLECTOR_RECORDS_RELAYED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 심각도 레이블 키 (ERROR, WARN, INFO)
pub const LABEL_SEVERITY: &str = "severity";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 스토어 백엔드 레이블 키 (memory, file)
pub const LABEL_BACKEND: &str = "backend";

// ─── Collector 메트릭 ───────────────────────────────────────────────

/// Collector: 수신한 전체 메시지 라인 수 (counter)
pub const COLLECTOR_MESSAGES_RECEIVED_TOTAL: &str = "logrelay_collector_messages_received_total";

/// Collector: 디코딩 실패 수 (counter)
pub const COLLECTOR_DECODE_ERRORS_TOTAL: &str = "logrelay_collector_decode_errors_total";

/// Collector: 큐 초과로 드롭된 메시지 수 (counter)
pub const COLLECTOR_QUEUE_DROPPED_TOTAL: &str = "logrelay_collector_queue_dropped_total";

/// Collector: 릴레이 성공 수 (counter)
pub const COLLECTOR_RECORDS_RELAYED_TOTAL: &str = "logrelay_collector_records_relayed_total";

/// Collector: 릴레이 실패 수 (counter)
pub const COLLECTOR_RELAY_FAILURES_TOTAL: &str = "logrelay_collector_relay_failures_total";

/// Collector: 릴레이 지연 시간 (histogram, 초)
pub const COLLECTOR_RELAY_DURATION_SECONDS: &str = "logrelay_collector_relay_duration_seconds";

/// Collector: 활성 emitter 연결 수 (gauge)
pub const COLLECTOR_ACTIVE_CONNECTIONS: &str = "logrelay_collector_active_connections";

/// Collector: 큐에 대기 중인 메시지 수 (gauge)
pub const COLLECTOR_QUEUE_DEPTH: &str = "logrelay_collector_queue_depth";

// ─── Server 메트릭 ──────────────────────────────────────────────────

/// Server: 저장된 레코드 수 (counter)
pub const SERVER_RECORDS_INGESTED_TOTAL: &str = "logrelay_server_records_ingested_total";

/// Server: ingest 실패 수 (counter)
pub const SERVER_INGEST_FAILURES_TOTAL: &str = "logrelay_server_ingest_failures_total";

/// Server: 처리한 조회 요청 수 (counter)
pub const SERVER_QUERIES_TOTAL: &str = "logrelay_server_queries_total";

/// Server: 현재 저장된 레코드 수 (gauge, label: backend)
pub const SERVER_STORED_RECORDS: &str = "logrelay_server_stored_records";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 빌드 정보 (gauge, 항상 1, labels: version, role)
pub const DAEMON_BUILD_INFO: &str = "logrelay_daemon_build_info";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 릴레이 지연 시간 히스토그램 버킷 (초)
///
/// 1ms ~ 10s 범위 (기본 릴레이 타임아웃 5초 포함)
pub const RELAY_DURATION_BUCKETS: [f64; 9] = [0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `logrelay-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Collector
    describe_counter!(
        COLLECTOR_MESSAGES_RECEIVED_TOTAL,
        "Total number of message lines read from emitter connections"
    );
    describe_counter!(
        COLLECTOR_DECODE_ERRORS_TOTAL,
        "Total number of inbound lines that failed to decode"
    );
    describe_counter!(
        COLLECTOR_QUEUE_DROPPED_TOTAL,
        "Total number of envelopes dropped because the work queue was full"
    );
    describe_counter!(
        COLLECTOR_RECORDS_RELAYED_TOTAL,
        "Total number of records accepted by the central node"
    );
    describe_counter!(
        COLLECTOR_RELAY_FAILURES_TOTAL,
        "Total number of records discarded after relay failure"
    );
    describe_histogram!(
        COLLECTOR_RELAY_DURATION_SECONDS,
        "Time to relay a single record in seconds"
    );
    describe_gauge!(
        COLLECTOR_ACTIVE_CONNECTIONS,
        "Number of currently open emitter connections"
    );
    describe_gauge!(
        COLLECTOR_QUEUE_DEPTH,
        "Number of envelopes waiting in the work queue"
    );

    // Server
    describe_counter!(
        SERVER_RECORDS_INGESTED_TOTAL,
        "Total number of records accepted by the store"
    );
    describe_counter!(
        SERVER_INGEST_FAILURES_TOTAL,
        "Total number of ingest requests rejected by the store"
    );
    describe_counter!(SERVER_QUERIES_TOTAL, "Total number of log queries served");
    describe_gauge!(SERVER_STORED_RECORDS, "Number of records currently stored");

    // Daemon
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version/role labels)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        COLLECTOR_MESSAGES_RECEIVED_TOTAL,
        COLLECTOR_DECODE_ERRORS_TOTAL,
        COLLECTOR_QUEUE_DROPPED_TOTAL,
        COLLECTOR_RECORDS_RELAYED_TOTAL,
        COLLECTOR_RELAY_FAILURES_TOTAL,
        COLLECTOR_RELAY_DURATION_SECONDS,
        COLLECTOR_ACTIVE_CONNECTIONS,
        COLLECTOR_QUEUE_DEPTH,
        SERVER_RECORDS_INGESTED_TOTAL,
        SERVER_INGEST_FAILURES_TOTAL,
        SERVER_QUERIES_TOTAL,
        SERVER_STORED_RECORDS,
        DAEMON_BUILD_INFO,
    ];

    #[test]
    fn all_metrics_start_with_logrelay_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("logrelay_"),
                "Metric '{}' does not start with 'logrelay_' prefix",
                name
            );
        }
    }

    #[test]
    fn metric_names_are_unique() {
        let mut names = ALL_METRIC_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL_METRIC_NAMES.len());
    }

    #[test]
    fn counters_end_with_total() {
        let counters = [
            COLLECTOR_MESSAGES_RECEIVED_TOTAL,
            COLLECTOR_DECODE_ERRORS_TOTAL,
            COLLECTOR_QUEUE_DROPPED_TOTAL,
            COLLECTOR_RECORDS_RELAYED_TOTAL,
            COLLECTOR_RELAY_FAILURES_TOTAL,
            SERVER_RECORDS_INGESTED_TOTAL,
            SERVER_INGEST_FAILURES_TOTAL,
            SERVER_QUERIES_TOTAL,
        ];
        for name in counters {
            assert!(name.ends_with("_total"), "counter '{name}' lacks _total");
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        // 레코더 미설치 상태에서도 패닉하지 않아야 함
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_SEVERITY, LABEL_RESULT, LABEL_BACKEND] {
            assert_eq!(label.to_lowercase(), label);
        }
    }

    #[test]
    fn relay_duration_buckets_are_sorted() {
        for pair in RELAY_DURATION_BUCKETS.windows(2) {
            assert!(pair[1] > pair[0], "Bucket values must be in ascending order");
        }
    }
}
