//! 워커 풀: 큐를 비우며 파싱·집계·릴레이를 수행합니다.
//!
//! 모든 워커는 하나의 bounded 큐 수신측을 `Mutex`로 공유합니다.
//! 큐가 닫히고 비워지면 워커는 종료됩니다.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

use logrelay_core::metrics as m;
use logrelay_core::types::RawEnvelope;

use crate::config::RelayPolicy;
use crate::counters::CollectorCounters;
use crate::parser::EventParser;
use crate::relay::Relay;

/// 워커들이 공유하는 큐 수신측
pub type SharedQueue = Arc<Mutex<mpsc::Receiver<RawEnvelope>>>;

/// 워커가 공유하는 처리 컨텍스트
pub struct WorkerContext<R> {
    pub parser: Arc<EventParser>,
    pub relay: Arc<R>,
    pub counters: Arc<CollectorCounters>,
    pub policy: RelayPolicy,
}

impl<R> Clone for WorkerContext<R> {
    fn clone(&self) -> Self {
        Self {
            parser: Arc::clone(&self.parser),
            relay: Arc::clone(&self.relay),
            counters: Arc::clone(&self.counters),
            policy: self.policy,
        }
    }
}

/// 큐가 닫힐 때까지 봉투를 처리합니다.
pub async fn run_worker<R: Relay>(id: usize, queue: SharedQueue, ctx: WorkerContext<R>) {
    debug!(worker = id, "worker started");
    loop {
        let next = queue.lock().await.recv().await;
        let Some(envelope) = next else {
            break;
        };
        process_envelope(id, &ctx, envelope).await;
    }
    debug!(worker = id, "worker exiting, queue closed");
}

/// 봉투 한 건을 처리합니다. 릴레이 성공 여부를 반환합니다.
///
/// 집계는 릴레이 이전에 갱신되므로 릴레이 실패 레코드도 `total`에 포함됩니다.
pub async fn process_envelope<R: Relay>(
    worker: usize,
    ctx: &WorkerContext<R>,
    envelope: RawEnvelope,
) -> bool {
    let record = ctx.parser.parse(envelope);
    ctx.counters.record(&record).await;

    let max_attempts = ctx.policy.max_attempts();
    for attempt in 1..=max_attempts {
        let started = Instant::now();
        let result = ctx.relay.relay(&record).await;
        metrics::histogram!(m::COLLECTOR_RELAY_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                ctx.counters.record_relayed();
                metrics::counter!(m::COLLECTOR_RECORDS_RELAYED_TOTAL).increment(1);
                return true;
            }
            Err(e) => {
                warn!(
                    worker,
                    attempt,
                    max_attempts,
                    service = %record.service,
                    error = %e,
                    "relay failed"
                );
            }
        }
    }

    ctx.counters.record_relay_failure();
    metrics::counter!(m::COLLECTOR_RELAY_FAILURES_TOTAL).increment(1);
    false
}
