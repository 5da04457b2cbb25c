//! 수집 파이프라인: 프론트엔드, 작업 큐, 워커 풀의 생명주기 관리
//!
//! # 처리 흐름
//! ```text
//! TCP 연결 --line--> decode --> bounded queue --> worker N --> parse/enrich --> Relay
//! ```
//!
//! [`CollectorPipeline`]은 core의 [`Pipeline`] trait을 구현하여
//! 데몬에서 start/stop/health_check로 관리됩니다.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use logrelay_core::error::{LogRelayError, PipelineError};
use logrelay_core::pipeline::{HealthStatus, Pipeline};
use logrelay_core::types::RawEnvelope;

use crate::config::CollectorConfig;
use crate::counters::{CollectorCounters, CollectorSnapshot};
use crate::enrich::Blacklist;
use crate::error::CollectorError;
use crate::frontend::{ConnectionContext, TcpFrontend};
use crate::parser::EventParser;
use crate::relay::{HttpRelay, Relay};
use crate::worker::{SharedQueue, WorkerContext, run_worker};

/// 큐 사용률이 이 값을 넘으면 Degraded
const DEGRADED_UTILIZATION: f64 = 0.9;

/// 파이프라인 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    Initialized,
    Running,
    Stopped,
}

/// 수집 파이프라인
pub struct CollectorPipeline<R: Relay> {
    config: CollectorConfig,
    state: PipelineState,
    parser: Arc<EventParser>,
    relay: Arc<R>,
    counters: Arc<CollectorCounters>,
    cancel: CancellationToken,
    local_addr: Option<SocketAddr>,
    /// 사용률 측정용 송신측, 정지 시 해제되어 워커가 드레인 후 종료
    queue_tx: Option<mpsc::Sender<RawEnvelope>>,
    frontend: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl<R: Relay> CollectorPipeline<R> {
    /// 현재 상태 이름
    pub fn state_name(&self) -> &str {
        match self.state {
            PipelineState::Initialized => "initialized",
            PipelineState::Running => "running",
            PipelineState::Stopped => "stopped",
        }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// 공유 카운터 핸들
    pub fn counters(&self) -> Arc<CollectorCounters> {
        Arc::clone(&self.counters)
    }

    /// 카운터 스냅샷
    pub async fn snapshot(&self) -> CollectorSnapshot {
        self.counters.snapshot().await
    }

    /// 실행 중일 때 실제 바인드된 주소
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// 작업 큐 사용률 (0.0 ~ 1.0). 실행 중이 아니면 0입니다.
    pub fn queue_utilization(&self) -> f64 {
        match &self.queue_tx {
            Some(tx) => {
                let max = tx.max_capacity() as f64;
                1.0 - tx.capacity() as f64 / max
            }
            None => 0.0,
        }
    }
}

impl CollectorPipeline<HttpRelay> {
    /// 설정의 릴레이 URL과 타임아웃으로 HTTP 릴레이 파이프라인을 생성합니다.
    pub fn from_config(config: CollectorConfig) -> Result<Self, CollectorError> {
        let relay = HttpRelay::new(config.relay_url.clone(), config.relay_timeout())?;
        CollectorPipelineBuilder::new(relay).config(config).build()
    }
}

impl<R: Relay> Pipeline for CollectorPipeline<R> {
    async fn start(&mut self) -> Result<(), LogRelayError> {
        if self.state == PipelineState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        info!(
            listen_addr = %self.config.listen_addr,
            relay_url = %self.config.relay_url,
            workers = self.config.workers,
            queue_capacity = self.config.queue_capacity,
            overflow_policy = %self.config.overflow_policy,
            "starting collector pipeline"
        );

        // 재시작 시에도 새 토큰과 큐를 사용
        self.cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(self.config.queue_capacity);

        // 1. 프론트엔드 바인드 (실패 시 아무 태스크도 스폰하지 않음)
        let frontend = TcpFrontend::bind(
            &self.config.listen_addr,
            ConnectionContext {
                tx: tx.clone(),
                counters: Arc::clone(&self.counters),
                max_message_size: self.config.max_message_size,
                overflow_policy: self.config.overflow_policy,
                cancel: self.cancel.clone(),
            },
        )
        .await?;
        self.local_addr = Some(frontend.local_addr());

        // 2. 워커 풀 스폰
        let queue: SharedQueue = Arc::new(Mutex::new(rx));
        let ctx = WorkerContext {
            parser: Arc::clone(&self.parser),
            relay: Arc::clone(&self.relay),
            counters: Arc::clone(&self.counters),
            policy: self.config.relay_policy,
        };
        self.workers = (0..self.config.workers)
            .map(|id| tokio::spawn(run_worker(id, Arc::clone(&queue), ctx.clone())))
            .collect();

        // 3. 수락 루프 스폰
        self.frontend = Some(tokio::spawn(frontend.run()));
        self.queue_tx = Some(tx);

        self.state = PipelineState::Running;
        info!("collector pipeline started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), LogRelayError> {
        if self.state != PipelineState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        info!("stopping collector pipeline");

        // 1. 수락 루프와 연결 핸들러 중단
        self.cancel.cancel();
        if let Some(frontend) = self.frontend.take()
            && let Err(e) = frontend.await
        {
            warn!(error = %e, "frontend task ended abnormally");
        }

        // 2. 큐를 닫고 워커가 남은 봉투를 처리하도록 대기
        self.queue_tx = None;
        let deadline = tokio::time::Instant::now() + self.config.shutdown_timeout();
        let mut aborted = 0usize;
        for mut handle in self.workers.drain(..) {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "worker task ended abnormally"),
                Err(_) => {
                    handle.abort();
                    aborted += 1;
                }
            }
        }
        if aborted > 0 {
            warn!(aborted, "shutdown timeout elapsed, aborted remaining workers");
        }

        self.local_addr = None;
        self.state = PipelineState::Stopped;
        info!("collector pipeline stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            PipelineState::Running => {
                if self.frontend.as_ref().is_some_and(JoinHandle::is_finished) {
                    return HealthStatus::Unhealthy("frontend exited".to_owned());
                }
                let utilization = self.queue_utilization();
                if utilization > DEGRADED_UTILIZATION {
                    HealthStatus::Degraded(format!(
                        "queue utilization high: {:.1}%",
                        utilization * 100.0
                    ))
                } else {
                    HealthStatus::Healthy
                }
            }
            PipelineState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            PipelineState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 수집 파이프라인 빌더
pub struct CollectorPipelineBuilder<R: Relay> {
    relay: R,
    config: CollectorConfig,
    blacklist: Option<Blacklist>,
}

impl<R: Relay> CollectorPipelineBuilder<R> {
    /// 릴레이 구현으로 빌더를 생성합니다.
    pub fn new(relay: R) -> Self {
        Self {
            relay,
            config: CollectorConfig::default(),
            blacklist: None,
        }
    }

    /// 설정을 지정합니다.
    pub fn config(mut self, config: CollectorConfig) -> Self {
        self.config = config;
        self
    }

    /// 설정의 목록 대신 사용할 블랙리스트를 지정합니다.
    pub fn blacklist(mut self, blacklist: Blacklist) -> Self {
        self.blacklist = Some(blacklist);
        self
    }

    /// 설정을 검증하고 파이프라인을 생성합니다.
    pub fn build(self) -> Result<CollectorPipeline<R>, CollectorError> {
        self.config.validate()?;
        let blacklist = self
            .blacklist
            .unwrap_or_else(|| self.config.blacklist());
        let parser = EventParser::new(blacklist)?;

        Ok(CollectorPipeline {
            config: self.config,
            state: PipelineState::Initialized,
            parser: Arc::new(parser),
            relay: Arc::new(self.relay),
            counters: Arc::new(CollectorCounters::new()),
            cancel: CancellationToken::new(),
            local_addr: None,
            queue_tx: None,
            frontend: None,
            workers: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use logrelay_core::types::Record;

    use super::*;
    use crate::config::CollectorConfigBuilder;

    struct NullRelay;

    impl Relay for NullRelay {
        async fn relay(&self, _record: &Record) -> Result<(), CollectorError> {
            Ok(())
        }
    }

    fn test_config() -> CollectorConfig {
        CollectorConfigBuilder::new()
            .listen_addr("127.0.0.1:0")
            .workers(2)
            .queue_capacity(8)
            .shutdown_timeout_secs(1)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let config = CollectorConfig {
            workers: 0,
            ..CollectorConfig::default()
        };
        assert!(
            CollectorPipelineBuilder::new(NullRelay)
                .config(config)
                .build()
                .is_err()
        );
    }

    #[test]
    fn from_config_builds_http_pipeline() {
        let pipeline = CollectorPipeline::from_config(test_config()).unwrap();
        assert_eq!(pipeline.state_name(), "initialized");
        assert!(pipeline.local_addr().is_none());
    }

    #[tokio::test]
    async fn pipeline_lifecycle() {
        let mut pipeline = CollectorPipelineBuilder::new(NullRelay)
            .config(test_config())
            .build()
            .unwrap();
        assert!(pipeline.health_check().await.is_unhealthy());

        pipeline.start().await.unwrap();
        assert_eq!(pipeline.state_name(), "running");
        assert!(pipeline.local_addr().is_some());
        assert!(pipeline.health_check().await.is_healthy());
        assert!(matches!(
            pipeline.start().await,
            Err(LogRelayError::Pipeline(PipelineError::AlreadyRunning))
        ));

        pipeline.stop().await.unwrap();
        assert_eq!(pipeline.state_name(), "stopped");
        assert!(pipeline.health_check().await.is_unhealthy());
        assert!(matches!(
            pipeline.stop().await,
            Err(LogRelayError::Pipeline(PipelineError::NotRunning))
        ));
    }

    #[tokio::test]
    async fn pipeline_can_restart_after_stop() {
        let mut pipeline = CollectorPipelineBuilder::new(NullRelay)
            .config(test_config())
            .build()
            .unwrap();
        pipeline.start().await.unwrap();
        pipeline.stop().await.unwrap();
        pipeline.start().await.unwrap();
        assert!(pipeline.health_check().await.is_healthy());
        pipeline.stop().await.unwrap();
    }

    #[tokio::test]
    async fn start_fails_when_address_in_use() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = CollectorConfig {
            listen_addr: taken.local_addr().unwrap().to_string(),
            ..test_config()
        };
        let mut pipeline = CollectorPipelineBuilder::new(NullRelay)
            .config(config)
            .build()
            .unwrap();
        assert!(pipeline.start().await.is_err());
        assert_eq!(pipeline.state_name(), "initialized");
    }
}
