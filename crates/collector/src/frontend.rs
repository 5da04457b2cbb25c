//! TCP 프론트엔드: 개행 구분 JSON 봉투 수신
//!
//! 연결마다 별도 태스크에서 한 줄씩 읽어 [`RawEnvelope`]로 디코딩한 뒤 작업 큐에 넣습니다.
//! 한 연결 안에서의 순서는 큐 투입 순서로 보존됩니다.
//!
//! # 에러 처리
//! - 디코딩 실패 또는 최대 크기 초과 라인: 경고 후 해당 라인만 버리고 계속 읽음
//! - 읽기 I/O 에러: 해당 연결만 종료
//! - 수락 에러: 경고 후 잠시 대기하고 수락 루프 계속

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use logrelay_core::metrics as m;
use logrelay_core::types::RawEnvelope;

use crate::config::OverflowPolicy;
use crate::counters::CollectorCounters;
use crate::error::CollectorError;

/// 수락 에러 후 재시도 전 대기 시간
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// 연결 핸들러가 공유하는 상태
#[derive(Clone)]
pub struct ConnectionContext {
    /// 작업 큐 송신측
    pub tx: mpsc::Sender<RawEnvelope>,
    pub counters: Arc<CollectorCounters>,
    /// 한 줄 최대 크기 (바이트, 개행 제외)
    pub max_message_size: usize,
    pub overflow_policy: OverflowPolicy,
    pub cancel: CancellationToken,
}

/// TCP 수락 루프
pub struct TcpFrontend {
    listener: TcpListener,
    local_addr: SocketAddr,
    ctx: ConnectionContext,
}

impl TcpFrontend {
    /// 주소에 바인드합니다. 바인드 실패는 `Frontend` 에러입니다.
    pub async fn bind(addr: &str, ctx: ConnectionContext) -> Result<Self, CollectorError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| CollectorError::Frontend {
                addr: addr.to_owned(),
                reason: format!("failed to bind: {e}"),
            })?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "collector frontend listening");

        Ok(Self {
            listener,
            local_addr,
            ctx,
        })
    }

    /// 실제 바인드된 주소 (포트 0 바인드 시 유용)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 취소될 때까지 연결을 수락합니다.
    pub async fn run(self) {
        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            debug!(%peer, "accepted connection");
                            let ctx = self.ctx.clone();
                            tokio::spawn(async move {
                                metrics::gauge!(m::COLLECTOR_ACTIVE_CONNECTIONS).increment(1.0);
                                if let Err(e) = handle_connection(stream, peer, ctx).await {
                                    warn!(%peer, error = %e, "connection closed with error");
                                }
                                metrics::gauge!(m::COLLECTOR_ACTIVE_CONNECTIONS).decrement(1.0);
                            });
                        }
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                        }
                    }
                }
                _ = self.ctx.cancel.cancelled() => {
                    info!(addr = %self.local_addr, "collector frontend shutting down");
                    break;
                }
            }
        }
    }
}

/// 단일 연결을 EOF, I/O 에러, 취소 중 하나가 일어날 때까지 처리합니다.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    ctx: ConnectionContext,
) -> Result<(), CollectorError> {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let line = tokio::select! {
            result = read_line_limited(&mut reader, &mut buf, ctx.max_message_size) => result?,
            _ = ctx.cancel.cancelled() => {
                debug!(%peer, "connection cancelled");
                return Ok(());
            }
        };

        match line {
            Line::Eof => {
                debug!(%peer, "connection closed by peer");
                return Ok(());
            }
            Line::Oversized => {
                warn!(%peer, max = ctx.max_message_size, "line exceeds max message size, dropped");
                ctx.counters.record_decode_error();
                metrics::counter!(m::COLLECTOR_DECODE_ERRORS_TOTAL).increment(1);
            }
            Line::Complete => {
                let content = trim_line(&buf);
                if content.is_empty() {
                    continue;
                }
                metrics::counter!(m::COLLECTOR_MESSAGES_RECEIVED_TOTAL).increment(1);
                match decode_envelope(content) {
                    Ok(envelope) => enqueue(&ctx, peer, envelope).await?,
                    Err(e) => {
                        warn!(%peer, error = %e, "failed to decode envelope");
                        ctx.counters.record_decode_error();
                        metrics::counter!(m::COLLECTOR_DECODE_ERRORS_TOTAL).increment(1);
                    }
                }
            }
        }
    }
}

/// 한 줄 읽기 결과
#[derive(Debug, PartialEq, Eq)]
enum Line {
    /// 버퍼에 한 줄이 채워짐 (마지막 줄은 개행이 없을 수 있음)
    Complete,
    /// 최대 크기 초과, 나머지는 이미 버려짐
    Oversized,
    Eof,
}

/// 최대 `max`바이트까지만 버퍼링하며 한 줄을 읽습니다.
async fn read_line_limited<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max: usize,
) -> std::io::Result<Line>
where
    R: AsyncBufRead + Unpin,
{
    let limit = u64::try_from(max).unwrap_or(u64::MAX).saturating_add(1);
    let n = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
    if n == 0 {
        return Ok(Line::Eof);
    }

    let content_len = if buf.last() == Some(&b'\n') {
        buf.len() - 1
    } else {
        buf.len()
    };
    if content_len > max {
        if buf.last() != Some(&b'\n') {
            discard_line(reader).await?;
        }
        return Ok(Line::Oversized);
    }
    Ok(Line::Complete)
}

/// 다음 개행까지(개행 포함) 읽어 버립니다.
async fn discard_line<R>(reader: &mut R) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let (consumed, done) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|b| *b == b'\n') {
                Some(pos) => (pos + 1, true),
                None => (available.len(), false),
            }
        };
        reader.consume(consumed);
        if done {
            return Ok(());
        }
    }
}

/// 줄 끝의 `\n`, `\r\n`과 앞뒤 공백을 제거합니다.
fn trim_line(buf: &[u8]) -> &[u8] {
    buf.trim_ascii()
}

/// 한 줄을 봉투로 디코딩합니다.
pub fn decode_envelope(line: &[u8]) -> Result<RawEnvelope, CollectorError> {
    serde_json::from_slice(line).map_err(|e| CollectorError::Decode(e.to_string()))
}

/// 정책에 따라 봉투를 큐에 넣습니다.
///
/// `Block`에서 큐가 닫혔다면 `Channel` 에러로 연결을 종료합니다.
async fn enqueue(
    ctx: &ConnectionContext,
    peer: SocketAddr,
    envelope: RawEnvelope,
) -> Result<(), CollectorError> {
    match ctx.overflow_policy {
        OverflowPolicy::Block => {
            tokio::select! {
                result = ctx.tx.send(envelope) => {
                    result.map_err(|e| CollectorError::Channel(e.to_string()))?;
                }
                _ = ctx.cancel.cancelled() => return Ok(()),
            }
        }
        OverflowPolicy::DropNewest => match ctx.tx.try_send(envelope) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(%peer, "work queue full, envelope dropped");
                ctx.counters.record_dropped();
                metrics::counter!(m::COLLECTOR_QUEUE_DROPPED_TOTAL).increment(1);
            }
            Err(TrySendError::Closed(_)) => {
                return Err(CollectorError::Channel("work queue closed".to_owned()));
            }
        },
    }

    let depth = ctx.tx.max_capacity() - ctx.tx.capacity();
    metrics::gauge!(m::COLLECTOR_QUEUE_DEPTH).set(depth as f64);
    Ok(())
}
