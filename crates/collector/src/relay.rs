//! 중앙 노드 릴레이
//!
//! [`Relay`]는 레코드 한 건을 중앙 노드로 전달하는 전송 계층입니다.
//! 운영 구현은 [`HttpRelay`](JSON 본문 POST, 고정 요청 타임아웃)이며,
//! 테스트는 프로세스 내 구현으로 교체합니다.

use std::future::Future;
use std::time::Duration;

use logrelay_core::types::Record;

use crate::error::CollectorError;

/// 레코드 전송 trait
///
/// 성공 응답(2xx) 이외의 모든 결과는 에러입니다.
pub trait Relay: Send + Sync + 'static {
    /// 레코드 한 건을 전달합니다.
    fn relay(&self, record: &Record) -> impl Future<Output = Result<(), CollectorError>> + Send;
}

/// HTTP POST 릴레이
#[derive(Debug, Clone)]
pub struct HttpRelay {
    client: reqwest::Client,
    url: String,
}

impl HttpRelay {
    /// 요청 타임아웃이 설정된 HTTP 릴레이를 생성합니다.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, CollectorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollectorError::Relay(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// 대상 URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Relay for HttpRelay {
    async fn relay(&self, record: &Record) -> Result<(), CollectorError> {
        let response = self
            .client
            .post(&self.url)
            .json(record)
            .send()
            .await
            .map_err(|e| CollectorError::Relay(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectorError::RelayStatus {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
