//! 스토어 에러 타입
//!
//! [`StoreError`]는 `From<StoreError> for LogRelayError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.

use logrelay_core::error::{LogRelayError, StorageError};

/// 스토어 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 백킹 로그 I/O 실패 (생성, 추가, 동기화)
    #[error("backing log io error: {0}")]
    Io(#[from] std::io::Error),

    /// 레코드 직렬화 실패
    #[error("record encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// 재생 중 디코딩 실패
    #[error("replay failed at line {line}: {reason}")]
    Replay {
        /// 1부터 시작하는 줄 번호
        line: usize,
        /// 실패 사유
        reason: String,
    },
}

impl From<StoreError> for LogRelayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Replay { .. } => {
                LogRelayError::Storage(StorageError::Replay(err.to_string()))
            }
            other => LogRelayError::Storage(StorageError::BackingLog(other.to_string())),
        }
    }
}
