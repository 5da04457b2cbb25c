//! 수집 노드 에러 타입
//!
//! [`CollectorError`]는 수집 노드 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<CollectorError> for LogRelayError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use logrelay_core::error::{ConfigError, LogRelayError, PipelineError};

/// 수집 노드 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// 수신 라인 디코딩 실패
    #[error("decode error: {0}")]
    Decode(String),

    /// 프론트엔드 에러 (바인드, 수락, 읽기)
    #[error("frontend error: {addr}: {reason}")]
    Frontend {
        /// 관련 주소 (리스너 또는 피어)
        addr: String,
        /// 에러 사유
        reason: String,
    },

    /// 릴레이 전송 실패 (타임아웃, 연결 실패 등)
    #[error("relay error: {0}")]
    Relay(String),

    /// 중앙 노드가 성공이 아닌 응답을 반환
    #[error("relay rejected with status {status}")]
    RelayStatus {
        /// HTTP 상태 코드
        status: u16,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<CollectorError> for LogRelayError {
    fn from(err: CollectorError) -> Self {
        match err {
            CollectorError::Config { field, reason } => {
                LogRelayError::Config(ConfigError::InvalidValue { field, reason })
            }
            CollectorError::Channel(reason) => {
                LogRelayError::Pipeline(PipelineError::ChannelSend(reason))
            }
            other => LogRelayError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_status_display() {
        let err = CollectorError::RelayStatus { status: 503 };
        assert_eq!(err.to_string(), "relay rejected with status 503");
    }

    #[test]
    fn frontend_error_display() {
        let err = CollectorError::Frontend {
            addr: "0.0.0.0:9000".to_owned(),
            reason: "address in use".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("0.0.0.0:9000"));
        assert!(msg.contains("address in use"));
    }

    #[test]
    fn config_error_converts_to_config() {
        let err: LogRelayError = CollectorError::Config {
            field: "workers".to_owned(),
            reason: "must be greater than 0".to_owned(),
        }
        .into();
        assert!(matches!(err, LogRelayError::Config(_)));
    }

    #[test]
    fn runtime_errors_convert_to_pipeline() {
        let err: LogRelayError = CollectorError::Relay("timeout".to_owned()).into();
        assert!(matches!(err, LogRelayError::Pipeline(_)));
    }
}
