//! 데이터 모듈 오류 타입.

use thiserror::Error;

/// 데이터 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 데이터베이스 연결 오류
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// 쿼리 실행 오류
    #[error("Query error: {0}")]
    QueryError(String),

    /// 데이터 가져오기 오류 (외부 소스)
    #[error("Fetch error: {0}")]
    FetchError(String),

    /// 요청 한도 초과
    #[error("Rate limited by data source (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    /// 데이터 소스에 없는 심볼
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// 응답 파싱 오류
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 잘못된 데이터 형식
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// 설정 오류
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// 스테이징 테이블 적재 오류
    #[error("Staging error: {0}")]
    StagingError(String),

    /// 대상 테이블 병합 오류
    #[error("Merge error: {0}")]
    MergeError(String),
}

impl DataError {
    /// 재시도하면 성공할 수 있는 오류인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DataError::FetchError(_) | DataError::RateLimited { .. }
        )
    }

    /// 서버가 요청한 최소 대기 시간 (rate limit일 때만).
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            DataError::RateLimited { retry_after_secs } => {
                Some(std::time::Duration::from_secs(*retry_after_secs))
            }
            _ => None,
        }
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => DataError::QueryError(db_err.message().to_string()),
            sqlx::Error::Io(e) => DataError::ConnectionError(e.to_string()),
            sqlx::Error::Tls(e) => DataError::ConnectionError(e.to_string()),
            sqlx::Error::PoolTimedOut => DataError::ConnectionError("pool timed out".to_string()),
            _ => DataError::QueryError(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DataError::ParseError(err.to_string())
        } else {
            DataError::FetchError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::ParseError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
