//! 에러 타입 정의.

use perf_core::CoreError;
use perf_data::DataError;
use std::fmt;

/// Collector 에러 타입
#[derive(Debug)]
pub enum CollectorError {
    /// 데이터 소스/웨어하우스 에러
    Data(DataError),
    /// 설정 에러
    Config(String),
    /// 일반 에러
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(e) => write!(f, "{}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for CollectorError {}

impl From<DataError> for CollectorError {
    fn from(err: DataError) -> Self {
        Self::Data(err)
    }
}

impl From<CoreError> for CollectorError {
    fn from(err: CoreError) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<serde_json::Error> for CollectorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
