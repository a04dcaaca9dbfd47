//! 도메인 타입 에러.

use thiserror::Error;

/// 핵심 도메인 에러.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// 알 수 없는 리샘플링 주기
    #[error("알 수 없는 주기: {0}")]
    InvalidFrequency(String),

    /// 잘못된 심볼
    #[error("잘못된 심볼: {0:?}")]
    InvalidSymbol(String),
}

/// 도메인 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;
