//! 가격 데이터 소스와 웨어하우스 저장소.
//!
//! 이 crate는 다음을 제공합니다:
//! - 일별 종가 데이터 소스 (`PriceSource`, Yahoo Finance 구현)
//! - 재시도 정책 (`RetryPolicy`)
//! - 적재 대상 웨어하우스 (`Warehouse`, PostgreSQL 구현)
//!   - 심볼별 워터마크 조회
//!   - 스테이징 테이블 적재 + 삽입 전용 MERGE

pub mod error;
pub mod provider;
pub mod storage;

pub use error::{DataError, Result};

// 데이터 소스 재내보내기
pub use provider::retry::RetryPolicy;
pub use provider::yahoo::YahooPriceSource;
pub use provider::PriceSource;

// 저장소 재내보내기
pub use storage::postgres::PgWarehouse;
pub use storage::table::TableName;
pub use storage::Warehouse;
