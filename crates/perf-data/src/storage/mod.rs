//! 적재 대상 웨어하우스.
//!
//! - `table`: 테이블 이름 검증
//! - `postgres`: PostgreSQL 구현 (스테이징 + MERGE)

pub mod postgres;
pub mod table;

use async_trait::async_trait;
use chrono::NaiveDate;
use perf_core::PriceRow;

use crate::Result;

/// 적재 대상 테이블 하나에 대한 저장소.
///
/// 한 실행 동안 같은 연결을 사용하므로 모든 메서드는 `&mut self`를 받습니다.
#[async_trait]
pub trait Warehouse: Send {
    /// 대상 테이블 이름.
    fn target(&self) -> String;

    /// 심볼의 마지막 적재 날짜 (`MAX(date_key)`).
    ///
    /// 적재된 행이 없으면 `None`.
    async fn max_loaded_date(&mut self, symbol_code: &str) -> Result<Option<NaiveDate>>;

    /// 행을 스테이징한 뒤 대상 테이블에 없는 (symbol_code, date_key)만 삽입합니다.
    ///
    /// 새로 삽입된 행 수를 반환합니다. 빈 입력은 DB 작업 없이 0입니다.
    async fn load(&mut self, rows: &[PriceRow]) -> Result<u64>;
}
