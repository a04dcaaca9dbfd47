//! 일별 종가 데이터 소스.

pub mod retry;
pub mod yahoo;

use async_trait::async_trait;
use chrono::NaiveDate;
use perf_core::PriceSeries;

use crate::Result;

/// 일별 종가 데이터 소스 trait.
///
/// 적재 파이프라인은 이 trait만 사용하므로, 데이터 소스를 바꾸거나
/// 테스트에서 가짜 구현을 주입할 수 있습니다.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// 데이터 소스 이름 (로그용).
    fn name(&self) -> &str;

    /// `[start, end]` 구간(양 끝 포함)의 일별 종가를 조회합니다.
    ///
    /// 구간에 거래일이 없으면 빈 시계열을 반환합니다 (에러 아님).
    ///
    /// # Errors
    ///
    /// - `DataError::FetchError`: 네트워크 실패, 서버 오류
    /// - `DataError::SymbolNotFound`: 데이터 소스에 없는 심볼
    /// - `DataError::ParseError`: 응답 형식 오류
    async fn fetch_closes(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<PriceSeries>;
}
