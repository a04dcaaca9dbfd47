//! 심볼별 워터마크 조회와 다음 조회 시작일 계산.
//!
//! 워터마크는 대상 테이블에서 심볼의 `MAX(date_key)`입니다.

use chrono::NaiveDate;
use perf_core::strip_index_marker;
use perf_data::{DataError, Warehouse};
use serde::Serialize;

/// 워터마크 판정 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkDecision {
    /// `start`부터 조회
    Fetch {
        start: NaiveDate,
        watermark: Option<NaiveDate>,
    },
    /// 새로 가져올 구간 없음
    Skip { watermark: Option<NaiveDate> },
}

/// 다음 조회 시작일.
///
/// 워터마크가 있으면 그 다음 날, 없으면 `full_history_start`.
/// 시작일이 `run_end`보다 늦으면 `None`.
pub fn next_fetch_start(
    watermark: Option<NaiveDate>,
    full_history_start: NaiveDate,
    run_end: NaiveDate,
) -> Option<NaiveDate> {
    let start = match watermark {
        Some(date) => date.succ_opt()?,
        None => full_history_start,
    };

    (start <= run_end).then_some(start)
}

/// 웨어하우스에서 워터마크를 조회해 조회 구간을 판정합니다.
pub async fn resolve<W>(
    warehouse: &mut W,
    symbol_code: &str,
    full_history_start: NaiveDate,
    run_end: NaiveDate,
) -> Result<WatermarkDecision, DataError>
where
    W: Warehouse + ?Sized,
{
    let watermark = warehouse.max_loaded_date(symbol_code).await?;

    Ok(match next_fetch_start(watermark, full_history_start, run_end) {
        Some(start) => WatermarkDecision::Fetch { start, watermark },
        None => WatermarkDecision::Skip { watermark },
    })
}

/// 워터마크 조회 결과 한 줄
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatermarkEntry {
    pub symbol: String,
    pub symbol_code: String,
    pub watermark: Option<NaiveDate>,
    /// `None`이면 이미 최신
    pub next_fetch_start: Option<NaiveDate>,
}

/// 심볼 목록의 워터마크를 조회합니다 (읽기 전용).
pub async fn report_watermarks<W>(
    warehouse: &mut W,
    symbols: &[String],
    full_history_start: NaiveDate,
    run_end: NaiveDate,
) -> Result<Vec<WatermarkEntry>, DataError>
where
    W: Warehouse + ?Sized,
{
    let mut entries = Vec::with_capacity(symbols.len());

    for symbol in symbols {
        let symbol_code = strip_index_marker(symbol);
        let watermark = warehouse.max_loaded_date(symbol_code).await?;

        tracing::info!(
            symbol = %symbol,
            watermark = ?watermark,
            table = %warehouse.target(),
            "워터마크 조회"
        );

        entries.push(WatermarkEntry {
            symbol: symbol.clone(),
            symbol_code: symbol_code.to_string(),
            watermark,
            next_fetch_start: next_fetch_start(watermark, full_history_start, run_end),
        });
    }

    Ok(entries)
}
