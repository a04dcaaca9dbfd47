//! 종가 시계열 → 적재 행 변환.
//!
//! # 동작 방식
//!
//! ```text
//! PriceSeries (일별 종가)
//!         │
//!         ▼
//! ┌──────────────────────┐
//! │ 1. 리샘플링           │ ← 일별이 아니면 구간별 마지막 값
//! └─────────┬────────────┘
//!           │
//!     ┌─────┴──────┐
//!     │ 시계열 종류 │
//!     └─────┬──────┘
//!   종가    │    수익률
//!     │     │      │
//!     │     │      ▼
//!     │     │ ┌──────────────────┐
//!     │     │ │ 2. 기간 수익률    │ ← 첫 구간은 None
//!     │     │ └────────┬─────────┘
//!     ▼     ▼          ▼
//! ┌──────────────────────┐
//! │ 3. PriceRow 생성      │
//! └──────────────────────┘
//! ```

use chrono::NaiveTime;

use crate::{
    CoreError, CoreResult, Currency, Frequency, PricePoint, PriceRow, PriceSeries, SeriesKind,
};

/// 심볼 앞의 지수 표시(예: `^GSPC`의 `^`)를 제거합니다.
pub fn strip_index_marker(symbol: &str) -> &str {
    symbol.trim().trim_start_matches(|c: char| !c.is_ascii_alphanumeric())
}

/// 구간별 마지막 값으로 리샘플링합니다.
///
/// 입력은 날짜 오름차순이어야 합니다. 결과의 각 값은 해당 구간에서
/// 마지막으로 관측된 거래일의 날짜를 가집니다.
pub fn resample_last(points: &[PricePoint], frequency: Frequency) -> Vec<PricePoint> {
    if !frequency.needs_resampling() {
        return points.to_vec();
    }

    let mut resampled: Vec<PricePoint> = Vec::new();
    let mut current_bucket = None;

    for point in points {
        let bucket = frequency.bucket(point.date);
        if current_bucket == Some(bucket) {
            if let Some(last) = resampled.last_mut() {
                *last = *point;
            }
        } else {
            current_bucket = Some(bucket);
            resampled.push(*point);
        }
    }

    resampled
}

/// 직전 값 대비 변화율 (`p[i] / p[i-1] - 1`).
///
/// 첫 값과 결과가 유한하지 않은 값(직전 종가 0)은 `None`입니다.
pub fn pct_change(points: &[PricePoint]) -> Vec<Option<f64>> {
    let mut changes = Vec::with_capacity(points.len());
    let mut previous: Option<f64> = None;

    for point in points {
        let change = previous
            .map(|prev| point.close / prev - 1.0)
            .filter(|c| c.is_finite());
        changes.push(change);
        previous = Some(point.close);
    }

    changes
}

/// 시계열을 대상 테이블 행으로 변환하는 변환기.
#[derive(Debug, Clone)]
pub struct RowShaper {
    kind: SeriesKind,
    currency: Currency,
}

impl RowShaper {
    pub fn new(kind: SeriesKind, currency: Currency) -> Self {
        Self { kind, currency }
    }

    pub fn kind(&self) -> SeriesKind {
        self.kind
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// 시계열을 날짜 오름차순 행 목록으로 변환합니다.
    ///
    /// 같은 입력에 대해 항상 같은 출력을 반환하며, 결과 안에서
    /// `(symbol_code, date_key)`는 유일합니다.
    pub fn shape(
        &self,
        series: &PriceSeries,
        symbol: &str,
        frequency: Frequency,
    ) -> CoreResult<Vec<PriceRow>> {
        let symbol_code = strip_index_marker(symbol);
        if symbol_code.is_empty() {
            return Err(CoreError::InvalidSymbol(symbol.to_string()));
        }

        let points = resample_last(series.points(), frequency);
        let values: Vec<Option<f64>> = match self.kind {
            SeriesKind::BenchmarkPrice => points.iter().map(|p| Some(p.close)).collect(),
            SeriesKind::PortfolioReturn => pct_change(&points),
        };

        let rows = points
            .iter()
            .zip(values)
            .map(|(point, value)| PriceRow {
                symbol_code: symbol_code.to_string(),
                category: self.kind.category().to_string(),
                currency_code: self.currency.code.clone(),
                currency_name: self.currency.name.clone(),
                frequency,
                value,
                date_key: point.date,
                date_full: point.date.and_time(NaiveTime::MIN),
            })
            .collect();

        Ok(rows)
    }
}
