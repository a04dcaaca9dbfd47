//! 일별 종가 시계열.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 하루치 종가.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// 한 심볼의 일별 종가 시계열.
///
/// 생성 시 정규화됩니다: 유한하지 않은 종가는 버리고, 날짜 오름차순으로
/// 정렬하며, 같은 날짜가 여러 번 나오면 마지막 값만 남깁니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    /// 데이터 소스에 요청한 원본 심볼 (예: "^GSPC")
    pub symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// 새 시계열 생성 (정규화 포함).
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Self {
        let mut points: Vec<PricePoint> =
            points.into_iter().filter(|p| p.close.is_finite()).collect();

        // 안정 정렬이므로 같은 날짜 안에서는 입력 순서가 유지된다
        points.sort_by_key(|p| p.date);

        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }

        Self {
            symbol: symbol.into(),
            points: deduped,
        }
    }

    /// 빈 시계열.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            points: Vec::new(),
        }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// `[start, end]` 범위 밖의 종가를 제거합니다.
    pub fn clip(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.points.retain(|p| p.date >= start && p.date <= end);
        self
    }
}
