//! 적재 대상 테이블의 행 타입.
//!
//! 대상 테이블 컬럼 순서:
//!
//! ```text
//! symbol_code | category | currency_code | currency_name | frequency | value | date_key | date_full
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Frequency;

/// `date_key` 문자열 형식.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";
/// `date_full` 문자열 형식.
pub const DATE_FULL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 대상 테이블 컬럼 (위치 기반 INSERT 순서).
pub const PRICE_ROW_COLUMNS: [&str; 8] = [
    "symbol_code",
    "category",
    "currency_code",
    "currency_name",
    "frequency",
    "value",
    "date_key",
    "date_full",
];

/// 시계열 종류.
///
/// 벤치마크는 종가를 그대로, 포트폴리오는 기간 수익률을 적재합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    /// 벤치마크 종가
    BenchmarkPrice,
    /// 포트폴리오 기간 수익률
    PortfolioReturn,
}

impl SeriesKind {
    /// `category` 컬럼 값.
    pub fn category(&self) -> &'static str {
        match self {
            SeriesKind::BenchmarkPrice => "Prices",
            SeriesKind::PortfolioReturn => "Returns",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesKind::BenchmarkPrice => "benchmark",
            SeriesKind::PortfolioReturn => "portfolio",
        }
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 적재 통화 (실행당 하나).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// 통화 코드 (예: "USD")
    pub code: String,
    /// 통화 이름 (예: "US Dollar")
    pub name: String,
}

impl Currency {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::new("USD", "US Dollar")
    }
}

/// 대상 테이블의 한 행 (심볼 + 날짜당 하나).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    /// 지수 접두어가 제거된 심볼 (예: "GSPC")
    pub symbol_code: String,
    /// 행 분류 ("Prices" / "Returns")
    pub category: String,
    pub currency_code: String,
    pub currency_name: String,
    pub frequency: Frequency,
    /// 종가 또는 기간 수익률.
    ///
    /// 수익률 시계열의 첫 구간은 직전 값이 없으므로 `None`입니다.
    pub value: Option<f64>,
    /// 중복 판단 키의 날짜 부분
    pub date_key: NaiveDate,
    /// 같은 날짜의 자정 타임스탬프
    pub date_full: NaiveDateTime,
}

impl PriceRow {
    /// `YYYY-MM-DD` 형식의 날짜 키.
    pub fn date_key_string(&self) -> String {
        self.date_key.format(DATE_KEY_FORMAT).to_string()
    }

    /// `YYYY-MM-DD HH:MM:SS` 형식의 타임스탬프.
    pub fn date_full_string(&self) -> String {
        self.date_full.format(DATE_FULL_FORMAT).to_string()
    }

    /// 병합 키 (symbol_code, date_key).
    pub fn key(&self) -> (&str, NaiveDate) {
        (&self.symbol_code, self.date_key)
    }
}
