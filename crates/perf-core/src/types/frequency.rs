//! 일별 종가 데이터의 리샘플링 주기 정의.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// 리샘플링 주기.
///
/// 테이블에는 한 글자 코드(`D`, `W`, `M`, `Y`)로 저장됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Frequency {
    /// 일별 (리샘플링 없음)
    #[serde(rename = "D")]
    Daily,
    /// 주별 (ISO 주, 월요일~일요일)
    #[serde(rename = "W")]
    Weekly,
    /// 월별
    #[serde(rename = "M")]
    Monthly,
    /// 연별
    #[serde(rename = "Y")]
    Yearly,
}

/// 리샘플링 구간 키.
///
/// 같은 키를 가진 날짜는 같은 구간에 속합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BucketKey {
    Day(NaiveDate),
    Week { year: i32, week: u32 },
    Month { year: i32, month: u32 },
    Year(i32),
}

impl Frequency {
    /// 모든 주기.
    pub const ALL: [Frequency; 4] = [
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Yearly,
    ];

    /// 테이블에 저장되는 코드.
    pub fn code(&self) -> &'static str {
        match self {
            Frequency::Daily => "D",
            Frequency::Weekly => "W",
            Frequency::Monthly => "M",
            Frequency::Yearly => "Y",
        }
    }

    /// 리샘플링이 필요한 주기인지 확인.
    pub fn needs_resampling(&self) -> bool {
        !matches!(self, Frequency::Daily)
    }

    /// 날짜가 속한 구간 키를 계산합니다.
    pub fn bucket(&self, date: NaiveDate) -> BucketKey {
        match self {
            Frequency::Daily => BucketKey::Day(date),
            Frequency::Weekly => {
                let iso = date.iso_week();
                BucketKey::Week {
                    year: iso.year(),
                    week: iso.week(),
                }
            }
            Frequency::Monthly => BucketKey::Month {
                year: date.year(),
                month: date.month(),
            },
            Frequency::Yearly => BucketKey::Year(date.year()),
        }
    }

    /// 날짜가 속한 구간의 바로 이전 구간 시작일.
    ///
    /// 이 날짜부터 조회하면 `date` 구간의 직전 구간 종가가 포함되어
    /// `date` 구간의 수익률을 계산할 수 있습니다.
    pub fn previous_period_start(&self, date: NaiveDate) -> NaiveDate {
        let start = match self {
            Frequency::Daily => date.pred_opt(),
            Frequency::Weekly => {
                let offset = u64::from(date.weekday().num_days_from_monday()) + 7;
                date.checked_sub_days(Days::new(offset))
            }
            Frequency::Monthly => {
                let (year, month) = match date.month() {
                    1 => (date.year() - 1, 12),
                    m => (date.year(), m - 1),
                };
                NaiveDate::from_ymd_opt(year, month, 1)
            }
            Frequency::Yearly => NaiveDate::from_ymd_opt(date.year() - 1, 1, 1),
        };
        start.unwrap_or(date)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Frequency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "d" | "1d" | "daily" => Ok(Frequency::Daily),
            "w" | "1wk" | "weekly" => Ok(Frequency::Weekly),
            "m" | "1mo" | "monthly" => Ok(Frequency::Monthly),
            "y" | "1y" | "yearly" => Ok(Frequency::Yearly),
            _ => Err(CoreError::InvalidFrequency(s.to_string())),
        }
    }
}
