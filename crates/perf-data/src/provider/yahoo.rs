//! Yahoo Finance 일별 종가 데이터 소스.
//!
//! Yahoo의 v8 chart API에서 일봉(`interval=1d`)을 조회합니다.
//!
//! # 조회 구간
//!
//! chart API의 `period2`는 구간 끝을 포함하지 않으므로 `end + 1일` 자정으로
//! 요청하고, 응답은 `[start, end]`로 다시 잘라냅니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use perf_data::{PriceSource, RetryPolicy, YahooPriceSource};
//!
//! let source = YahooPriceSource::new()?.with_retry(RetryPolicy::default());
//! let series = source.fetch_closes("^GSPC", start, end).await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use perf_core::{PricePoint, PriceSeries};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::retry::RetryPolicy;
use super::PriceSource;
use crate::{DataError, Result};

/// chart API 기본 주소.
pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";

/// Yahoo Finance v8 chart API 응답.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    /// 구간에 거래일이 없으면 생략됨
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Yahoo Finance 데이터 소스.
pub struct YahooPriceSource {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
    adjusted_close: bool,
}

impl YahooPriceSource {
    /// 기본 설정으로 생성 (수정 종가 사용, 기본 재시도 정책).
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::ConfigError(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
            adjusted_close: true,
        })
    }

    /// API 주소 변경 (테스트/프록시용).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// 재시도 정책 설정.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// 수정 종가(배당/분할 반영) 사용 여부.
    pub fn with_adjusted_close(mut self, adjusted_close: bool) -> Self {
        self.adjusted_close = adjusted_close;
        self
    }

    /// chart API URL 생성.
    fn chart_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = end
            .succ_opt()
            .unwrap_or(end)
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();
        format!(
            "{}/v8/finance/chart/{symbol}?period1={period1}&period2={period2}\
             &interval=1d&includeAdjustedClose=true&events=history",
            self.base_url
        )
    }

    /// chart API 응답을 일별 종가로 변환.
    fn parse_response(
        symbol: &str,
        resp: ChartResponse,
        adjusted_close: bool,
    ) -> Result<Vec<PricePoint>> {
        let result = match resp.chart.result {
            Some(result) => result,
            None => {
                return Err(match resp.chart.error {
                    Some(err) if err.code == "Not Found" => {
                        DataError::SymbolNotFound(symbol.to_string())
                    }
                    Some(err) => {
                        DataError::InvalidData(format!("{}: {}", err.code, err.description))
                    }
                    None => DataError::ParseError("empty result with no error".to_string()),
                })
            }
        };

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ParseError("result array is empty".to_string()))?;

        let timestamps = match data.timestamp {
            Some(ts) => ts,
            None => return Ok(Vec::new()),
        };

        let gmtoffset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);

        let closes = data
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default();
        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let selected = match adj_closes {
            Some(adj) if adjusted_close => adj,
            _ => closes,
        };

        let mut points = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            // 휴장일 등 값이 없는 날은 건너뜀
            let Some(close) = selected.get(i).copied().flatten() else {
                continue;
            };

            let date = DateTime::from_timestamp(ts + gmtoffset, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| DataError::ParseError(format!("invalid timestamp: {}", ts)))?;

            points.push(PricePoint::new(date, close));
        }

        Ok(points)
    }

    /// 단일 HTTP 요청.
    async fn fetch_once(&self, url: &str, symbol: &str) -> Result<Vec<PricePoint>> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited { retry_after_secs });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound(symbol.to_string()));
        }

        if status.is_server_error() {
            return Err(DataError::FetchError(format!("HTTP {} for {}", status, symbol)));
        }

        if !status.is_success() {
            return Err(DataError::InvalidData(format!("HTTP {} for {}", status, symbol)));
        }

        let chart: ChartResponse = resp.json().await?;
        Self::parse_response(symbol, chart, self.adjusted_close)
    }
}

#[async_trait]
impl PriceSource for YahooPriceSource {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    #[instrument(skip(self))]
    async fn fetch_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries> {
        if start > end {
            return Ok(PriceSeries::empty(symbol));
        }

        let url = self.chart_url(symbol, start, end);
        debug!(symbol = symbol, start = %start, end = %end, "Yahoo Finance chart API 호출");

        let points = self
            .retry
            .run("yahoo_chart", || self.fetch_once(&url, symbol))
            .await?;

        Ok(PriceSeries::new(symbol, points).clip(start, end))
    }
}
