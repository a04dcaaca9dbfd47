//! 성과 데이터 증분 적재 모듈.
//!
//! # 동작 방식
//!
//! 심볼마다 순서대로:
//!
//! 1. 워터마크 조회 → 조회 시작일 결정 (최신이면 건너뜀)
//! 2. 데이터 소스에서 `[시작일, 종료일]` 일별 종가 조회
//! 3. 적재 행으로 변환 후 배치에 추가
//!
//! 워터마크/조회/변환 실패는 해당 심볼만 실패로 기록하고 계속 진행합니다.
//! 모든 심볼을 처리한 뒤 배치가 비어 있지 않으면 Loader를 한 번 호출합니다.
//!
//! # 수익률 시계열
//!
//! 수익률은 직전 기간 종가가 있어야 계산되므로, 워터마크가 있을 때는
//! 워터마크가 속한 구간의 이전 구간 시작일부터 조회하고 워터마크 이전(포함)
//! 행은 버립니다. 워터마크가 주/월 중간이어도 그 구간의 나머지 날짜는 이전
//! 구간 종가를 기준으로 수익률이 계산됩니다.

use chrono::NaiveDate;
use perf_core::{strip_index_marker, Currency, Frequency, PriceRow, RowShaper, SeriesKind};
use perf_data::{PriceSource, Warehouse};
use std::collections::HashSet;
use std::time::{Duration, Instant};

use super::watermark::{self, WatermarkDecision};
use crate::config::LoaderConfig;
use crate::{LoadSummary, Result, SymbolOutcome};

/// 적재 실행 요청
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub kind: SeriesKind,
    /// 처리 순서대로의 심볼 (지수 표시 포함 가능)
    pub symbols: Vec<String>,
    /// 워터마크가 없을 때 시작 날짜
    pub full_history_start: NaiveDate,
    /// 종료 날짜 (포함)
    pub end_date: NaiveDate,
    pub frequency: Frequency,
    pub currency: Currency,
    /// 데이터 소스 호출 간 딜레이
    pub request_delay: Duration,
    /// true면 Loader를 호출하지 않음
    pub dry_run: bool,
}

impl LoadRequest {
    /// 설정에서 요청 생성
    pub fn from_config(config: &LoaderConfig, kind: SeriesKind) -> Self {
        Self {
            kind,
            symbols: config.load.symbols_for(kind).to_vec(),
            full_history_start: config.load.full_history_start,
            end_date: config.load.end_date,
            frequency: config.load.frequency,
            currency: config.load.currency.clone(),
            request_delay: config.fetch.request_delay(),
            dry_run: false,
        }
    }

    /// 공백/중복을 제거한 심볼 목록 (첫 등장 순서 유지)
    ///
    /// 지수 표시를 뗀 심볼 코드가 같으면 같은 심볼로 봅니다 (`^GSPC`, `GSPC`).
    fn unique_symbols(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.symbols
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .filter(|s| {
                let code = strip_index_marker(*s);
                seen.insert(if code.is_empty() { *s } else { code })
            })
            .collect()
    }
}

/// 증분 적재 실행
///
/// 심볼별 실패는 요약에 기록되고, 스테이징/병합 실패만 에러로 반환됩니다.
pub async fn run_load<S, W>(
    source: &S,
    warehouse: &mut W,
    request: &LoadRequest,
) -> Result<LoadSummary>
where
    S: PriceSource + ?Sized,
    W: Warehouse + ?Sized,
{
    let started = Instant::now();
    let mut summary = LoadSummary::new(
        request.kind,
        warehouse.target(),
        request.frequency,
        request.end_date,
    );
    summary.dry_run = request.dry_run;

    let symbols = request.unique_symbols();
    let shaper = RowShaper::new(request.kind, request.currency.clone());
    let mut batch: Vec<PriceRow> = Vec::new();
    let mut provider_called = false;

    tracing::info!(
        kind = %request.kind,
        table = %summary.target,
        source = source.name(),
        symbols = symbols.len(),
        full_history_start = %request.full_history_start,
        end_date = %request.end_date,
        frequency = %request.frequency,
        dry_run = request.dry_run,
        "적재 시작"
    );

    for (idx, symbol) in symbols.iter().enumerate() {
        let symbol = *symbol;
        let symbol_code = strip_index_marker(symbol);

        tracing::debug!(
            symbol = symbol,
            progress = format!("{}/{}", idx + 1, symbols.len()),
            "심볼 처리 시작"
        );

        if symbol_code.is_empty() {
            tracing::error!(symbol = symbol, "심볼 코드가 비어 있음");
            summary.record(
                symbol,
                SymbolOutcome::Failed {
                    reason: format!("invalid symbol: {:?}", symbol),
                },
            );
            continue;
        }

        let decision = match watermark::resolve(
            warehouse,
            symbol_code,
            request.full_history_start,
            request.end_date,
        )
        .await
        {
            Ok(decision) => decision,
            Err(e) => {
                tracing::error!(symbol = symbol, error = %e, "워터마크 조회 실패");
                summary.record(symbol, SymbolOutcome::Failed { reason: e.to_string() });
                continue;
            }
        };

        let (fetch_start, watermark) = match decision {
            WatermarkDecision::Skip { watermark } => {
                tracing::info!(symbol = symbol, watermark = ?watermark, "이미 최신, 건너뜀");
                summary.record(symbol, SymbolOutcome::Skipped { watermark });
                continue;
            }
            WatermarkDecision::Fetch { start, watermark } => (start, watermark),
        };

        // 수익률은 워터마크 구간의 직전 구간 종가를 기준값으로 함께 조회
        let request_start = match (request.kind, watermark) {
            (SeriesKind::PortfolioReturn, Some(w)) => {
                request.frequency.previous_period_start(w)
            }
            _ => fetch_start,
        };

        // Rate limiting
        if provider_called && !request.request_delay.is_zero() {
            tokio::time::sleep(request.request_delay).await;
        }
        provider_called = true;

        let series = match source
            .fetch_closes(symbol, request_start, request.end_date)
            .await
        {
            Ok(series) => series,
            Err(e) => {
                tracing::error!(symbol = symbol, error = %e, "조회 실패");
                summary.record(symbol, SymbolOutcome::Failed { reason: e.to_string() });
                continue;
            }
        };

        let rows = match shaper.shape(&series, symbol, request.frequency) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(symbol = symbol, error = %e, "행 변환 실패");
                summary.record(symbol, SymbolOutcome::Failed { reason: e.to_string() });
                continue;
            }
        };

        let rows: Vec<PriceRow> = rows
            .into_iter()
            .filter(|row| watermark.map_or(true, |w| row.date_key > w))
            .collect();

        if rows.is_empty() {
            tracing::debug!(symbol = symbol, fetch_start = %fetch_start, "데이터 없음");
            summary.record(symbol, SymbolOutcome::Empty { fetch_start });
            continue;
        }

        tracing::info!(
            symbol = symbol,
            fetch_start = %fetch_start,
            rows = rows.len(),
            "조회 및 변환 완료"
        );
        summary.record(
            symbol,
            SymbolOutcome::Fetched {
                fetch_start,
                rows: rows.len(),
            },
        );
        batch.extend(rows);
    }

    summary.staged = batch.len();

    if batch.is_empty() {
        tracing::info!(table = %summary.target, "적재할 데이터 없음");
    } else if request.dry_run {
        tracing::info!(
            table = %summary.target,
            staged = summary.staged,
            "dry-run: Loader 호출 생략"
        );
    } else {
        summary.loader_invoked = true;
        summary.inserted = warehouse.load(&batch).await?;
    }

    summary.elapsed = started.elapsed();
    Ok(summary)
}
