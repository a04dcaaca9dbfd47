//! 적재 실행 요약.

use chrono::NaiveDate;
use perf_core::{Frequency, SeriesKind};
use serde::Serialize;
use std::time::Duration;

/// 심볼별 처리 결과
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SymbolOutcome {
    /// 새로 가져올 구간이 없음 (이미 최신)
    Skipped { watermark: Option<NaiveDate> },
    /// 조회 성공, 적재할 행 없음
    Empty { fetch_start: NaiveDate },
    /// 배치에 추가된 행 수
    Fetched { fetch_start: NaiveDate, rows: usize },
    /// 워터마크/조회/변환 실패
    Failed { reason: String },
}

/// 심볼 하나의 처리 기록
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolReport {
    pub symbol: String,
    #[serde(flatten)]
    pub outcome: SymbolOutcome,
}

/// 적재 실행 통계
#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub kind: SeriesKind,
    /// 대상 테이블
    pub target: String,
    pub frequency: Frequency,
    pub end_date: NaiveDate,
    /// 처리 순서대로의 심볼별 결과
    pub symbols: Vec<SymbolReport>,
    /// 스테이징된 행 수 (배치 크기)
    pub staged: usize,
    /// MERGE로 새로 삽입된 행 수
    pub inserted: u64,
    /// Loader 호출 여부
    pub loader_invoked: bool,
    pub dry_run: bool,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl LoadSummary {
    /// 새 요약 생성
    pub fn new(
        kind: SeriesKind,
        target: impl Into<String>,
        frequency: Frequency,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            kind,
            target: target.into(),
            frequency,
            end_date,
            symbols: Vec::new(),
            staged: 0,
            inserted: 0,
            loader_invoked: false,
            dry_run: false,
            elapsed: Duration::ZERO,
        }
    }

    pub fn record(&mut self, symbol: impl Into<String>, outcome: SymbolOutcome) {
        self.symbols.push(SymbolReport {
            symbol: symbol.into(),
            outcome,
        });
    }

    /// 심볼의 처리 결과
    pub fn outcome(&self, symbol: &str) -> Option<&SymbolOutcome> {
        self.symbols
            .iter()
            .find(|r| r.symbol == symbol)
            .map(|r| &r.outcome)
    }

    fn count(&self, pred: impl Fn(&SymbolOutcome) -> bool) -> usize {
        self.symbols.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn fetched(&self) -> usize {
        self.count(|o| matches!(o, SymbolOutcome::Fetched { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, SymbolOutcome::Skipped { .. }))
    }

    pub fn empty(&self) -> usize {
        self.count(|o| matches!(o, SymbolOutcome::Empty { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, SymbolOutcome::Failed { .. }))
    }

    /// 실패한 심볼이 있는지 확인
    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// 적재할 데이터가 없었는지 확인
    pub fn nothing_to_do(&self) -> bool {
        self.staged == 0
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            kind = %self.kind,
            table = %self.target,
            frequency = %self.frequency,
            end_date = %self.end_date,
            total = self.symbols.len(),
            fetched = self.fetched(),
            skipped = self.skipped(),
            empty = self.empty(),
            failed = self.failed(),
            staged = self.staged,
            inserted = self.inserted,
            dry_run = self.dry_run,
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "적재 완료"
        );

        for report in &self.symbols {
            if let SymbolOutcome::Failed { reason } = &report.outcome {
                tracing::warn!(symbol = %report.symbol, reason = %reason, "심볼 처리 실패");
            }
        }
    }
}
