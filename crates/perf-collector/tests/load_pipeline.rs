//! 증분 적재 파이프라인 통합 테스트.
//!
//! 가짜 데이터 소스와 메모리 웨어하우스로 `run_load`의 심볼별 처리,
//! 워터마크 판정, Loader 호출 조건을 검증합니다.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use perf_collector::modules::{run_load, LoadRequest};
use perf_collector::{CollectorError, SymbolOutcome};
use perf_core::{Currency, Frequency, PricePoint, PriceRow, PriceSeries, SeriesKind};
use perf_data::{DataError, PriceSource, Warehouse};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// =============================================================================
// 가짜 구현
// =============================================================================

/// 심볼별 고정 종가를 `[start, end]`로 잘라 반환하는 데이터 소스.
#[derive(Default)]
struct FakeSource {
    data: HashMap<String, Vec<PricePoint>>,
    failing: HashSet<String>,
    calls: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
}

impl FakeSource {
    fn with(mut self, symbol: &str, points: &[(NaiveDate, f64)]) -> Self {
        self.data.insert(
            symbol.to_string(),
            points.iter().map(|&(d, c)| PricePoint::new(d, c)).collect(),
        );
        self
    }

    fn failing(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    fn calls(&self) -> Vec<(String, NaiveDate, NaiveDate)> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_for(&self, symbol: &str) -> usize {
        self.calls().iter().filter(|(s, _, _)| s == symbol).count()
    }
}

#[async_trait]
impl PriceSource for FakeSource {
    fn name(&self) -> &str {
        "fake"
    }

    async fn fetch_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> perf_data::Result<PriceSeries> {
        self.calls
            .lock()
            .unwrap()
            .push((symbol.to_string(), start, end));

        if self.failing.contains(symbol) {
            return Err(DataError::FetchError(format!("connection reset for {}", symbol)));
        }

        let points = self.data.get(symbol).cloned().unwrap_or_default();
        Ok(PriceSeries::new(symbol, points).clip(start, end))
    }
}

/// 삽입 전용 병합을 흉내 내는 메모리 웨어하우스.
#[derive(Default)]
struct MemoryWarehouse {
    rows: Vec<PriceRow>,
    load_calls: usize,
    fail_merge: bool,
    fail_watermark: HashSet<String>,
}

impl MemoryWarehouse {
    fn seeded(symbol_code: &str, dates: &[NaiveDate]) -> Self {
        let mut warehouse = Self::default();
        for &d in dates {
            warehouse.rows.push(PriceRow {
                symbol_code: symbol_code.to_string(),
                category: "Prices".to_string(),
                currency_code: "USD".to_string(),
                currency_name: "US Dollar".to_string(),
                frequency: Frequency::Daily,
                value: Some(1.0),
                date_key: d,
                date_full: d.and_hms_opt(0, 0, 0).unwrap(),
            });
        }
        warehouse
    }

    fn seed(mut self, symbol_code: &str, dates: &[NaiveDate]) -> Self {
        self.rows
            .extend(MemoryWarehouse::seeded(symbol_code, dates).rows);
        self
    }

    fn rows_for(&self, symbol_code: &str) -> Vec<&PriceRow> {
        self.rows
            .iter()
            .filter(|r| r.symbol_code == symbol_code)
            .collect()
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    fn target(&self) -> String {
        "memory.performance".to_string()
    }

    async fn max_loaded_date(&mut self, symbol_code: &str) -> perf_data::Result<Option<NaiveDate>> {
        if self.fail_watermark.contains(symbol_code) {
            return Err(DataError::QueryError("relation does not exist".to_string()));
        }
        Ok(self
            .rows
            .iter()
            .filter(|r| r.symbol_code == symbol_code)
            .map(|r| r.date_key)
            .max())
    }

    async fn load(&mut self, rows: &[PriceRow]) -> perf_data::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        self.load_calls += 1;

        if self.fail_merge {
            return Err(DataError::MergeError("could not serialize access".to_string()));
        }

        let mut existing: HashSet<(String, NaiveDate)> = self
            .rows
            .iter()
            .map(|r| (r.symbol_code.clone(), r.date_key))
            .collect();

        let mut inserted = 0;
        for row in rows {
            if existing.insert((row.symbol_code.clone(), row.date_key)) {
                self.rows.push(row.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

fn request(kind: SeriesKind, symbols: &[&str], end: NaiveDate) -> LoadRequest {
    LoadRequest {
        kind,
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        full_history_start: date(2004, 1, 1),
        end_date: end,
        frequency: Frequency::Daily,
        currency: Currency::default(),
        request_delay: Duration::ZERO,
        dry_run: false,
    }
}

/// 2024-01-02 ~ 2024-01-10 거래일 (주말 제외)
fn january_closes() -> Vec<(NaiveDate, f64)> {
    vec![
        (date(2024, 1, 2), 100.0),
        (date(2024, 1, 3), 101.0),
        (date(2024, 1, 4), 102.0),
        (date(2024, 1, 5), 103.0),
        (date(2024, 1, 8), 104.0),
        (date(2024, 1, 9), 105.0),
        (date(2024, 1, 10), 106.0),
    ]
}

// =============================================================================
// 워터마크 구간
// =============================================================================

#[tokio::test]
async fn test_fetch_window_starts_after_watermark() {
    let source = FakeSource::default().with("ABC", &january_closes());
    let mut warehouse = MemoryWarehouse::seeded("ABC", &[date(2024, 1, 4), date(2024, 1, 5)]);

    let summary = run_load(
        &source,
        &mut warehouse,
        &request(SeriesKind::BenchmarkPrice, &["ABC"], date(2024, 1, 10)),
    )
    .await
    .unwrap();

    assert_eq!(
        source.calls(),
        vec![("ABC".to_string(), date(2024, 1, 6), date(2024, 1, 10))]
    );
    assert_eq!(
        summary.outcome("ABC"),
        Some(&SymbolOutcome::Fetched {
            fetch_start: date(2024, 1, 6),
            rows: 3
        })
    );
    assert_eq!(summary.staged, 3);
    assert_eq!(summary.inserted, 3);

    let dates: Vec<NaiveDate> = warehouse
        .rows_for("ABC")
        .iter()
        .map(|r| r.date_key)
        .collect();
    assert!(dates.contains(&date(2024, 1, 8)));
    assert!(dates.contains(&date(2024, 1, 10)));
}

#[tokio::test]
async fn test_up_to_date_symbol_is_skipped_without_fetch() {
    let source = FakeSource::default()
        .with("ABC", &january_closes())
        .with("XYZ", &january_closes());
    let mut warehouse = MemoryWarehouse::seeded("XYZ", &[date(2024, 1, 10)]);

    let summary = run_load(
        &source,
        &mut warehouse,
        &request(SeriesKind::BenchmarkPrice, &["ABC", "XYZ"], date(2024, 1, 10)),
    )
    .await
    .unwrap();

    assert_eq!(source.calls_for("XYZ"), 0);
    assert_eq!(
        summary.outcome("XYZ"),
        Some(&SymbolOutcome::Skipped {
            watermark: Some(date(2024, 1, 10))
        })
    );
    assert_eq!(summary.fetched(), 1);
}

#[tokio::test]
async fn test_all_skipped_never_invokes_loader() {
    let source = FakeSource::default().with("ABC", &january_closes());
    let mut warehouse = MemoryWarehouse::seeded("ABC", &[date(2024, 1, 10)])
        .seed("XYZ", &[date(2024, 1, 12)]);

    let summary = run_load(
        &source,
        &mut warehouse,
        &request(SeriesKind::BenchmarkPrice, &["ABC", "XYZ"], date(2024, 1, 10)),
    )
    .await
    .unwrap();

    assert!(source.calls().is_empty());
    assert_eq!(warehouse.load_calls, 0);
    assert!(!summary.loader_invoked);
    assert!(summary.nothing_to_do());
    assert_eq!(summary.inserted, 0);
    assert_eq!(summary.skipped(), 2);
}

#[tokio::test]
async fn test_rerun_inserts_nothing() {
    let source = FakeSource::default().with("ABC", &january_closes());
    let mut warehouse = MemoryWarehouse::default();
    let req = request(SeriesKind::BenchmarkPrice, &["ABC"], date(2024, 1, 12));

    let first = run_load(&source, &mut warehouse, &req).await.unwrap();
    assert_eq!(first.inserted, 7);

    // 1/10 이후 데이터가 없으므로 두 번째 실행은 빈 조회
    let second = run_load(&source, &mut warehouse, &req).await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(
        second.outcome("ABC"),
        Some(&SymbolOutcome::Empty {
            fetch_start: date(2024, 1, 11)
        })
    );
    assert_eq!(warehouse.load_calls, 1);
    assert_eq!(warehouse.rows_for("ABC").len(), 7);
}

#[tokio::test]
async fn test_first_load_starts_at_full_history_start() {
    let source = FakeSource::default().with(
        "NEW",
        &[
            (date(2003, 12, 30), 50.0),
            (date(2003, 12, 31), 51.0),
            (date(2004, 1, 2), 52.0),
            (date(2004, 1, 5), 53.0),
        ],
    );
    let mut warehouse = MemoryWarehouse::default();

    run_load(
        &source,
        &mut warehouse,
        &request(SeriesKind::BenchmarkPrice, &["NEW"], date(2004, 1, 5)),
    )
    .await
    .unwrap();

    assert_eq!(source.calls()[0].1, date(2004, 1, 1));
    let first = warehouse
        .rows_for("NEW")
        .iter()
        .map(|r| r.date_key)
        .min()
        .unwrap();
    assert_eq!(first, date(2004, 1, 2));
}

// =============================================================================
// 실패 격리
// =============================================================================

#[tokio::test]
async fn test_failing_symbol_does_not_block_others() {
    let source = FakeSource::default()
        .with("GOOD", &january_closes())
        .failing("BAD");
    let mut warehouse = MemoryWarehouse::default();

    let summary = run_load(
        &source,
        &mut warehouse,
        &request(SeriesKind::BenchmarkPrice, &["BAD", "GOOD"], date(2024, 1, 10)),
    )
    .await
    .unwrap();

    assert!(matches!(
        summary.outcome("BAD"),
        Some(SymbolOutcome::Failed { .. })
    ));
    assert!(summary.has_failures());
    assert_eq!(summary.inserted, 7);
    assert_eq!(warehouse.rows_for("GOOD").len(), 7);
}

#[tokio::test]
async fn test_watermark_failure_is_isolated() {
    let source = FakeSource::default()
        .with("ABC", &january_closes())
        .with("XYZ", &january_closes());
    let mut warehouse = MemoryWarehouse::default();
    warehouse.fail_watermark.insert("ABC".to_string());

    let summary = run_load(
        &source,
        &mut warehouse,
        &request(SeriesKind::BenchmarkPrice, &["ABC", "XYZ"], date(2024, 1, 10)),
    )
    .await
    .unwrap();

    assert_eq!(source.calls_for("ABC"), 0);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.fetched(), 1);
}

#[tokio::test]
async fn test_merge_failure_aborts_run() {
    let source = FakeSource::default().with("ABC", &january_closes());
    let mut warehouse = MemoryWarehouse {
        fail_merge: true,
        ..Default::default()
    };

    let result = run_load(
        &source,
        &mut warehouse,
        &request(SeriesKind::BenchmarkPrice, &["ABC"], date(2024, 1, 10)),
    )
    .await;

    assert!(matches!(
        result,
        Err(CollectorError::Data(DataError::MergeError(_)))
    ));
    assert!(warehouse.rows.is_empty());
}

#[tokio::test]
async fn test_marker_only_symbol_fails() {
    let source = FakeSource::default();
    let mut warehouse = MemoryWarehouse::default();

    let summary = run_load(
        &source,
        &mut warehouse,
        &request(SeriesKind::BenchmarkPrice, &["^"], date(2024, 1, 10)),
    )
    .await
    .unwrap();

    assert_eq!(summary.failed(), 1);
    assert!(source.calls().is_empty());
}

// =============================================================================
// 변환/옵션
// =============================================================================

#[tokio::test]
async fn test_index_marker_is_stripped_for_watermark_and_rows() {
    let source = FakeSource::default().with("^GSPC", &january_closes());
    let mut warehouse = MemoryWarehouse::seeded("GSPC", &[date(2024, 1, 8)]);

    let summary = run_load(
        &source,
        &mut warehouse,
        &request(SeriesKind::BenchmarkPrice, &["^GSPC"], date(2024, 1, 10)),
    )
    .await
    .unwrap();

    assert_eq!(source.calls()[0].1, date(2024, 1, 9));
    assert_eq!(summary.inserted, 2);
    assert_eq!(warehouse.rows_for("GSPC").len(), 3);
}

#[tokio::test]
async fn test_portfolio_returns_seed_from_watermark() {
    let source = FakeSource::default().with(
        "VTINX",
        &[
            (date(2024, 1, 4), 90.0),
            (date(2024, 1, 5), 100.0),
            (date(2024, 1, 8), 110.0),
        ],
    );
    let mut warehouse = MemoryWarehouse::seeded("VTINX", &[date(2024, 1, 5)]);

    let summary = run_load(
        &source,
        &mut warehouse,
        &request(SeriesKind::PortfolioReturn, &["VTINX"], date(2024, 1, 10)),
    )
    .await
    .unwrap();

    // 직전 일부터 조회하지만 구간 시작은 워터마크 다음 날
    assert_eq!(source.calls()[0].1, date(2024, 1, 4));
    assert_eq!(
        summary.outcome("VTINX"),
        Some(&SymbolOutcome::Fetched {
            fetch_start: date(2024, 1, 6),
            rows: 1
        })
    );

    let new_row = warehouse
        .rows_for("VTINX")
        .into_iter()
        .find(|r| r.date_key == date(2024, 1, 8))
        .unwrap()
        .clone();
    assert_eq!(new_row.category, "Returns");
    assert!((new_row.value.unwrap() - 0.1).abs() < 1e-12);
}

#[tokio::test]
async fn test_monthly_returns_after_partial_month_watermark() {
    let source = FakeSource::default().with(
        "VNQ",
        &[
            (date(2023, 12, 28), 95.0),
            (date(2023, 12, 29), 100.0),
            (date(2024, 1, 12), 104.0),
            (date(2024, 1, 15), 105.0),
            (date(2024, 1, 31), 110.0),
            (date(2024, 2, 29), 121.0),
        ],
    );
    let mut warehouse = MemoryWarehouse::default();

    // 1차: 1월 중간까지 (1월은 부분 구간)
    let mut req = request(SeriesKind::PortfolioReturn, &["VNQ"], date(2024, 1, 15));
    req.frequency = Frequency::Monthly;
    run_load(&source, &mut warehouse, &req).await.unwrap();

    // 2차: 2월 말까지
    req.end_date = date(2024, 2, 29);
    let summary = run_load(&source, &mut warehouse, &req).await.unwrap();

    // 워터마크(1/15)가 속한 1월의 직전 구간 시작일부터 조회
    assert_eq!(source.calls()[1].1, date(2023, 12, 1));
    assert_eq!(summary.inserted, 2);

    let mut rows: Vec<(NaiveDate, Option<f64>)> = warehouse
        .rows_for("VNQ")
        .iter()
        .map(|r| (r.date_key, r.value))
        .collect();
    rows.sort_by_key(|(d, _)| *d);

    let dates: Vec<NaiveDate> = rows.iter().map(|(d, _)| *d).collect();
    assert_eq!(
        dates,
        vec![
            date(2023, 12, 29),
            date(2024, 1, 15),
            date(2024, 1, 31),
            date(2024, 2, 29),
        ]
    );

    // 첫 구간만 NULL
    assert_eq!(rows[0].1, None);
    assert!(rows[1..].iter().all(|(_, v)| v.is_some()));

    // 1/31 수익률은 12/29 종가 기준
    let jan_end = rows[2].1.unwrap();
    assert!((jan_end - (110.0 / 100.0 - 1.0)).abs() < 1e-12);
    let feb_end = rows[3].1.unwrap();
    assert!((feb_end - (121.0 / 110.0 - 1.0)).abs() < 1e-12);
}

#[tokio::test]
async fn test_portfolio_first_load_has_null_first_return() {
    let source = FakeSource::default().with("VNQ", &january_closes());
    let mut warehouse = MemoryWarehouse::default();

    run_load(
        &source,
        &mut warehouse,
        &request(SeriesKind::PortfolioReturn, &["VNQ"], date(2024, 1, 10)),
    )
    .await
    .unwrap();

    let rows = warehouse.rows_for("VNQ");
    assert_eq!(rows.len(), 7);
    assert_eq!(rows[0].value, None);
    assert!(rows[1..].iter().all(|r| r.value.is_some()));
}

#[tokio::test]
async fn test_monthly_rows_use_last_trading_day() {
    let source = FakeSource::default().with(
        "AGG",
        &[
            (date(2024, 1, 30), 1.0),
            (date(2024, 1, 31), 2.0),
            (date(2024, 2, 1), 3.0),
            (date(2024, 2, 29), 4.0),
            (date(2024, 3, 1), 5.0),
        ],
    );
    let mut warehouse = MemoryWarehouse::default();
    let mut req = request(SeriesKind::BenchmarkPrice, &["AGG"], date(2024, 3, 1));
    req.frequency = Frequency::Monthly;

    run_load(&source, &mut warehouse, &req).await.unwrap();

    let rows = warehouse.rows_for("AGG");
    let keys: Vec<(NaiveDate, Option<f64>)> =
        rows.iter().map(|r| (r.date_key, r.value)).collect();
    assert_eq!(
        keys,
        vec![
            (date(2024, 1, 31), Some(2.0)),
            (date(2024, 2, 29), Some(4.0)),
            (date(2024, 3, 1), Some(5.0)),
        ]
    );
    assert!(rows.iter().all(|r| r.frequency == Frequency::Monthly));
}

#[tokio::test]
async fn test_dry_run_skips_loader() {
    let source = FakeSource::default().with("ABC", &january_closes());
    let mut warehouse = MemoryWarehouse::default();
    let mut req = request(SeriesKind::BenchmarkPrice, &["ABC"], date(2024, 1, 10));
    req.dry_run = true;

    let summary = run_load(&source, &mut warehouse, &req).await.unwrap();

    assert_eq!(summary.staged, 7);
    assert_eq!(summary.inserted, 0);
    assert!(!summary.loader_invoked);
    assert_eq!(warehouse.load_calls, 0);
}

#[tokio::test]
async fn test_duplicate_symbols_processed_once() {
    let source = FakeSource::default().with("ABC", &january_closes());
    let mut warehouse = MemoryWarehouse::default();

    let summary = run_load(
        &source,
        &mut warehouse,
        &request(SeriesKind::BenchmarkPrice, &["ABC", "ABC"], date(2024, 1, 10)),
    )
    .await
    .unwrap();

    assert_eq!(source.calls_for("ABC"), 1);
    assert_eq!(summary.symbols.len(), 1);
}

#[tokio::test]
async fn test_marked_and_bare_symbol_fetched_once() {
    let source = FakeSource::default()
        .with("^GSPC", &january_closes())
        .with("GSPC", &january_closes());
    let mut warehouse = MemoryWarehouse::default();

    let summary = run_load(
        &source,
        &mut warehouse,
        &request(SeriesKind::BenchmarkPrice, &["^GSPC", "GSPC"], date(2024, 1, 10)),
    )
    .await
    .unwrap();

    assert_eq!(source.calls_for("^GSPC"), 1);
    assert_eq!(source.calls_for("GSPC"), 0);
    assert_eq!(summary.symbols.len(), 1);
    assert_eq!(summary.staged, 7);
}

#[tokio::test(start_paused = true)]
async fn test_request_delay_between_provider_calls() {
    let source = FakeSource::default()
        .with("A", &january_closes())
        .with("B", &january_closes())
        .with("C", &january_closes());
    let mut warehouse = MemoryWarehouse::seeded("B", &[date(2024, 1, 10)]);
    let mut req = request(SeriesKind::BenchmarkPrice, &["A", "B", "C"], date(2024, 1, 10));
    req.request_delay = Duration::from_millis(500);

    let started = tokio::time::Instant::now();
    run_load(&source, &mut warehouse, &req).await.unwrap();

    // B는 건너뛰므로 호출은 A, C 두 번, 딜레이는 한 번
    assert_eq!(source.calls().len(), 2);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(500));
    assert!(elapsed < Duration::from_millis(1000));
}
