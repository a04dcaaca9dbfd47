//! 환경변수 기반 설정 모듈.

use chrono::{NaiveDate, Utc};
use perf_core::{Currency, Frequency, SeriesKind};
use perf_data::{RetryPolicy, TableName};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgConnectOptions;
use std::str::FromStr;
use std::time::Duration;

use crate::error::CollectorError;
use crate::Result;

/// Loader 전체 설정
#[derive(Debug)]
pub struct LoaderConfig {
    /// 웨어하우스 연결 설정
    pub warehouse: WarehouseConfig,
    /// 적재 대상/구간 설정
    pub load: LoadConfig,
    /// 데이터 소스 호출 설정
    pub fetch: FetchConfig,
}

/// 웨어하우스 연결 설정
#[derive(Debug)]
pub struct WarehouseConfig {
    /// 연결 URL (설정 시 개별 항목보다 우선)
    pub database_url: Option<SecretString>,
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<SecretString>,
    pub database: Option<String>,
    /// 테이블 이름에 스키마가 없을 때 사용
    pub schema: String,
    /// 벤치마크 적재 테이블
    pub benchmark_table: String,
    /// 포트폴리오 적재 테이블
    pub portfolio_table: String,
}

/// 적재 대상/구간 설정
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// 벤치마크 심볼 목록
    pub benchmarks: Vec<String>,
    /// 포트폴리오 심볼 목록
    pub portfolios: Vec<String>,
    /// 워터마크가 없을 때 시작 날짜
    pub full_history_start: NaiveDate,
    /// 적재 종료 날짜 (포함)
    pub end_date: NaiveDate,
    pub frequency: Frequency,
    pub currency: Currency,
}

/// 데이터 소스 호출 설정
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// 최대 시도 횟수
    pub max_attempts: u32,
    /// 첫 재시도 대기 (밀리초)
    pub initial_backoff_ms: u64,
    /// 최대 재시도 대기 (밀리초)
    pub max_backoff_ms: u64,
    /// API 요청 간 딜레이 (밀리초)
    pub request_delay_ms: u64,
    /// 수정 종가 사용 여부
    pub adjusted_close: bool,
}

impl LoaderConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 key → value 조회 함수에서 설정 로드
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").map(|v| SecretString::new(v.into()));
        let user = lookup("WAREHOUSE_USER");
        let database = lookup("WAREHOUSE_DATABASE");

        if database_url.is_none() && (user.is_none() || database.is_none()) {
            return Err(CollectorError::Config(
                "DATABASE_URL 또는 WAREHOUSE_USER/WAREHOUSE_DATABASE 환경변수가 설정되지 않았습니다"
                    .to_string(),
            ));
        }

        let warehouse = WarehouseConfig {
            database_url,
            host: lookup("WAREHOUSE_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: env_var_parse(&lookup, "WAREHOUSE_PORT", 5432),
            user,
            password: lookup("WAREHOUSE_PASSWORD").map(|v| SecretString::new(v.into())),
            database,
            schema: lookup("WAREHOUSE_SCHEMA").unwrap_or_else(|| "public".to_string()),
            benchmark_table: lookup("BENCHMARK_TABLE")
                .unwrap_or_else(|| "benchmark_performance".to_string()),
            portfolio_table: lookup("PORTFOLIO_TABLE")
                .unwrap_or_else(|| "portfolio_performance".to_string()),
        };

        let end_date = match lookup("LOADER_END_DATE") {
            Some(raw) => parse_date("LOADER_END_DATE", &raw)?,
            None => Utc::now().date_naive(),
        };
        let full_history_start = match lookup("LOADER_FULL_START_DATE") {
            Some(raw) => parse_date("LOADER_FULL_START_DATE", &raw)?,
            None => default_full_history_start(),
        };
        let frequency = match lookup("LOADER_FREQUENCY") {
            Some(raw) => raw
                .parse::<Frequency>()
                .map_err(|e| CollectorError::Config(e.to_string()))?,
            None => Frequency::Daily,
        };

        let load = LoadConfig {
            benchmarks: parse_symbols(
                &lookup("LOADER_BENCHMARKS").unwrap_or_else(|| "^GSPC,AGG".to_string()),
            ),
            portfolios: parse_symbols(
                &lookup("LOADER_PORTFOLIOS").unwrap_or_else(|| "VTINX,VNQ".to_string()),
            ),
            full_history_start,
            end_date,
            frequency,
            currency: Currency::new(
                lookup("LOADER_CURRENCY_CODE").unwrap_or_else(|| "USD".to_string()),
                lookup("LOADER_CURRENCY_NAME").unwrap_or_else(|| "US Dollar".to_string()),
            ),
        };

        let fetch = FetchConfig {
            max_attempts: env_var_parse(&lookup, "FETCH_MAX_ATTEMPTS", 10),
            initial_backoff_ms: env_var_parse(&lookup, "FETCH_INITIAL_BACKOFF_MS", 4000),
            max_backoff_ms: env_var_parse(&lookup, "FETCH_MAX_BACKOFF_MS", 60_000),
            request_delay_ms: env_var_parse(&lookup, "FETCH_REQUEST_DELAY_MS", 500),
            adjusted_close: env_var_bool(&lookup, "FETCH_ADJUSTED_CLOSE", true),
        };

        Ok(Self {
            warehouse,
            load,
            fetch,
        })
    }
}

impl WarehouseConfig {
    /// PostgreSQL 연결 옵션 생성
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        if let Some(url) = &self.database_url {
            return PgConnectOptions::from_str(url.expose_secret())
                .map_err(|e| CollectorError::Config(format!("DATABASE_URL 파싱 실패: {}", e)));
        }

        let mut options = PgConnectOptions::new().host(&self.host).port(self.port);
        if let Some(user) = &self.user {
            options = options.username(user);
        }
        if let Some(password) = &self.password {
            options = options.password(password.expose_secret());
        }
        if let Some(database) = &self.database {
            options = options.database(database);
        }
        Ok(options)
    }

    /// 시계열 종류별 적재 테이블
    pub fn table_for(&self, kind: SeriesKind) -> Result<TableName> {
        let raw = match kind {
            SeriesKind::BenchmarkPrice => &self.benchmark_table,
            SeriesKind::PortfolioReturn => &self.portfolio_table,
        };

        let table = TableName::parse(raw)?;
        if table.schema().is_some() {
            Ok(table)
        } else {
            Ok(table.in_schema(&self.schema)?)
        }
    }
}

impl LoadConfig {
    /// 시계열 종류별 심볼 목록
    pub fn symbols_for(&self, kind: SeriesKind) -> &[String] {
        match kind {
            SeriesKind::BenchmarkPrice => &self.benchmarks,
            SeriesKind::PortfolioReturn => &self.portfolios,
        }
    }
}

impl FetchConfig {
    /// 데이터 소스 재시도 정책
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            ..RetryPolicy::default()
        }
    }

    /// API 요청 간 딜레이를 Duration으로 반환
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// 쉼표로 구분된 심볼 목록 파싱
pub fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn default_full_history_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2004, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn parse_date(key: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| CollectorError::Config(format!("{} 날짜 형식 오류 ({}): {}", key, raw, e)))
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// 환경변수에서 bool 값 파싱
fn env_var_bool<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}
