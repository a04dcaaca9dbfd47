//! Performance loader CLI.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use perf_collector::config::parse_symbols;
use perf_collector::modules::{self, LoadRequest};
use perf_collector::{LoaderConfig, Result};
use perf_core::{init_logging, Frequency, LogConfig, LogFormat, SeriesKind};
use perf_data::{PgWarehouse, YahooPriceSource};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "perf-collector")]
#[command(about = "Incremental benchmark/portfolio performance loader", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error). 없으면 RUST_LOG 사용
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// 로그 형식 (pretty, json, compact). 없으면 LOG_FORMAT 사용
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// 실행 요약을 JSON으로 표준 출력에 출력
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 벤치마크 종가 적재
    LoadBenchmarks(LoadArgs),

    /// 포트폴리오 수익률 적재
    LoadPortfolios(LoadArgs),

    /// 심볼별 워터마크와 다음 조회 시작일 출력 (읽기 전용)
    Watermarks {
        /// 포트폴리오 테이블 조회 (기본: 벤치마크)
        #[arg(long)]
        portfolios: bool,

        /// 특정 심볼만 조회 (쉼표로 구분)
        #[arg(long)]
        symbols: Option<String>,
    },

    /// 적재 대상 테이블 생성 (없을 때만)
    InitSchema,
}

#[derive(Args)]
struct LoadArgs {
    /// 특정 심볼만 적재 (쉼표로 구분, 예: "^GSPC,AGG")
    #[arg(long)]
    symbols: Option<String>,

    /// 워터마크가 없을 때 시작 날짜 (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// 종료 날짜 (YYYY-MM-DD, 포함)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// 리샘플링 주기 (D, W, M, Y)
    #[arg(long)]
    frequency: Option<Frequency>,

    /// 조회와 변환만 하고 적재하지 않음
    #[arg(long)]
    dry_run: bool,
}

/// 레벨 플래그가 적용되는 크레이트
const LOG_CRATES: [&str; 3] = ["perf_collector", "perf_data", "perf_core"];

impl Cli {
    /// 환경 변수 설정 위에 CLI 플래그를 덮어쓴 로깅 설정
    fn log_config(&self, env: LogConfig) -> LogConfig {
        env.override_level(self.log_level.as_deref(), &LOG_CRATES)
            .override_format(self.log_format)
    }
}

impl LoadArgs {
    fn into_request(self, config: &LoaderConfig, kind: SeriesKind) -> LoadRequest {
        let mut request = LoadRequest::from_config(config, kind);
        if let Some(symbols) = self.symbols {
            request.symbols = parse_symbols(&symbols);
        }
        if let Some(start) = self.start {
            request.full_history_start = start;
        }
        if let Some(end) = self.end {
            request.end_date = end;
        }
        if let Some(frequency) = self.frequency {
            request.frequency = frequency;
        }
        request.dry_run = self.dry_run;
        request
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::result::Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // .env의 RUST_LOG / LOG_FORMAT도 로깅 설정에 반영
    dotenvy::dotenv().ok();
    init_logging(&cli.log_config(LogConfig::from_env()))?;

    tracing::info!("Performance Loader 시작");

    // 설정 로드
    let config = LoaderConfig::from_env()?;
    let options = config.warehouse.connect_options()?;

    let initial_kind = match &cli.command {
        Commands::LoadPortfolios(_) | Commands::Watermarks { portfolios: true, .. } => {
            SeriesKind::PortfolioReturn
        }
        _ => SeriesKind::BenchmarkPrice,
    };
    let table = config.warehouse.table_for(initial_kind)?;

    // DB 연결 (실행당 하나)
    let mut warehouse = PgWarehouse::connect(&options, table).await?;
    tracing::info!("데이터베이스 연결 성공");

    let outcome = execute(cli.command, cli.json, &config, &mut warehouse).await;

    if let Err(e) = warehouse.close().await {
        tracing::warn!(error = %e, "데이터베이스 연결 종료 실패");
    }

    let code = match outcome {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "실행 실패");
            return Err(e.into());
        }
    };

    tracing::info!("Performance Loader 종료");
    Ok(code)
}

async fn execute(
    command: Commands,
    json: bool,
    config: &LoaderConfig,
    warehouse: &mut PgWarehouse,
) -> Result<ExitCode> {
    match command {
        Commands::LoadBenchmarks(args) => {
            load(args, SeriesKind::BenchmarkPrice, json, config, warehouse).await
        }
        Commands::LoadPortfolios(args) => {
            load(args, SeriesKind::PortfolioReturn, json, config, warehouse).await
        }
        Commands::Watermarks {
            portfolios,
            symbols,
        } => {
            let kind = if portfolios {
                SeriesKind::PortfolioReturn
            } else {
                SeriesKind::BenchmarkPrice
            };
            let symbols = match symbols {
                Some(raw) => parse_symbols(&raw),
                None => config.load.symbols_for(kind).to_vec(),
            };

            let entries = modules::report_watermarks(
                warehouse,
                &symbols,
                config.load.full_history_start,
                config.load.end_date,
            )
            .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in &entries {
                    let watermark = entry
                        .watermark
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    let next = entry
                        .next_fetch_start
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "up to date".to_string());
                    println!("{:<12} {:<12} {}", entry.symbol, watermark, next);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::InitSchema => {
            for kind in [SeriesKind::BenchmarkPrice, SeriesKind::PortfolioReturn] {
                warehouse.set_target(config.warehouse.table_for(kind)?);
                warehouse.ensure_table().await?;
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn load(
    args: LoadArgs,
    kind: SeriesKind,
    json: bool,
    config: &LoaderConfig,
    warehouse: &mut PgWarehouse,
) -> Result<ExitCode> {
    let request = args.into_request(config, kind);
    let source = YahooPriceSource::new()?
        .with_retry(config.fetch.retry_policy())
        .with_adjusted_close(config.fetch.adjusted_close);

    let summary = modules::run_load(&source, warehouse, &request).await?;
    summary.log_summary(match kind {
        SeriesKind::BenchmarkPrice => "벤치마크 적재",
        SeriesKind::PortfolioReturn => "포트폴리오 적재",
    });

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    if summary.has_failures() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
