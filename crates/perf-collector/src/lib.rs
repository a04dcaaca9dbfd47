//! 벤치마크/포트폴리오 성과 데이터 증분 적재기.
//!
//! 이 crate는 심볼별 워터마크 이후의 일별 종가를 가져와 웨어하우스에
//! 적재하는 바이너리를 제공합니다:
//! - 벤치마크 종가 적재 (`benchmark_performance`)
//! - 포트폴리오 수익률 적재 (`portfolio_performance`)
//! - 워터마크 조회, 스키마 초기화

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::LoaderConfig;
pub use error::{CollectorError, Result};
pub use stats::{LoadSummary, SymbolOutcome, SymbolReport};
