//! # Perf Core
//!
//! 성과 데이터 적재기의 핵심 도메인 타입을 제공합니다.
//!
//! 이 크레이트는 적재 파이프라인 전반에서 사용되는 기본 타입을 제공합니다:
//! - 리샘플링 주기 (`Frequency`)
//! - 일별 종가 시계열 (`PriceSeries`)
//! - 적재 대상 행 (`PriceRow`)
//! - 시계열 → 행 변환 (`RowShaper`)
//! - 로깅 인프라

pub mod error;
pub mod logging;
pub mod shaper;
pub mod types;

pub use error::*;
pub use logging::*;
pub use shaper::{pct_change, resample_last, strip_index_marker, RowShaper};
pub use types::*;
