//! 적재 모듈.

pub mod performance_load;
pub mod watermark;

pub use performance_load::{run_load, LoadRequest};
pub use watermark::{next_fetch_start, report_watermarks, resolve, WatermarkDecision, WatermarkEntry};
