//! 적재 파이프라인 공통 타입.

pub mod frequency;
pub mod row;
pub mod series;

pub use frequency::*;
pub use row::*;
pub use series::*;
