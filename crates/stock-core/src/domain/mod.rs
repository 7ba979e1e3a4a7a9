//! 일봉 수집을 위한 도메인 모델.

mod market_data;
mod outcome;

pub use market_data::*;
pub use outcome::*;
