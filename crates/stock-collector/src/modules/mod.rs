//! 수집 모듈.

pub mod batch_fetch;
pub mod pipeline;

pub use batch_fetch::BatchFetcher;
pub use pipeline::{run_once, Collector};
