// Library crate - session liquidity analysis for minute FX bars

pub mod analysis;
pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod ingest;
pub mod quality;
pub mod report;

// Re-export commonly used types
pub use analysis::{DayResult, LiquidityEngine, PeriodAnalysis, PriceBar};
pub use config::{AnalyzerConfig, SessionWindow, TimeZoneStrategy};
pub use error::{DataError, DayError};
pub use ingest::load_bars;
