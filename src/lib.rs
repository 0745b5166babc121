//! WellRS: wellness analytics over logged physical, mental and sleep records
//!
//! Records flow from a [`store::RecordStore`] through the normalizer, the
//! aggregator and the classifier into a [`summary::WellnessSummary`]; the trend
//! builder and the insight rules run over the same window.

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod insights;
pub mod logging;
pub mod models;
pub mod normalizer;
pub mod policy;
pub mod report;
pub mod store;
pub mod summary;
pub mod trends;

// Re-export commonly used types for convenience
pub use classifier::{StatusBands, WellnessStatus};
pub use engine::WellnessEngine;
pub use error::{PolicyError, Result, StoreError, WellnessError};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use models::*;
pub use policy::{MetricPolicy, ScoringPolicy};
pub use store::{MemoryRecordStore, RecordStore};
pub use summary::{NoDataReason, NoDataReport, SummaryOutcome, WellnessSummary};
