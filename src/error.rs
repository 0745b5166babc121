//! Unified error hierarchy for WellRS
//!
//! Only caller contract violations and collaborator failures surface as errors.
//! Bad or missing record data is handled inside the engine (clamping, omission,
//! the no-data outcome) and never reaches this type.

use thiserror::Error;

/// Top-level error type for all WellRS operations
#[derive(Debug, Error)]
pub enum WellnessError {
    /// Trailing window outside the accepted range
    #[error("Invalid window: {days} days (expected 1..={max})")]
    InvalidWindow { days: i64, max: u32 },

    /// Record store failures
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    /// Scoring policy rejected during validation
    #[error("Scoring policy error: {0}")]
    Policy(#[from] PolicyError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Record store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored row could not be mapped back into a record
    #[error("Corrupt row in {table}: {reason}")]
    CorruptRow { table: String, reason: String },

    /// The store is busy, locked or cannot be opened
    #[error("Record store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Scoring policy validation errors
#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    /// Weight is negative or not finite
    #[error("Invalid weight for {metric}: {weight}")]
    InvalidWeight { metric: String, weight: f64 },

    /// Every metric weight is zero
    #[error("At least one metric must carry a positive weight")]
    NoWeight,

    /// Curve parameters cannot produce a score
    #[error("Invalid scoring curve for {metric}: {reason}")]
    InvalidCurve { metric: String, reason: String },

    /// Status thresholds must strictly decrease from Excellent to Fair
    #[error("Status bands must be strictly descending within 0-100")]
    UnorderedBands,

    /// Insight/recommendation limits or thresholds out of range
    #[error("Invalid insight setting {setting}: {reason}")]
    InvalidInsightSetting { setting: String, reason: String },
}

/// Result type alias for WellRS operations
pub type Result<T> = std::result::Result<T, WellnessError>;

impl WellnessError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, WellnessError::Store(StoreError::Unavailable { .. }))
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            WellnessError::InvalidWindow { .. } => ErrorSeverity::Warning,
            WellnessError::Policy(_) => ErrorSeverity::Error,
            WellnessError::Configuration(_) => ErrorSeverity::Error,
            WellnessError::Store(StoreError::CorruptRow { .. }) => ErrorSeverity::Critical,
            WellnessError::Store(_) => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            WellnessError::InvalidWindow { days, max } => {
                format!(
                    "A summary window of {} days is not supported. Choose between 1 and {} days.",
                    days, max
                )
            }
            WellnessError::Store(StoreError::Unavailable { .. }) => {
                "Unable to read your health records right now. Please try again.".to_string()
            }
            WellnessError::Policy(err) => {
                format!("The scoring configuration is invalid: {}", err)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}
