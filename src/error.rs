//! Error types shared across the analytics engine.

use thiserror::Error;

/// Errors surfaced by the analytics components. There is no local recovery
/// anywhere in the engine: every reconciler, dispatcher, and aggregator call
/// propagates the first failure to its caller, and the batch orchestrator
/// aborts the run on it.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Unrecognized metric name, aggregation level, entity type, or a
    /// malformed request field.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced source entity does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i32 },

    /// The underlying relational store failed a read or write.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl AnalyticsError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(kind: &'static str, id: i32) -> Self {
        Self::NotFound { kind, id }
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
