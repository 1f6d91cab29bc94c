//! Error types for the recall pipeline.
//!
//! Only conditions that make a grounded answer impossible are errors here.
//! Expansion failures and empty queries degrade inside the pipeline and
//! never reach the caller.

/// Errors surfaced by [`RecallPipeline`](crate::pipeline::RecallPipeline).
#[derive(Debug, thiserror::Error)]
pub enum RecallError {
    /// The full-text index could not serve the direct query.
    #[error("search backend error: {0}")]
    SearchBackend(String),

    /// The record store failed while reading a record.
    #[error("record store error: {0}")]
    Store(String),

    /// Invalid pipeline configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience alias for pipeline results.
pub type RecallResult<T> = std::result::Result<T, RecallError>;
