//! Error types shared by the parser, gap detector and translation pipeline.
//! Per-job failures stay typed so the scheduler can count and report them.

use thiserror::Error;

/// A timestamp or time range that could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The time range had no `-->` separator.
    #[error("time range `{0}` has no `-->` separator")]
    MissingSeparator(String),

    /// A timestamp did not match `HH:MM:SS,fff`.
    #[error("malformed timestamp `{0}`")]
    Timestamp(String),

    /// A timestamp component was outside its valid range.
    #[error("timestamp `{text}` has {field} out of range")]
    OutOfRange { text: String, field: &'static str },
}

/// Failure reported by a translation provider for a single call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The HTTP request could not be sent or timed out.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider responded with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The reply did not have the expected shape.
    #[error("malformed provider response: {0}")]
    Malformed(String),

    /// Anything else, e.g. a quota message or a stub failure in tests.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// A block that could not be translated after exhausting its retries.
#[derive(Debug, Error)]
#[error("block {index} failed after {attempts} attempt(s): {source}")]
pub struct JobFailure {
    pub index: u64,
    pub attempts: u32,
    #[source]
    pub source: ProviderError,
}

/// Invalid run configuration. Aborts the run before any work starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("max retries must be at least 1")]
    NoAttempts,

    #[error("gap threshold must be a finite, non-negative number of seconds (got {0})")]
    Threshold(f64),
}
